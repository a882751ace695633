//! Issuer registry and last-known remote key set state.
//!
//! The registry is a closed table mapping each known issuer to its published key set endpoint.
//! [`RegistryState`] is the only mutable state that survives between passes; it lives in memory
//! and is rebuilt empty on every process start.

// std
use std::{collections::HashMap, path::Path};
// crates.io
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;
// self
use crate::{_prelude::*, jwks::KeySet};

/// Issuers and endpoints of the reference deployment.
pub const DEFAULT_ISSUERS: [(&str, &str); 7] = [
	("https://accounts.google.com", "https://www.googleapis.com/oauth2/v3/certs"),
	(
		"https://my.dev.wpesvc.net/capi/v1/",
		"https://my.dev.wpesvc.net/capi/private/.well-known/keys",
	),
	(
		"https://mystaging.wpengine.com/capi/v1/",
		"https://mystaging.wpengine.com/capi/private/.well-known/keys",
	),
	("https://my.wpengine.com/capi/v1/", "https://my.wpengine.com/capi/private/.well-known/keys"),
	(
		"https://identity-dev.wpengine.com/oauth2/default",
		"https://identity-dev.wpengine.com/oauth2/default/v1/keys",
	),
	(
		"https://identity-staging.wpengine.com/oauth2/default",
		"https://identity-staging.wpengine.com/oauth2/default/v1/keys",
	),
	(
		"https://identity.wpengine.com/oauth2/default",
		"https://identity.wpengine.com/oauth2/default/v1/keys",
	),
];

/// Builder for [`IssuerRegistry`].
#[derive(Debug)]
pub struct IssuerRegistryBuilder {
	require_https: bool,
	endpoints: HashMap<String, Url>,
}
impl IssuerRegistryBuilder {
	/// Create an empty builder that requires HTTPS endpoints.
	pub fn new() -> Self {
		Self { require_https: true, endpoints: HashMap::new() }
	}

	/// Enforce HTTPS for endpoints (enabled by default).
	pub fn require_https(mut self, require_https: bool) -> Self {
		self.require_https = require_https;

		self
	}

	/// Register or replace the endpoint for an issuer.
	pub fn endpoint(mut self, issuer: impl Into<String>, url: impl AsRef<str>) -> Result<Self> {
		let url = Url::parse(url.as_ref())?;

		self.endpoints.insert(issuer.into(), url);

		Ok(self)
	}

	/// Add every issuer of the reference deployment.
	pub fn with_defaults(mut self) -> Result<Self> {
		for (issuer, url) in DEFAULT_ISSUERS {
			self = self.endpoint(issuer, url)?;
		}

		Ok(self)
	}

	/// Add every issuer of an [`IssuerTable`].
	pub fn with_table(mut self, table: IssuerTable) -> Self {
		self.endpoints.extend(table.0);

		self
	}

	/// Validate endpoints and construct the registry.
	pub fn build(self) -> Result<IssuerRegistry> {
		for (issuer, url) in &self.endpoints {
			if issuer.is_empty() {
				return Err(Error::Validation {
					field: "issuers",
					reason: "Issuer must not be empty.".into(),
				});
			}
			if url.host_str().is_none() {
				return Err(Error::Validation {
					field: "issuers",
					reason: format!("Endpoint for '{issuer}' must include a host component."),
				});
			}
			if self.require_https {
				enforce_https(url)?;
			}
		}

		Ok(IssuerRegistry { endpoints: self.endpoints })
	}
}
impl Default for IssuerRegistryBuilder {
	fn default() -> Self {
		Self::new()
	}
}

/// Issuer to endpoint table as read from a JSON object `{ "<issuer>": "<url>" }`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssuerTable(pub HashMap<String, Url>);
impl IssuerTable {
	/// Parse a table from a JSON string.
	pub fn from_json(raw: &str) -> Result<Self> {
		Ok(serde_json::from_str(raw)?)
	}

	/// Read and parse a table from a JSON file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
		let raw = std::fs::read_to_string(path)?;

		Self::from_json(&raw)
	}
}

/// Closed mapping from issuer to published key set endpoint.
#[derive(Clone, Debug)]
pub struct IssuerRegistry {
	endpoints: HashMap<String, Url>,
}
impl IssuerRegistry {
	/// Create a [`IssuerRegistryBuilder`].
	pub fn builder() -> IssuerRegistryBuilder {
		IssuerRegistryBuilder::new()
	}

	/// Registry holding the reference deployment's issuers.
	pub fn with_defaults() -> Result<Self> {
		Self::builder().with_defaults()?.build()
	}

	/// Resolve the key set endpoint of an issuer.
	pub fn resolve_endpoint(&self, issuer: &str) -> Result<&Url> {
		self.endpoints
			.get(issuer)
			.ok_or_else(|| Error::NotConfigured { issuer: issuer.to_owned() })
	}

	/// Number of known issuers.
	pub fn len(&self) -> usize {
		self.endpoints.len()
	}

	/// Whether the registry knows no issuer.
	pub fn is_empty(&self) -> bool {
		self.endpoints.is_empty()
	}
}

/// Rotation detected for an issuer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rotation {
	/// Issuer whose published set changed.
	pub issuer: String,
	/// Key identifiers last observed before this pass.
	pub previous_kids: Vec<String>,
	/// Key identifiers published now.
	pub current_kids: Vec<String>,
	/// Wall-clock time of detection.
	pub detected_at: DateTime<Utc>,
}

/// Last known remote key set per issuer.
///
/// Cloning yields another handle to the same state.
#[derive(Clone, Debug, Default)]
pub struct RegistryState {
	last_known: Arc<RwLock<HashMap<String, KeySet>>>,
}
impl RegistryState {
	/// Create empty state.
	pub fn new() -> Self {
		Self::default()
	}

	/// Cached remote key set for an issuer, if one was recorded.
	pub async fn last_known(&self, issuer: &str) -> Option<KeySet> {
		self.last_known.read().await.get(issuer).cloned()
	}

	/// Overwrite the cached remote key set for an issuer.
	pub async fn record_rotation(&self, issuer: &str, key_set: KeySet) {
		self.last_known.write().await.insert(issuer.to_owned(), key_set);
	}

	/// Compare a freshly fetched set against the cache and record it when it carries a new kid.
	///
	/// Removals alone never count as a rotation and leave the cache untouched.
	pub async fn observe(&self, issuer: &str, remote: &KeySet) -> Option<Rotation> {
		let mut last_known = self.last_known.write().await;
		let previous = last_known.get(issuer).cloned().unwrap_or_default();
		let unseen = remote.first_unseen(&previous)?;

		tracing::debug!(issuer, kid = %unseen.kid, "unseen remote kid");

		let rotation = Rotation {
			issuer: issuer.to_owned(),
			previous_kids: previous.kids(),
			current_kids: remote.kids(),
			detected_at: Utc::now(),
		};

		last_known.insert(issuer.to_owned(), remote.clone());

		Some(rotation)
	}
}

/// Ensure the provided URL uses HTTPS.
pub fn enforce_https(url: &Url) -> Result<()> {
	if url.scheme() == "https" {
		Ok(())
	} else {
		Err(Error::Validation {
			field: "issuers",
			reason: format!("Endpoint {url} must use HTTPS."),
		})
	}
}
