//! JWT-authentication provider configuration as dumped by the proxy, and local key extraction.

// std
use std::collections::HashMap;
// crates.io
use serde::{Deserialize, Serialize};
// self
use crate::{_prelude::*, jwks::KeySet};

/// Provider blocks keyed by the proxy's provider name.
///
/// The key is opaque to reconciliation; the `issuer` inside each configuration drives lookups.
pub type ProviderSnapshot = HashMap<String, ProviderConfig>;

/// One JWT-authentication provider as configured in the live proxy.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
	/// Token issuer; lookup key for the registry and cache.
	#[serde(default)]
	pub issuer: String,
	/// Inline trusted keys, when the provider embeds them.
	#[serde(default)]
	pub local_jwks: Option<LocalJwks>,
	/// Whether the proxy forwards the token upstream.
	#[serde(default)]
	pub forward: bool,
	/// Metadata key the verified payload is written to.
	#[serde(default)]
	pub payload_in_metadata: Option<String>,
}
impl ProviderConfig {
	/// Build a provider embedding the given inline JWKS string.
	pub fn inline(issuer: impl Into<String>, inline_jwks: impl Into<String>) -> Self {
		Self {
			issuer: issuer.into(),
			local_jwks: Some(LocalJwks { inline_string: Some(inline_jwks.into()) }),
			..Default::default()
		}
	}
}

/// Data source holding the inline key set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalJwks {
	/// JWKS document embedded as a string.
	#[serde(default)]
	pub inline_string: Option<String>,
}

/// Parse the provider's inline key set.
pub fn extract_local(provider: &ProviderConfig) -> Result<KeySet> {
	let raw = provider
		.local_jwks
		.as_ref()
		.and_then(|jwks| jwks.inline_string.as_deref())
		.ok_or_else(|| Error::MalformedLocalKeySet {
			issuer: provider.issuer.clone(),
			reason: "Provider has no inline key set.".into(),
		})?;

	KeySet::from_json(raw).map_err(|err| Error::MalformedLocalKeySet {
		issuer: provider.issuer.clone(),
		reason: err.to_string(),
	})
}
