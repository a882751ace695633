//! Provider snapshot sources.
//!
//! [`AdminSnapshotSource`] reads the proxy's admin `config_dump` and collects every
//! JWT-authentication `providers` block reachable from the dynamic listeners.

// crates.io
use reqwest::Client;
use serde_json::{Map, Value};
use url::Url;
// self
use crate::{
	_prelude::*,
	http::client::{self, DEFAULT_MAX_RESPONSE_BYTES},
	provider::{ProviderConfig, ProviderSnapshot},
};

/// `@type` of the listeners section of an admin config dump.
pub const LISTENERS_CONFIG_DUMP: &str = "type.googleapis.com/envoy.admin.v3.ListenersConfigDump";
/// Default admin endpoint.
pub const DEFAULT_ADMIN_URL: &str = "http://localhost:15000/config_dump";
/// Default timeout for the admin request.
pub const DEFAULT_SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(5);

/// Supplies the provider snapshot for each tick.
pub trait SnapshotSource: Send + Sync {
	/// Produce the current snapshot.
	fn snapshot(&self) -> impl Future<Output = Result<ProviderSnapshot>> + Send;
}

/// Fixed snapshot, returned unchanged on every tick.
#[derive(Clone, Debug, Default)]
pub struct StaticSnapshot(pub ProviderSnapshot);
impl SnapshotSource for StaticSnapshot {
	async fn snapshot(&self) -> Result<ProviderSnapshot> {
		Ok(self.0.clone())
	}
}

/// Reads providers from the proxy admin API.
#[derive(Clone, Debug)]
pub struct AdminSnapshotSource {
	client: Client,
	url: Url,
	timeout: Duration,
}
impl AdminSnapshotSource {
	/// Create a source for the given `config_dump` URL.
	pub fn new(client: Client, url: Url) -> Self {
		Self { client, url, timeout: DEFAULT_SNAPSHOT_TIMEOUT }
	}

	/// Override the request timeout.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	async fn fetch(&self) -> Result<ProviderSnapshot> {
		// Config dumps are far larger than key sets.
		let limit = DEFAULT_MAX_RESPONSE_BYTES * 64;
		let bytes = client::get_body(&self.client, &self.url, self.timeout, limit).await?;
		let dump: Value = serde_json::from_slice(&bytes)?;

		providers_from_config_dump(&dump)
	}
}
impl SnapshotSource for AdminSnapshotSource {
	async fn snapshot(&self) -> Result<ProviderSnapshot> {
		self.fetch().await.map_err(|err| match err {
			Error::SnapshotUnavailable { .. } => err,
			err => Error::SnapshotUnavailable { reason: err.to_string() },
		})
	}
}

/// Collect every provider block under the dynamic listeners of a config dump.
///
/// Blocks are merged by provider name; a later duplicate name wins. Entries that do not describe
/// a provider are skipped individually, so their siblings are still collected.
pub fn providers_from_config_dump(dump: &Value) -> Result<ProviderSnapshot> {
	let configs = dump.get("configs").and_then(Value::as_array).ok_or_else(|| {
		Error::SnapshotUnavailable { reason: "Config dump has no `configs` array.".into() }
	})?;
	let mut snapshot = ProviderSnapshot::new();

	for config in configs {
		if config.get("@type").and_then(Value::as_str) != Some(LISTENERS_CONFIG_DUMP) {
			continue;
		}

		let Some(listeners) = config.get("dynamic_listeners").and_then(Value::as_array) else {
			continue;
		};

		for listener in listeners {
			collect_providers(listener, &mut snapshot);
		}
	}

	Ok(snapshot)
}

fn collect_providers(value: &Value, snapshot: &mut ProviderSnapshot) {
	match value {
		Value::Object(map) => {
			match map.get("providers") {
				Some(Value::Object(providers)) => collect_entries(providers, snapshot),
				Some(Value::Null) | None => {},
				Some(_) => tracing::warn!("skipping providers value that is not an object"),
			}

			for child in map.values() {
				collect_providers(child, snapshot);
			}
		},
		Value::Array(items) =>
			for item in items {
				collect_providers(item, snapshot);
			},
		_ => {},
	}
}

fn collect_entries(providers: &Map<String, Value>, snapshot: &mut ProviderSnapshot) {
	for (name, entry) in providers {
		match serde_json::from_value::<ProviderConfig>(entry.clone()) {
			Ok(provider) => {
				snapshot.insert(name.clone(), provider);
			},
			Err(err) => tracing::warn!(provider = %name, error = %err, "skipping unparseable provider"),
		}
	}
}
