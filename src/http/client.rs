//! HTTP client integration for published key set retrieval.

// crates.io
use http::header::ACCEPT;
use reqwest::{Client, redirect::Policy};
use url::Url;
// self
use crate::{_prelude::*, jwks::KeySet};

/// Default per-request timeout for remote key set fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(1);
/// Default size guard (1 MiB).
pub const DEFAULT_MAX_RESPONSE_BYTES: u64 = 1_048_576;

/// Build the shared reqwest client used for every outbound call.
pub fn build_client() -> Result<Client> {
	Client::builder()
		.redirect(Policy::limited(5))
		.user_agent(format!("jwks-watchdog/{}", env!("CARGO_PKG_VERSION")))
		.build()
		.map_err(|err| Error::Validation {
			field: "http_client",
			reason: format!("Failed to build HTTP client: {err}."),
		})
}

/// Fetches an issuer's published key set.
#[derive(Clone, Debug)]
pub struct RemoteKeyFetcher {
	client: Client,
	timeout: Duration,
	max_response_bytes: u64,
}
impl RemoteKeyFetcher {
	/// Create a fetcher with the default timeout and size guard.
	pub fn new(client: Client) -> Self {
		Self { client, timeout: DEFAULT_FETCH_TIMEOUT, max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES }
	}

	/// Override the per-request timeout.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = timeout;

		self
	}

	/// Override the response size guard.
	pub fn with_max_response_bytes(mut self, max_response_bytes: u64) -> Self {
		self.max_response_bytes = max_response_bytes;

		self
	}

	/// GET the key set at `url` and parse it.
	pub async fn fetch(&self, url: &Url) -> Result<KeySet> {
		let bytes = get_body(&self.client, url, self.timeout, self.max_response_bytes).await?;
		let set = KeySet::from_slice(&bytes)
			.map_err(|err| Error::MalformedRemoteKeySet { url: url.clone(), reason: err.to_string() })?;

		tracing::debug!(url = %url, keys = set.len(), "remote key set fetched");

		Ok(set)
	}
}

/// Issue a bounded GET and return the full body of a successful response.
pub(crate) async fn get_body(
	client: &Client,
	url: &Url,
	timeout: Duration,
	max_response_bytes: u64,
) -> Result<Vec<u8>> {
	let network = |source| Error::Network { url: url.clone(), source };
	let start = Instant::now();
	let mut response = client
		.get(url.clone())
		.header(ACCEPT, "application/json")
		.timeout(timeout)
		.send()
		.await
		.map_err(network)?;
	let status = response.status();

	if !status.is_success() {
		let body = response.text().await.ok();

		return Err(Error::HttpStatus { status, url: url.clone(), body });
	}

	let oversized = |size: u64| Error::MalformedRemoteKeySet {
		url: url.clone(),
		reason: format!(
			"Response size {size} bytes exceeds the configured guard of {max_response_bytes} bytes."
		),
	};

	if let Some(size) = response.content_length().filter(|size| *size > max_response_bytes) {
		return Err(oversized(size));
	}

	let mut bytes = Vec::new();

	// Chunked bodies carry no length; enforce the guard while reading.
	while let Some(chunk) = response.chunk().await.map_err(network)? {
		bytes.extend_from_slice(&chunk);

		if bytes.len() as u64 > max_response_bytes {
			return Err(oversized(bytes.len() as u64));
		}
	}

	tracing::trace!(url = %url, status = %status, elapsed = ?start.elapsed(), "GET complete");

	Ok(bytes)
}
