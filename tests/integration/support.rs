//! Shared fixtures for integration tests.

// std
use std::{sync::Arc, time::Duration};
// crates.io
use jwks_watchdog::{
	IssuerRegistry, MemorySink, Reconciler, RegistryState, RemoteKeyFetcher, http::client,
};
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};

pub const ISSUER_A: &str = "https://issuer-a.example";
pub const ISSUER_B: &str = "https://issuer-b.example";

/// JWKS document carrying the given key identifiers.
pub fn jwks(kids: &[&str]) -> String {
	let keys: Vec<String> = kids
		.iter()
		.map(|kid| {
			format!(
				r#"{{"kty":"RSA","alg":"RS256","use":"sig","kid":"{kid}","n":"AQIDBAUGBwgJ","e":"AQAB"}}"#
			)
		})
		.collect();

	format!(r#"{{"keys":[{}]}}"#, keys.join(","))
}

/// Serve `body` as the key set of `issuer_path`.
pub async fn serve_keys(server: &MockServer, issuer_path: &str, body: String) {
	Mock::given(method("GET"))
		.and(path(issuer_path))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_string(body)
				.insert_header("content-type", "application/json"),
		)
		.mount(server)
		.await;
}

/// Plain-HTTP registry pointing issuers at paths of the mock server.
pub fn registry(server: &MockServer, issuers: &[(&str, &str)]) -> Arc<IssuerRegistry> {
	let mut builder = IssuerRegistry::builder().require_https(false);

	for (issuer, issuer_path) in issuers {
		builder = builder
			.endpoint(*issuer, format!("{}{}", server.uri(), issuer_path))
			.expect("endpoint");
	}

	Arc::new(builder.build().expect("registry"))
}

/// Reconciler recording into a shared memory sink.
pub fn reconciler(registry: Arc<IssuerRegistry>) -> (Reconciler<Arc<MemorySink>>, Arc<MemorySink>) {
	let sink = Arc::new(MemorySink::new());
	let fetcher = RemoteKeyFetcher::new(client::build_client().expect("client"))
		.with_timeout(Duration::from_millis(300));
	let reconciler = Reconciler::new(registry, RegistryState::new(), fetcher, sink.clone());

	(reconciler, sink)
}
