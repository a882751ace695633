//! Reconciliation behaviour across local, remote, and cached key sets.

// std
use std::time::Duration;
// crates.io
use jwks_watchdog::{
	ErrorKind, KeySet, Mismatch, ProviderConfig, ProviderSnapshot, RemoteKeyFetcher, Severity,
	http::client,
};
use url::Url;
use wiremock::{
	Mock, MockServer, ResponseTemplate,
	matchers::{method, path},
};
// self
use crate::support::{self, ISSUER_A, ISSUER_B};

fn snapshot(providers: &[(&str, ProviderConfig)]) -> ProviderSnapshot {
	providers.iter().map(|(name, provider)| (name.to_string(), provider.clone())).collect()
}

#[tokio::test]
async fn matching_keys_report_no_mismatch() {
	let _ = tracing_subscriber::fmt::try_init();

	let server = MockServer::start().await;

	support::serve_keys(&server, "/a/keys", support::jwks(&["a"])).await;

	let registry = support::registry(&server, &[(ISSUER_A, "/a/keys")]);
	let (reconciler, sink) = support::reconciler(registry);
	let report = reconciler
		.reconcile(&snapshot(&[("a", ProviderConfig::inline(ISSUER_A, support::jwks(&["a"])))]))
		.await;
	let outcome = report.outcome(ISSUER_A).expect("outcome");

	assert!(outcome.mismatches.is_empty());
	assert!(outcome.failures.is_empty());
	assert_eq!(outcome.local_kids, vec!["a"]);
	assert_eq!(outcome.remote_kids, vec!["a"]);

	let records = sink.for_issuer(ISSUER_A);

	assert!(records.iter().all(|record| record.severity == Severity::Info));
	assert!(records.iter().any(|record| record.message.starts_with("comparing keys")));
	assert!(records.iter().any(|record| record.message.starts_with("no key mismatch")));
}

#[tokio::test]
async fn remote_key_missing_locally_is_alerted() {
	let server = MockServer::start().await;

	support::serve_keys(&server, "/a/keys", support::jwks(&["x"])).await;

	let registry = support::registry(&server, &[(ISSUER_A, "/a/keys")]);
	let (reconciler, sink) = support::reconciler(registry);
	let report = reconciler
		.reconcile(&snapshot(&[("a", ProviderConfig::inline(ISSUER_A, r#"{"keys":[]}"#))]))
		.await;

	assert_eq!(
		report.outcome(ISSUER_A).expect("outcome").mismatches,
		vec![Mismatch { issuer: ISSUER_A.into(), kid: "x".into() }]
	);

	let alert = sink
		.for_issuer(ISSUER_A)
		.into_iter()
		.find(|record| record.severity == Severity::Error)
		.expect("alert record");

	assert_eq!(alert.fields["missing_kids"], "[x]");
	assert_eq!(alert.fields["local_kids"], "[]");

	let per_key: Vec<_> = sink
		.for_issuer(ISSUER_A)
		.into_iter()
		.filter(|record| record.message == "ALERT! remote key not found locally")
		.collect();

	assert_eq!(per_key.len(), 1);
	assert_eq!(per_key[0].severity, Severity::Error);
	assert_eq!(per_key[0].fields["kid"], "x");
}

#[tokio::test]
async fn malformed_local_keys_report_every_remote_key() {
	let server = MockServer::start().await;

	support::serve_keys(&server, "/a/keys", support::jwks(&["k1", "k2"])).await;

	let registry = support::registry(&server, &[(ISSUER_A, "/a/keys")]);
	let (reconciler, _sink) = support::reconciler(registry);
	let report = reconciler
		.reconcile(&snapshot(&[("a", ProviderConfig::inline(ISSUER_A, "{not json"))]))
		.await;
	let outcome = report.outcome(ISSUER_A).expect("outcome");
	let missing: Vec<_> = outcome.mismatches.iter().map(|m| m.kid.as_str()).collect();

	assert_eq!(outcome.failures, vec![ErrorKind::MalformedLocalKeySet]);
	assert!(outcome.local_kids.is_empty());
	assert_eq!(missing, vec!["k1", "k2"]);
}

#[tokio::test]
async fn empty_snapshot_yields_empty_report() {
	let server = MockServer::start().await;
	let registry = support::registry(&server, &[(ISSUER_A, "/a/keys")]);
	let (reconciler, sink) = support::reconciler(registry);
	let report = reconciler.reconcile(&ProviderSnapshot::new()).await;

	assert!(report.outcomes.is_empty());
	assert!(sink.records().is_empty());
	assert!(reconciler.state().last_known(ISSUER_A).await.is_none());
}

#[tokio::test]
async fn unknown_issuer_does_not_block_other_providers() {
	let server = MockServer::start().await;

	support::serve_keys(&server, "/a/keys", support::jwks(&["a"])).await;

	let registry = support::registry(&server, &[(ISSUER_A, "/a/keys")]);
	let (reconciler, sink) = support::reconciler(registry);
	let report = reconciler
		.reconcile(&snapshot(&[
			("known", ProviderConfig::inline(ISSUER_A, support::jwks(&["a"]))),
			("unknown", ProviderConfig::inline(ISSUER_B, support::jwks(&["b"]))),
		]))
		.await;

	assert_eq!(report.outcomes.len(), 2);
	assert!(report.outcome(ISSUER_B).expect("unknown outcome").is_not_configured());

	let known = report.outcome(ISSUER_A).expect("known outcome");

	assert!(known.failures.is_empty());
	assert_eq!(known.remote_kids, vec!["a"]);

	let unknown_records = sink.for_issuer(ISSUER_B);

	assert_eq!(unknown_records.len(), 1);
	assert_eq!(unknown_records[0].message, "issuer not configured");
	assert_eq!(unknown_records[0].fields["kind"], "not_configured");
}

#[tokio::test]
async fn rotation_is_detected_once_and_cache_follows_remote() {
	let server = MockServer::start().await;
	let bodies = [support::jwks(&["a"]), support::jwks(&["a", "b"])];
	let counter = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
	let handle = counter.clone();

	Mock::given(method("GET"))
		.and(path("/a/keys"))
		.respond_with(move |_: &wiremock::Request| {
			let idx = handle.fetch_add(1, std::sync::atomic::Ordering::SeqCst);

			ResponseTemplate::new(200).set_body_string(bodies[idx.min(1)].clone())
		})
		.mount(&server)
		.await;

	let registry = support::registry(&server, &[(ISSUER_A, "/a/keys")]);
	let (reconciler, _sink) = support::reconciler(registry);
	let providers =
		snapshot(&[("a", ProviderConfig::inline(ISSUER_A, support::jwks(&["a", "b"])))]);
	let first = reconciler.reconcile(&providers).await;
	let first_rotation = first.outcome(ISSUER_A).and_then(|o| o.rotation.clone()).expect("rotation");

	assert!(first_rotation.previous_kids.is_empty());
	assert_eq!(first_rotation.current_kids, vec!["a"]);

	let second = reconciler.reconcile(&providers).await;
	let second_rotation =
		second.outcome(ISSUER_A).and_then(|o| o.rotation.clone()).expect("rotation");

	assert_eq!(second_rotation.previous_kids, vec!["a"]);
	assert_eq!(second_rotation.current_kids, vec!["a", "b"]);
	assert_eq!(
		reconciler.state().last_known(ISSUER_A).await.map(|set| set.kids()),
		Some(vec!["a".to_string(), "b".to_string()])
	);

	let third = reconciler.reconcile(&providers).await;

	assert!(third.outcome(ISSUER_A).expect("outcome").rotation.is_none());
}

#[tokio::test]
async fn repeated_passes_are_idempotent() {
	let server = MockServer::start().await;

	support::serve_keys(&server, "/a/keys", support::jwks(&["a"])).await;

	let registry = support::registry(&server, &[(ISSUER_A, "/a/keys")]);
	let (reconciler, _sink) = support::reconciler(registry);
	let providers = snapshot(&[("a", ProviderConfig::inline(ISSUER_A, support::jwks(&["a"])))]);
	let first = reconciler.reconcile(&providers).await;
	let second = reconciler.reconcile(&providers).await;
	let first = first.outcome(ISSUER_A).expect("outcome");
	let second = second.outcome(ISSUER_A).expect("outcome");

	assert!(first.rotation.is_some());
	assert!(second.rotation.is_none());
	assert!(first.mismatches.is_empty() && second.mismatches.is_empty());
	assert_eq!(first.remote_kids, second.remote_kids);
}

#[tokio::test]
async fn removed_remote_key_keeps_cache() {
	let server = MockServer::start().await;

	support::serve_keys(&server, "/a/keys", support::jwks(&["a"])).await;

	let registry = support::registry(&server, &[(ISSUER_A, "/a/keys")]);
	let (reconciler, _sink) = support::reconciler(registry);

	reconciler.state().record_rotation(ISSUER_A, KeySet::from_kids(["a", "b"])).await;

	let report = reconciler
		.reconcile(&snapshot(&[("a", ProviderConfig::inline(ISSUER_A, support::jwks(&["a"])))]))
		.await;

	assert!(report.outcome(ISSUER_A).expect("outcome").rotation.is_none());
	assert_eq!(reconciler.state().last_known(ISSUER_A).await, Some(KeySet::from_kids(["a", "b"])));
}

#[tokio::test]
async fn failed_remote_fetch_degrades_to_empty_remote_set() {
	let server = MockServer::start().await;

	Mock::given(method("GET"))
		.and(path("/slow/keys"))
		.respond_with(
			ResponseTemplate::new(200)
				.set_body_string(support::jwks(&["late"]))
				.set_delay(Duration::from_secs(2)),
		)
		.mount(&server)
		.await;
	Mock::given(method("GET"))
		.and(path("/down/keys"))
		.respond_with(ResponseTemplate::new(503))
		.mount(&server)
		.await;

	let registry =
		support::registry(&server, &[(ISSUER_A, "/slow/keys"), (ISSUER_B, "/down/keys")]);
	let (reconciler, sink) = support::reconciler(registry);
	let report = reconciler
		.reconcile(&snapshot(&[
			("a", ProviderConfig::inline(ISSUER_A, support::jwks(&["a"]))),
			("b", ProviderConfig::inline(ISSUER_B, support::jwks(&["b"]))),
		]))
		.await;

	for issuer in [ISSUER_A, ISSUER_B] {
		let outcome = report.outcome(issuer).expect("outcome");

		assert_eq!(outcome.failures, vec![ErrorKind::Network]);
		assert!(outcome.remote_kids.is_empty());
		assert!(outcome.mismatches.is_empty());
		assert!(outcome.rotation.is_none());
		assert!(
			sink.for_issuer(issuer)
				.iter()
				.any(|record| record.message == "failed to fetch remote key set")
		);
	}
}

#[tokio::test]
async fn malformed_remote_body_is_classified() {
	let server = MockServer::start().await;

	support::serve_keys(&server, "/a/keys", "<html>oops</html>".into()).await;

	let registry = support::registry(&server, &[(ISSUER_A, "/a/keys")]);
	let (reconciler, _sink) = support::reconciler(registry);
	let report = reconciler
		.reconcile(&snapshot(&[("a", ProviderConfig::inline(ISSUER_A, support::jwks(&["a"])))]))
		.await;

	assert_eq!(
		report.outcome(ISSUER_A).expect("outcome").failures,
		vec![ErrorKind::MalformedRemoteKeySet]
	);
}

#[tokio::test]
async fn oversized_key_set_is_rejected() {
	let server = MockServer::start().await;

	support::serve_keys(&server, "/a/keys", support::jwks(&["a", "b", "c", "d"])).await;

	let url = Url::parse(&format!("{}/a/keys", server.uri())).expect("url");
	let fetcher =
		RemoteKeyFetcher::new(client::build_client().expect("client")).with_max_response_bytes(64);
	let err = fetcher.fetch(&url).await.unwrap_err();

	assert_eq!(err.kind(), ErrorKind::MalformedRemoteKeySet);
	assert!(err.to_string().contains("exceeds the configured guard"), "unexpected error {err}");

	let roomy = RemoteKeyFetcher::new(client::build_client().expect("client"));

	assert_eq!(roomy.fetch(&url).await.expect("key set").len(), 4);
}
