//! Metrics helpers for reconciliation passes.

// crates.io
use metrics::Label;
use smallvec::SmallVec;
// self
use crate::{_prelude::*, error::ErrorKind};

type LabelSet = SmallVec<[Label; 2]>;

const METRIC_FAILURES_TOTAL: &str = "jwks_watchdog_failures_total";
const METRIC_MISMATCHED_KEYS_TOTAL: &str = "jwks_watchdog_mismatched_keys_total";
const METRIC_ROTATIONS_TOTAL: &str = "jwks_watchdog_rotations_total";
const METRIC_PASS_DURATION: &str = "jwks_watchdog_pass_duration_seconds";
const METRIC_PROVIDERS: &str = "jwks_watchdog_providers";

/// Install the Prometheus recorder with an HTTP scrape listener.
///
/// Must run inside a tokio runtime.
#[cfg(feature = "prometheus")]
pub fn install_prometheus_exporter(listen: std::net::SocketAddr) -> Result<()> {
	metrics_exporter_prometheus::PrometheusBuilder::new()
		.with_http_listener(listen)
		.install()
		.map_err(|err| Error::Metrics(err.to_string()))
}

/// Record a per-provider failure.
pub fn record_failure(issuer: &str, kind: ErrorKind) {
	let mut labels = issuer_labels(issuer);

	labels.push(Label::new("kind", kind.as_str()));

	metrics::counter!(METRIC_FAILURES_TOTAL, labels.iter()).increment(1);
}

/// Record remote keys missing from the local set.
pub fn record_mismatches(issuer: &str, count: usize) {
	metrics::counter!(METRIC_MISMATCHED_KEYS_TOTAL, issuer_labels(issuer).iter())
		.increment(count as u64);
}

/// Record a detected rotation.
pub fn record_rotation(issuer: &str) {
	metrics::counter!(METRIC_ROTATIONS_TOTAL, issuer_labels(issuer).iter()).increment(1);
}

/// Record a completed pass.
pub fn record_pass(providers: usize, duration: Duration) {
	metrics::gauge!(METRIC_PROVIDERS).set(providers as f64);
	metrics::histogram!(METRIC_PASS_DURATION).record(duration.as_secs_f64());
}

fn issuer_labels(issuer: &str) -> LabelSet {
	let mut labels = LabelSet::new();

	labels.push(Label::new("issuer", issuer.to_owned()));

	labels
}
