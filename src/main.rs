//! `jwks-watchdog` entry point.

// std
use std::{process::ExitCode, sync::Arc};
// crates.io
use jwks_watchdog::{
	AdminSnapshotSource, IssuerRegistry, IssuerTable, Reconciler, RegistryState, RemoteKeyFetcher,
	Result, TracingSink, Watchdog, WatchdogConfig, http::client, telemetry,
};

#[tokio::main]
async fn main() -> ExitCode {
	match start().await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("jwks-watchdog failed to start: {err}");

			ExitCode::FAILURE
		},
	}
}

async fn start() -> Result<()> {
	let config = WatchdogConfig::from_env()?;

	telemetry::init_tracing(config.log_format)?;

	#[cfg(feature = "prometheus")]
	jwks_watchdog::metrics::install_prometheus_exporter(config.metrics_addr)?;

	let mut registry = IssuerRegistry::builder().require_https(config.require_https);

	registry = match &config.issuers_file {
		Some(path) => registry.with_table(IssuerTable::from_file(path)?),
		None => registry.with_defaults()?,
	};

	let registry = Arc::new(registry.build()?);
	let http = client::build_client()?;
	let fetcher = RemoteKeyFetcher::new(http.clone())
		.with_timeout(config.fetch_timeout)
		.with_max_response_bytes(config.max_response_bytes);
	let source = AdminSnapshotSource::new(http, config.admin_url.clone())
		.with_timeout(config.snapshot_timeout);
	let reconciler = Reconciler::new(registry.clone(), RegistryState::new(), fetcher, TracingSink);

	tracing::info!(
		admin_url = %config.admin_url,
		issuers = registry.len(),
		interval = ?config.interval,
		"configuration loaded"
	);

	Watchdog::new(source, reconciler, config.interval).run().await;

	Ok(())
}
