//! Tracing subscriber installation.

// crates.io
use tracing_subscriber::{EnvFilter, fmt};
// self
use crate::{_prelude::*, config::LogFormat};

/// Install the global subscriber. `RUST_LOG` overrides the default `info` filter.
pub fn init_tracing(format: LogFormat) -> Result<()> {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let builder = fmt().with_env_filter(filter).with_target(true);
	let installed = match format {
		LogFormat::Json => builder.json().flatten_event(true).with_current_span(false).try_init(),
		LogFormat::Pretty => builder.pretty().try_init(),
	};

	installed.map_err(|err| Error::Telemetry(err.to_string()))
}
