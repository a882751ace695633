//! Process configuration loaded from the environment.

// std
use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};
// crates.io
use serde::{Deserialize, Serialize};
use url::Url;
// self
use crate::{
	_prelude::*,
	http::client::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_RESPONSE_BYTES},
	snapshot::{DEFAULT_ADMIN_URL, DEFAULT_SNAPSHOT_TIMEOUT},
};

/// Default pause between passes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);
/// Default Prometheus scrape address.
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:9000";

const ENV_ADMIN_URL: &str = "JWKS_WATCHDOG_ADMIN_URL";
const ENV_INTERVAL_SECS: &str = "JWKS_WATCHDOG_INTERVAL_SECS";
const ENV_FETCH_TIMEOUT_MS: &str = "JWKS_WATCHDOG_FETCH_TIMEOUT_MS";
const ENV_SNAPSHOT_TIMEOUT_MS: &str = "JWKS_WATCHDOG_SNAPSHOT_TIMEOUT_MS";
const ENV_MAX_RESPONSE_BYTES: &str = "JWKS_WATCHDOG_MAX_RESPONSE_BYTES";
const ENV_REQUIRE_HTTPS: &str = "JWKS_WATCHDOG_REQUIRE_HTTPS";
const ENV_ISSUERS_FILE: &str = "JWKS_WATCHDOG_ISSUERS_FILE";
const ENV_LOG_FORMAT: &str = "JWKS_WATCHDOG_LOG_FORMAT";
const ENV_METRICS_ADDR: &str = "JWKS_WATCHDOG_METRICS_ADDR";

/// Output format of the tracing subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
	/// One JSON object per line.
	#[default]
	Json,
	/// Human-readable multi-line output.
	Pretty,
}
impl FromStr for LogFormat {
	type Err = Error;

	fn from_str(value: &str) -> Result<Self> {
		match value.trim().to_ascii_lowercase().as_str() {
			"json" => Ok(Self::Json),
			"pretty" => Ok(Self::Pretty),
			other => Err(Error::Validation {
				field: "log_format",
				reason: format!("Unknown format '{other}'; expected 'json' or 'pretty'."),
			}),
		}
	}
}

/// Watchdog runtime configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WatchdogConfig {
	/// Proxy admin `config_dump` endpoint.
	pub admin_url: Url,
	/// Pause between the end of one pass and the start of the next.
	#[serde(default = "default_interval")]
	pub interval: Duration,
	/// Timeout applied to each remote key set fetch.
	#[serde(default = "default_fetch_timeout")]
	pub fetch_timeout: Duration,
	/// Timeout applied to the admin snapshot request.
	#[serde(default = "default_snapshot_timeout")]
	pub snapshot_timeout: Duration,
	/// Maximum size allowed for remote key set payloads in bytes.
	#[serde(default = "default_max_response_bytes")]
	pub max_response_bytes: u64,
	/// Whether issuer endpoints must use HTTPS.
	#[serde(default = "default_true")]
	pub require_https: bool,
	/// JSON file replacing the built-in issuer table.
	#[serde(default)]
	pub issuers_file: Option<PathBuf>,
	/// Subscriber output format.
	#[serde(default)]
	pub log_format: LogFormat,
	/// Prometheus scrape address, used with the `prometheus` feature.
	#[serde(default = "default_metrics_addr")]
	pub metrics_addr: SocketAddr,
}
impl WatchdogConfig {
	/// Load configuration from `JWKS_WATCHDOG_*` variables over the defaults.
	pub fn from_env() -> Result<Self> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Load configuration through an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self>
	where
		F: Fn(&str) -> Option<String>,
	{
		let mut config = Self::default();

		if let Some(raw) = lookup(ENV_ADMIN_URL) {
			config.admin_url = Url::parse(raw.trim())?;
		}
		if let Some(secs) = parse_var::<u64>(&lookup, ENV_INTERVAL_SECS, "interval")? {
			config.interval = Duration::from_secs(secs);
		}
		if let Some(ms) = parse_var::<u64>(&lookup, ENV_FETCH_TIMEOUT_MS, "fetch_timeout")? {
			config.fetch_timeout = Duration::from_millis(ms);
		}
		if let Some(ms) = parse_var::<u64>(&lookup, ENV_SNAPSHOT_TIMEOUT_MS, "snapshot_timeout")? {
			config.snapshot_timeout = Duration::from_millis(ms);
		}
		if let Some(bytes) =
			parse_var::<u64>(&lookup, ENV_MAX_RESPONSE_BYTES, "max_response_bytes")?
		{
			config.max_response_bytes = bytes;
		}
		if let Some(require) = parse_var::<bool>(&lookup, ENV_REQUIRE_HTTPS, "require_https")? {
			config.require_https = require;
		}
		if let Some(path) = lookup(ENV_ISSUERS_FILE).filter(|p| !p.trim().is_empty()) {
			config.issuers_file = Some(PathBuf::from(path.trim()));
		}
		if let Some(raw) = lookup(ENV_LOG_FORMAT) {
			config.log_format = raw.parse()?;
		}
		if let Some(addr) = parse_var::<SocketAddr>(&lookup, ENV_METRICS_ADDR, "metrics_addr")? {
			config.metrics_addr = addr;
		}

		config.validate()?;

		Ok(config)
	}

	/// Validate invariants for the configuration.
	pub fn validate(&self) -> Result<()> {
		if self.interval < Duration::from_secs(1) {
			return Err(Error::Validation {
				field: "interval",
				reason: "Must be at least 1 second.".into(),
			});
		}
		if self.fetch_timeout < Duration::from_millis(100) {
			return Err(Error::Validation {
				field: "fetch_timeout",
				reason: "Must be at least 100 ms.".into(),
			});
		}
		if self.snapshot_timeout < Duration::from_millis(100) {
			return Err(Error::Validation {
				field: "snapshot_timeout",
				reason: "Must be at least 100 ms.".into(),
			});
		}
		if self.max_response_bytes == 0 {
			return Err(Error::Validation {
				field: "max_response_bytes",
				reason: "Must be greater than zero.".into(),
			});
		}
		if self.admin_url.host_str().is_none() {
			return Err(Error::Validation {
				field: "admin_url",
				reason: "Must include a host component.".into(),
			});
		}

		Ok(())
	}
}
impl Default for WatchdogConfig {
	fn default() -> Self {
		Self {
			admin_url: default_admin_url(),
			interval: DEFAULT_INTERVAL,
			fetch_timeout: DEFAULT_FETCH_TIMEOUT,
			snapshot_timeout: DEFAULT_SNAPSHOT_TIMEOUT,
			max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
			require_https: true,
			issuers_file: None,
			log_format: LogFormat::Json,
			metrics_addr: default_metrics_addr(),
		}
	}
}

fn parse_var<T>(
	lookup: &impl Fn(&str) -> Option<String>,
	name: &str,
	field: &'static str,
) -> Result<Option<T>>
where
	T: FromStr,
	T::Err: std::fmt::Display,
{
	match lookup(name) {
		None => Ok(None),
		Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|err| Error::Validation {
			field,
			reason: format!("Failed to parse {name}: {err}."),
		}),
	}
}

fn default_admin_url() -> Url {
	Url::parse(DEFAULT_ADMIN_URL).expect("default admin url is valid")
}

fn default_interval() -> Duration {
	DEFAULT_INTERVAL
}

fn default_fetch_timeout() -> Duration {
	DEFAULT_FETCH_TIMEOUT
}

fn default_snapshot_timeout() -> Duration {
	DEFAULT_SNAPSHOT_TIMEOUT
}

fn default_max_response_bytes() -> u64 {
	DEFAULT_MAX_RESPONSE_BYTES
}

fn default_true() -> bool {
	true
}

fn default_metrics_addr() -> SocketAddr {
	SocketAddr::from(([0, 0, 0, 0], 9000))
}
