//! Crate-wide error types and `Result` alias.

/// Library-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the JWKS watchdog crate.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	Serde(#[from] serde_json::Error),
	#[error(transparent)]
	Url(#[from] url::ParseError),

	#[error("Issuer '{issuer}' has no configured key set endpoint.")]
	NotConfigured { issuer: String },
	#[error("Request to {url} failed: {source}")]
	Network {
		url: url::Url,
		#[source]
		source: reqwest::Error,
	},
	#[error("Upstream HTTP status {status} from {url}: {body:?}")]
	HttpStatus { status: http::StatusCode, url: url::Url, body: Option<String> },
	#[error("Malformed remote key set from {url}: {reason}")]
	MalformedRemoteKeySet { url: url::Url, reason: String },
	#[error("Malformed local key set for issuer '{issuer}': {reason}")]
	MalformedLocalKeySet { issuer: String, reason: String },
	#[error("Provider snapshot unavailable: {reason}")]
	SnapshotUnavailable { reason: String },

	#[error("Metrics error: {0}")]
	Metrics(String),
	#[error("Telemetry error: {0}")]
	Telemetry(String),
	#[error("Validation failed for {field}: {reason}")]
	Validation { field: &'static str, reason: String },
}
impl Error {
	/// Classify the error into the reporting taxonomy.
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::NotConfigured { .. } => ErrorKind::NotConfigured,
			Self::Network { .. } | Self::HttpStatus { .. } => ErrorKind::Network,
			Self::MalformedRemoteKeySet { .. } => ErrorKind::MalformedRemoteKeySet,
			Self::MalformedLocalKeySet { .. } => ErrorKind::MalformedLocalKeySet,
			Self::SnapshotUnavailable { .. } => ErrorKind::SnapshotUnavailable,
			Self::Io(_) => ErrorKind::Io,
			Self::Serde(_) | Self::Url(_) | Self::Validation { .. } => ErrorKind::Validation,
			Self::Metrics(_) => ErrorKind::Metrics,
			Self::Telemetry(_) => ErrorKind::Telemetry,
		}
	}
}

/// Coarse error classification carried in outcome reports and log records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// Issuer missing from the registry.
	NotConfigured,
	/// Remote fetch failed at the transport or HTTP level.
	Network,
	/// Remote body could not be parsed as a key set.
	MalformedRemoteKeySet,
	/// Inline local key set could not be parsed.
	MalformedLocalKeySet,
	/// The provider snapshot for the whole tick could not be produced.
	SnapshotUnavailable,
	/// Local I/O failure.
	Io,
	/// Configuration or input validation failure.
	Validation,
	/// Metrics recorder failure.
	Metrics,
	/// Tracing subscriber failure.
	Telemetry,
}
impl ErrorKind {
	/// Stable snake_case label used in log fields and metric labels.
	pub fn as_str(self) -> &'static str {
		match self {
			Self::NotConfigured => "not_configured",
			Self::Network => "network",
			Self::MalformedRemoteKeySet => "malformed_remote_key_set",
			Self::MalformedLocalKeySet => "malformed_local_key_set",
			Self::SnapshotUnavailable => "snapshot_unavailable",
			Self::Io => "io",
			Self::Validation => "validation",
			Self::Metrics => "metrics",
			Self::Telemetry => "telemetry",
		}
	}
}
