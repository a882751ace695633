//! Key-rotation watchdog that reconciles a proxy's inline JWT signing keys against the key sets
//! each issuer publishes, reporting remote keys unknown locally and detected rotations.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod config;
pub mod http;
pub mod jwks;
#[cfg(feature = "metrics")] pub mod metrics;
pub mod provider;
pub mod reconcile;
pub mod registry;
pub mod report;
pub mod snapshot;
pub mod telemetry;
pub mod watchdog;

mod error;
mod _prelude {
	pub use std::{sync::Arc, time::Duration};

	pub use chrono::{DateTime, Utc};
	pub use tokio::time::Instant;

	pub use crate::{Error, Result};
}

pub use crate::{
	config::{LogFormat, WatchdogConfig},
	error::{Error, ErrorKind, Result},
	http::client::RemoteKeyFetcher,
	jwks::{Key, KeySet, membership_mismatch},
	provider::{ProviderConfig, ProviderSnapshot, extract_local},
	reconcile::{Mismatch, PassReport, ProviderOutcome, Reconciler},
	registry::{IssuerRegistry, IssuerRegistryBuilder, IssuerTable, RegistryState, Rotation},
	report::{MemorySink, Record, Severity, Sink, TracingSink},
	snapshot::{AdminSnapshotSource, SnapshotSource, StaticSnapshot},
	watchdog::Watchdog,
};
