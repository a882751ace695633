//! Fixed-interval driver: snapshot, reconcile, sleep, forever.

// crates.io
use tokio::time;
// self
use crate::{
	_prelude::*,
	reconcile::{PassReport, Reconciler},
	report::{Record, Sink},
	snapshot::SnapshotSource,
};

/// Runs reconciliation passes back to back with a fixed pause in between.
///
/// Passes never overlap: the next snapshot is only taken once the previous pass has finished and
/// the interval has elapsed.
#[derive(Debug)]
pub struct Watchdog<S, K> {
	source: S,
	reconciler: Reconciler<K>,
	interval: Duration,
}
impl<S, K> Watchdog<S, K>
where
	S: SnapshotSource,
	K: Sink,
{
	/// Create a watchdog.
	pub fn new(source: S, reconciler: Reconciler<K>, interval: Duration) -> Self {
		Self { source, reconciler, interval }
	}

	/// Underlying reconciler.
	pub fn reconciler(&self) -> &Reconciler<K> {
		&self.reconciler
	}

	/// Run one pass. A snapshot failure is reported and yields an empty pass.
	pub async fn tick(&self) -> PassReport {
		match self.source.snapshot().await {
			Ok(snapshot) => self.reconciler.reconcile(&snapshot).await,
			Err(err) => {
				self.reconciler.sink().emit(
					Record::error("provider snapshot unavailable")
						.field("kind", err.kind().as_str())
						.field("error", &err),
				);

				PassReport::default()
			},
		}
	}

	/// Run passes until the process is stopped.
	pub async fn run(&self) {
		tracing::info!(interval = ?self.interval, "watchdog started");

		loop {
			let report = self.tick().await;

			tracing::debug!(
				providers = report.outcomes.len(),
				mismatches = report.mismatches().count(),
				rotations = report.rotations().count(),
				"pass finished"
			);

			time::sleep(self.interval).await;
		}
	}
}
