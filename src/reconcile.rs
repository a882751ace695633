//! Reconciliation of local provider keys against published issuer key sets.
//!
//! Every provider is checked in isolation: a failure at any step is reported, the affected key
//! set degrades to empty, and the pass moves on. Providers are visited in map order, which is
//! unspecified; callers must look outcomes up by issuer rather than by position.

// crates.io
use serde::{Deserialize, Serialize};
// self
use crate::{
	_prelude::*,
	error::ErrorKind,
	http::client::RemoteKeyFetcher,
	jwks::{self, KeySet},
	provider::{self, ProviderConfig, ProviderSnapshot},
	registry::{IssuerRegistry, RegistryState, Rotation},
	report::{Record, Sink},
};

/// A remote key identifier absent from the issuer's local trust set.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mismatch {
	/// Issuer the key belongs to.
	pub issuer: String,
	/// Missing key identifier.
	pub kid: String,
}

/// Result of reconciling one provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderOutcome {
	/// Issuer of the provider.
	pub issuer: String,
	/// Local key identifiers, empty when extraction failed.
	pub local_kids: Vec<String>,
	/// Remote key identifiers, empty when the fetch failed or was skipped.
	pub remote_kids: Vec<String>,
	/// Remote keys missing locally, in remote order.
	pub mismatches: Vec<Mismatch>,
	/// Rotation detected during this pass.
	pub rotation: Option<Rotation>,
	/// Failures observed while reconciling this provider.
	pub failures: Vec<ErrorKind>,
}
impl ProviderOutcome {
	fn new(issuer: &str) -> Self {
		Self { issuer: issuer.to_owned(), ..Default::default() }
	}

	/// Whether the issuer was skipped because the registry does not know it.
	pub fn is_not_configured(&self) -> bool {
		self.failures.contains(&ErrorKind::NotConfigured)
	}

	/// Whether any remote key is missing locally.
	pub fn has_mismatch(&self) -> bool {
		!self.mismatches.is_empty()
	}
}

/// Outcomes of one reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
	/// One entry per provider, in visiting order.
	pub outcomes: Vec<ProviderOutcome>,
}
impl PassReport {
	/// Outcome of the first provider configured for `issuer`.
	pub fn outcome(&self, issuer: &str) -> Option<&ProviderOutcome> {
		self.outcomes.iter().find(|outcome| outcome.issuer == issuer)
	}

	/// Every mismatch found in the pass.
	pub fn mismatches(&self) -> impl Iterator<Item = &Mismatch> {
		self.outcomes.iter().flat_map(|outcome| outcome.mismatches.iter())
	}

	/// Every rotation detected in the pass.
	pub fn rotations(&self) -> impl Iterator<Item = &Rotation> {
		self.outcomes.iter().filter_map(|outcome| outcome.rotation.as_ref())
	}
}

/// Reconciles provider snapshots against the issuer registry.
#[derive(Debug)]
pub struct Reconciler<K> {
	registry: Arc<IssuerRegistry>,
	state: RegistryState,
	fetcher: RemoteKeyFetcher,
	sink: K,
}
impl<K> Reconciler<K>
where
	K: Sink,
{
	/// Assemble a reconciler. `state` is a handle; clones observe the same cache.
	pub fn new(
		registry: Arc<IssuerRegistry>,
		state: RegistryState,
		fetcher: RemoteKeyFetcher,
		sink: K,
	) -> Self {
		Self { registry, state, fetcher, sink }
	}

	/// Handle to the last-known key set state.
	pub fn state(&self) -> &RegistryState {
		&self.state
	}

	/// Sink records are emitted to.
	pub fn sink(&self) -> &K {
		&self.sink
	}

	/// Reconcile every provider of the snapshot.
	#[tracing::instrument(skip_all, fields(providers = snapshot.len()))]
	pub async fn reconcile(&self, snapshot: &ProviderSnapshot) -> PassReport {
		let start = Instant::now();
		let mut report = PassReport { outcomes: Vec::with_capacity(snapshot.len()) };

		for provider in snapshot.values() {
			report.outcomes.push(self.reconcile_provider(provider).await);
		}

		#[cfg(feature = "metrics")]
		crate::metrics::record_pass(snapshot.len(), start.elapsed());

		tracing::debug!(elapsed = ?start.elapsed(), "reconciliation pass complete");

		report
	}

	/// Reconcile a single provider.
	#[tracing::instrument(skip_all, fields(issuer = %provider.issuer))]
	pub async fn reconcile_provider(&self, provider: &ProviderConfig) -> ProviderOutcome {
		let issuer = provider.issuer.as_str();
		let mut outcome = ProviderOutcome::new(issuer);
		let endpoint = match self.registry.resolve_endpoint(issuer) {
			Ok(endpoint) => endpoint,
			Err(err) => {
				self.fail(&mut outcome, Record::info("issuer not configured"), &err);

				return outcome;
			},
		};
		let remote = match self.fetcher.fetch(endpoint).await {
			Ok(remote) => remote,
			Err(err) => {
				let record = Record::error("failed to fetch remote key set")
					.field("endpoint", endpoint);

				self.fail(&mut outcome, record, &err);

				KeySet::default()
			},
		};
		let local = match provider::extract_local(provider) {
			Ok(local) => local,
			Err(err) => {
				self.fail(&mut outcome, Record::error("failed to parse local key set"), &err);

				KeySet::default()
			},
		};

		outcome.local_kids = local.kids();
		outcome.remote_kids = remote.kids();

		let local_label = jwks::format_kids(&outcome.local_kids);
		let remote_label = jwks::format_kids(&outcome.remote_kids);

		self.sink.emit(
			Record::info(format!("comparing keys for {issuer}"))
				.field("issuer", issuer)
				.field("local_kids", &local_label)
				.field("remote_kids", &remote_label),
		);

		outcome.mismatches = jwks::membership_mismatch(&local, &remote)
			.into_iter()
			.map(|key| Mismatch { issuer: issuer.to_owned(), kid: key.kid.clone() })
			.collect();

		if outcome.has_mismatch() {
			let missing: Vec<String> = outcome.mismatches.iter().map(|m| m.kid.clone()).collect();

			#[cfg(feature = "metrics")]
			crate::metrics::record_mismatches(issuer, missing.len());

			self.sink.emit(
				Record::error(format!("ALERT! remote keys not found locally for {issuer}"))
					.field("issuer", issuer)
					.field("missing_kids", jwks::format_kids(&missing))
					.field("local_kids", &local_label)
					.field("remote_kids", &remote_label),
			);

			for kid in &missing {
				self.sink.emit(
					Record::error("ALERT! remote key not found locally")
						.field("issuer", issuer)
						.field("kid", kid),
				);
			}
		} else {
			self.sink.emit(
				Record::info(format!("no key mismatch for {issuer}"))
					.field("issuer", issuer)
					.field("remote_kids", &remote_label),
			);
		}

		if let Some(rotation) = self.state.observe(issuer, &remote).await {
			#[cfg(feature = "metrics")]
			crate::metrics::record_rotation(issuer);

			self.sink.emit(
				Record::info(format!("public key rotated for {issuer}"))
					.field("issuer", issuer)
					.field("current_remote_kids", jwks::format_kids(&rotation.current_kids))
					.field("last_known_remote_kids", jwks::format_kids(&rotation.previous_kids))
					.field("detected_at", rotation.detected_at.to_rfc3339()),
			);

			outcome.rotation = Some(rotation);
		}

		outcome
	}

	fn fail(&self, outcome: &mut ProviderOutcome, record: Record, err: &Error) {
		let kind = err.kind();

		#[cfg(feature = "metrics")]
		crate::metrics::record_failure(&outcome.issuer, kind);

		tracing::debug!(error = %err, kind = kind.as_str(), "provider step failed");

		self.sink.emit(
			record
				.field("issuer", &outcome.issuer)
				.field("kind", kind.as_str())
				.field("error", err),
		);

		outcome.failures.push(kind);
	}
}
