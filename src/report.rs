//! Reporting records and the sinks that render them.

// std
use std::{
	collections::BTreeMap,
	fmt::{Display, Formatter, Result as FmtResult},
	sync::Mutex,
};
// crates.io
use serde::{Deserialize, Serialize};
// self
use crate::_prelude::*;

/// Record severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
	/// Routine observation.
	Info,
	/// Alertable finding or failure.
	Error,
}
impl Display for Severity {
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.write_str(match self {
			Self::Info => "info",
			Self::Error => "error",
		})
	}
}

/// Structured record handed to a [`Sink`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
	/// Record severity.
	pub severity: Severity,
	/// Human-readable message.
	pub message: String,
	/// Contextual fields such as `issuer` or key identifier lists.
	pub fields: BTreeMap<String, String>,
}
impl Record {
	/// Informational record.
	pub fn info(message: impl Into<String>) -> Self {
		Self { severity: Severity::Info, message: message.into(), fields: BTreeMap::new() }
	}

	/// Error record.
	pub fn error(message: impl Into<String>) -> Self {
		Self { severity: Severity::Error, message: message.into(), fields: BTreeMap::new() }
	}

	/// Attach a field.
	pub fn field(mut self, name: impl Into<String>, value: impl ToString) -> Self {
		self.fields.insert(name.into(), value.to_string());

		self
	}

	/// Issuer field, when the record concerns a single issuer.
	pub fn issuer(&self) -> Option<&str> {
		self.fields.get("issuer").map(String::as_str)
	}
}

/// Destination for reconciliation records.
pub trait Sink: Send + Sync {
	/// Emit one record.
	fn emit(&self, record: Record);
}
impl<T> Sink for Arc<T>
where
	T: Sink + ?Sized,
{
	fn emit(&self, record: Record) {
		(**self).emit(record)
	}
}

/// Renders records through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;
impl Sink for TracingSink {
	fn emit(&self, record: Record) {
		let issuer = record.issuer().unwrap_or_default();

		match record.severity {
			Severity::Info => tracing::info!(
				target: "jwks_watchdog::report",
				issuer,
				fields = ?record.fields,
				"{}",
				record.message
			),
			Severity::Error => tracing::error!(
				target: "jwks_watchdog::report",
				issuer,
				fields = ?record.fields,
				"{}",
				record.message
			),
		}
	}
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
	records: Mutex<Vec<Record>>,
}
impl MemorySink {
	/// Create an empty sink.
	pub fn new() -> Self {
		Self::default()
	}

	/// Copy of every record emitted so far.
	pub fn records(&self) -> Vec<Record> {
		self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
	}

	/// Drain the collected records.
	pub fn take(&self) -> Vec<Record> {
		std::mem::take(&mut *self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
	}

	/// Records concerning one issuer.
	pub fn for_issuer(&self, issuer: &str) -> Vec<Record> {
		self.records().into_iter().filter(|record| record.issuer() == Some(issuer)).collect()
	}
}
impl Sink for MemorySink {
	fn emit(&self, record: Record) {
		self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(record);
	}
}
