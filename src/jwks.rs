//! Key and key-set model shared by the local and remote sides of a reconciliation.
//!
//! Keys are compared by `kid` only. The remaining members are carried as opaque strings so that
//! both sides parse into the same shape, but no key material is ever interpreted.

// crates.io
use serde::{Deserialize, Serialize};

/// Signing-key descriptor as published in a JWKS document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
	/// Key identifier; unique within a set but not globally.
	#[serde(default)]
	pub kid: String,
	/// Key type, e.g. `RSA`.
	#[serde(default)]
	pub kty: String,
	/// Intended usage, e.g. `sig`.
	#[serde(default, rename = "use")]
	pub usage: String,
	/// Signing algorithm, e.g. `RS256`.
	#[serde(default)]
	pub alg: String,
	/// Modulus.
	#[serde(default)]
	pub n: String,
	/// Exponent.
	#[serde(default)]
	pub e: String,
}
impl Key {
	/// Build a key carrying only an identifier.
	pub fn with_kid(kid: impl Into<String>) -> Self {
		Self { kid: kid.into(), ..Default::default() }
	}
}

/// Unordered collection of keys parsed from `{"keys": [...]}`.
///
/// Duplicate identifiers are preserved as-is.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySet {
	/// Keys in document order.
	pub keys: Vec<Key>,
}
impl KeySet {
	/// Parse a JWKS document. The `keys` array is required.
	pub fn from_json(raw: &str) -> serde_json::Result<Self> {
		serde_json::from_str(raw)
	}

	/// Parse a JWKS document from raw bytes.
	pub fn from_slice(raw: &[u8]) -> serde_json::Result<Self> {
		serde_json::from_slice(raw)
	}

	/// Build a set from bare key identifiers.
	pub fn from_kids<I, S>(kids: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self { keys: kids.into_iter().map(Key::with_kid).collect() }
	}

	/// Whether any key in the set carries the given identifier.
	pub fn contains_kid(&self, kid: &str) -> bool {
		self.keys.iter().any(|key| key.kid == kid)
	}

	/// Key identifiers in document order.
	pub fn kids(&self) -> Vec<String> {
		self.keys.iter().map(|key| key.kid.clone()).collect()
	}

	/// Number of keys, duplicates included.
	pub fn len(&self) -> usize {
		self.keys.len()
	}

	/// Whether the set holds no keys.
	pub fn is_empty(&self) -> bool {
		self.keys.is_empty()
	}

	/// First key of `self` whose identifier is absent from `known`.
	pub fn first_unseen<'a>(&'a self, known: &KeySet) -> Option<&'a Key> {
		self.keys.iter().find(|key| !known.contains_kid(&key.kid))
	}
}

/// Keys of `remote` whose identifier is absent from `local`, in `remote` order.
///
/// Only this direction is checked: local keys missing remotely are retired keys kept for grace
/// period validation and are never reported.
pub fn membership_mismatch<'a>(local: &KeySet, remote: &'a KeySet) -> Vec<&'a Key> {
	remote.keys.iter().filter(|key| !local.contains_kid(&key.kid)).collect()
}

/// Render key identifiers as a compact label value, e.g. `[a, b]`.
pub fn format_kids(kids: &[String]) -> String {
	format!("[{}]", kids.join(", "))
}
