//! HTTP helpers for published key set retrieval.

pub mod client;
