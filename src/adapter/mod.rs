//! Query Adapter Module
//!
//! Bridges a data-access layer and a [`Store`](crate::cache::Store): query
//! fingerprints as keys, JSON as the payload format, whole-namespace
//! invalidation on writes.

mod key;
mod query;

pub use key::fingerprint;
pub use query::QueryAdapter;
