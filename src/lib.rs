//! Query Cache - a pluggable result cache for relational query paths
//!
//! Read queries are addressed by a fingerprint of the statement and its
//! parameters, served from a [`Store`] while fresh, and invalidated wholesale
//! on writes. Two backends share the store contract: an in-process map with
//! lazy expiry, background sweep and oldest-first eviction, and Redis.

pub mod adapter;
pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use adapter::{fingerprint, QueryAdapter};
pub use cache::{connect, MemoryStore, RemoteStore, Store};
pub use config::Config;
pub use error::{CacheError, Result};
