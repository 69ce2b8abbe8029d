//! Query fingerprints.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// Prefix shared by every query key.
pub const KEY_PREFIX: &str = "query:";

/// Derives a cache key from a statement and its bound parameters.
///
/// Whitespace runs in the statement are collapsed first, so reformatting a
/// query does not split its cache entries. Parameters are hashed in their
/// JSON form.
pub fn fingerprint<P>(statement: &str, params: &P) -> Result<String>
where
    P: Serialize + ?Sized,
{
    let normalized = statement.split_whitespace().collect::<Vec<_>>().join(" ");
    let params = serde_json::to_vec(params)?;

    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hasher.update([0u8]);
    hasher.update(&params);

    Ok(format!("{}{}", KEY_PREFIX, hex::encode(hasher.finalize())))
}
