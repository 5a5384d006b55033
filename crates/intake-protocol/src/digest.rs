//! Canonical request digests.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Failure to canonicalize a value before hashing.
#[derive(Debug, thiserror::Error)]
#[error("JCS serialization failed: {0}")]
pub struct DigestError(pub String);

/// SHA-256 hex digest of the RFC 8785 (JCS) encoding of `value`.
///
/// Object key order in the input does not affect the result.
pub fn canonical_sha256<T: Serialize>(value: &T) -> Result<String, DigestError> {
    let jcs_bytes =
        serde_json_canonicalizer::to_vec(value).map_err(|e| DigestError(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(&jcs_bytes);
    Ok(hex::encode(hasher.finalize()))
}
