//! Request identity keys.

use sha2::{Digest, Sha256};

/// Compute the cache key identifying a request: method plus URL, query
/// included, fragment ignored.
pub fn compute_request_key(method: &str, url: &str) -> String {
    let url = url.split_once('#').map_or(url, |(before, _)| before);
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
