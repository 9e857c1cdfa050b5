//! ETag computation for JSON payloads.
//!
//! An ETag is the quoted hex SHA-256 of the exact bytes sent to the client,
//! so two responses share a tag only if their bodies are identical.

use axum::http::{HeaderMap, header};
use sha2::{Digest, Sha256};

/// Compute a strong ETag for `body`.
pub fn compute_etag(body: &[u8]) -> String {
  let hash = Sha256::digest(body);
  format!("\"{}\"", hex::encode(hash))
}

/// Whether the request's `If-None-Match` header matches `etag`.
///
/// Handles `*`, comma-separated lists and weak (`W/`) validators.
pub fn if_none_match(headers: &HeaderMap, etag: &str) -> bool {
  headers
    .get_all(header::IF_NONE_MATCH)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(','))
    .map(str::trim)
    .any(|candidate| {
      candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}
