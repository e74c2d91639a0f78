//! Content-addressed version identifiers.

use sha2::{Digest, Sha256};

/// Compute the version hash for a manifest: a digest over the manifest URL
/// and its text, so identical bodies at different URLs stay distinct.
pub fn version_hash(manifest_url: &str, manifest_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(manifest_url.as_bytes());
    hasher.update(b"\n");
    hasher.update(manifest_text.as_bytes());
    hex::encode(hasher.finalize())
}
