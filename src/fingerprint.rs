//! Content-addressed identifier for a source buffer.
//!
//! A [`Fingerprint`] is the primary cache key used throughout the crate:
//! the full-analysis cache, the signature-only cache, and the in-flight
//! compilation map are all keyed on it. Two buffers with equal bytes always
//! yield equal fingerprints; there is no other state involved.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A stable, content-derived identifier for a source buffer.
///
/// Computed as the SHA-256 digest of the buffer's raw bytes. Collision
/// resistance is inherited from SHA-256; the crate does not attempt to
/// detect or handle a collision.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Hashes `bytes` into a [`Fingerprint`].
    ///
    /// Deterministic: calling this twice on equal byte slices always
    /// produces equal fingerprints, regardless of process or machine.
    pub fn of(bytes: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes.as_ref());
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// Returns the raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic() {
        let a = Fingerprint::of(b"pragma solidity ^0.8.20;");
        let b = Fingerprint::of(b"pragma solidity ^0.8.20;");
        assert_eq!(a, b);
    }

    #[test]
    fn distinguishes_different_content() {
        let a = Fingerprint::of(b"contract A {}");
        let b = Fingerprint::of(b"contract B {}");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_buffer_is_stable() {
        assert_eq!(Fingerprint::of(b""), Fingerprint::of(""));
    }

    #[test]
    fn display_is_64_lowercase_hex_chars() {
        let fp = Fingerprint::of(b"abc");
        let s = fp.to_string();
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
