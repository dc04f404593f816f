//! Shared SHA-256 digest utilities.
//!
//! Used for synthetic natural keys (`external_ref` fingerprints when a
//! source file carries no voucher number) and for the deterministic phone
//! hashes that keep contact upserts idempotent under field encryption.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Fingerprint a set of identifying fields into one stable digest.
///
/// Parts are joined with `|` before hashing, so reordering or merging
/// fields produces a different key.
pub fn fingerprint(parts: &[&str]) -> String {
    sha256_hex(parts.join("|").as_bytes())
}

/// A short (12 hex char) fingerprint for human-visible generated values.
pub fn short_fingerprint(parts: &[&str]) -> String {
    let mut digest = fingerprint(parts);
    digest.truncate(12);
    digest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_produces_known_hash() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn fingerprint_is_order_sensitive() {
        assert_ne!(fingerprint(&["a", "b"]), fingerprint(&["b", "a"]));
    }

    #[test]
    fn fingerprint_separates_fields() {
        // "ab" + "c" must not collide with "a" + "bc".
        assert_ne!(fingerprint(&["ab", "c"]), fingerprint(&["a", "bc"]));
    }

    #[test]
    fn short_fingerprint_is_twelve_chars() {
        assert_eq!(short_fingerprint(&["x"]).len(), 12);
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let parts = ["tenant", "9991112222"];
        assert_eq!(fingerprint(&parts), fingerprint(&parts));
    }
}
