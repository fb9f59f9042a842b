//! Fingerprint hashing using blake3.
//!
//! # Usage
//!
//! ```ignore
//! use crate::utils::hash;
//!
//! let fp = hash::fingerprint("/site/assets/a.js,/site/assets/b.js"); // -> "3b1e4c...", 16 chars
//! ```

use std::path::Path;

/// Hex characters kept from the blake3 digest.
pub const FINGERPRINT_LEN: usize = 16;

/// Hash arbitrary bytes into a short hex fingerprint.
#[inline]
pub fn fingerprint<T: AsRef<[u8]> + ?Sized>(value: &T) -> String {
    let hash = blake3::hash(value.as_ref());
    hash.to_hex().as_str()[..FINGERPRINT_LEN].to_string()
}

/// Fingerprint of an ordered path list, joined with `,`.
///
/// Order matters: the same files in a different order produce a
/// different fingerprint, matching their different concatenation.
pub fn fingerprint_paths<P: AsRef<Path>>(paths: &[P]) -> String {
    let joined = paths
        .iter()
        .map(|p| p.as_ref().to_string_lossy())
        .collect::<Vec<_>>()
        .join(",");
    fingerprint(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_deterministic() {
        let a = fingerprint("a.js,b.js");
        assert_eq!(a.len(), FINGERPRINT_LEN);
        assert_eq!(a, fingerprint("a.js,b.js"));
        assert_ne!(a, fingerprint("b.js,a.js"));
    }

    #[test]
    fn test_fingerprint_paths_joins_with_comma() {
        let paths = ["/site/assets/a.js", "/site/assets/b.js"];
        assert_eq!(
            fingerprint_paths(&paths),
            fingerprint("/site/assets/a.js,/site/assets/b.js")
        );
    }

    #[test]
    fn test_fingerprint_is_hex() {
        assert!(fingerprint("x").chars().all(|c| c.is_ascii_hexdigit()));
    }
}
