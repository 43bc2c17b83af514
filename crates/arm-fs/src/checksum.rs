//! SHA-256 checksum utilities
//!
//! Provides a single canonical checksum format (`sha256:<hex>`) used by the
//! lockfile, the cache and reconciliation for content integrity checks.

use sha2::{Digest, Sha256};

use crate::PackageFile;

/// Prefix for all checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute the SHA-256 checksum of raw content.
///
/// Returns a string in the canonical format `"sha256:<hex>"`.
pub fn compute_content_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Compute the checksum of a package's file set.
///
/// Files are hashed in canonical order (lexicographic by path) as the byte
/// sequence `path NUL content NUL` for each file. The input order does not
/// matter, so two equal file sets always produce the same checksum.
pub fn compute_package_checksum(files: &[PackageFile]) -> String {
    let mut ordered: Vec<&PackageFile> = files.iter().collect();
    ordered.sort_by(|a, b| a.path.as_str().cmp(b.path.as_str()));

    let mut hasher = Sha256::new();
    for file in ordered {
        hasher.update(file.path.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(&file.content);
        hasher.update([0u8]);
    }
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Check that a string is a well-formed `sha256:<64 lowercase hex>` checksum.
pub fn is_valid_checksum(value: &str) -> bool {
    value
        .strip_prefix(PREFIX)
        .is_some_and(|hex| hex.len() == 64 && hex.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_checksum_known_value() {
        let checksum = compute_content_checksum(b"hello world");
        assert_eq!(
            checksum,
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn package_checksum_ignores_input_order() {
        let a = PackageFile::new("a.yml", "A");
        let b = PackageFile::new("b.yml", "B");
        let forward = compute_package_checksum(&[a.clone(), b.clone()]);
        let reverse = compute_package_checksum(&[b, a]);
        assert_eq!(forward, reverse);
    }

    #[test]
    fn package_checksum_matches_manual_framing() {
        let files = vec![PackageFile::new("b.yml", "B"), PackageFile::new("a.yml", "A")];
        let expected = compute_content_checksum(b"a.yml\0A\0b.yml\0B\0");
        assert_eq!(compute_package_checksum(&files), expected);
    }

    #[test]
    fn package_checksum_distinguishes_path_from_content() {
        // Moving bytes between path and content must change the hash
        let one = compute_package_checksum(&[PackageFile::new("ab", "c")]);
        let two = compute_package_checksum(&[PackageFile::new("a", "bc")]);
        assert_ne!(one, two);
    }

    #[test]
    fn empty_package_has_stable_checksum() {
        assert_eq!(compute_package_checksum(&[]), compute_content_checksum(b""));
    }

    #[test]
    fn validates_checksum_format() {
        assert!(is_valid_checksum(&compute_content_checksum(b"x")));
        assert!(!is_valid_checksum("sha256:abc"));
        assert!(!is_valid_checksum("md5:d41d8cd98f00b204e9800998ecf8427e"));
    }
}
