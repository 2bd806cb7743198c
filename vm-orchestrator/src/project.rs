//! Project namespaces derived from an account email.

use data_encoding::BASE32;
use sha2::{Digest, Sha256};

const NAMESPACE_PREFIX: &str = "swift-";
const HASH_CHARS: usize = 20;

/// `swift-` followed by the first 20 base32 characters (lower-cased) of the
/// SHA-256 of the trimmed, lower-cased email. Stable across case and padding.
pub fn namespace_for_email(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    let encoded = BASE32.encode(&digest);
    format!(
        "{NAMESPACE_PREFIX}{}",
        encoded[..HASH_CHARS].to_ascii_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_namespace() {
        assert_eq!(
            namespace_for_email("alice@example.com"),
            "swift-76gzqgp4byjl6djerexe"
        );
    }

    #[test]
    fn test_namespace_shape() {
        let ns = namespace_for_email("alice@example.com");
        assert!(ns.starts_with("swift-"));
        assert_eq!(ns.len(), "swift-".len() + 20);
        assert!(ns[6..]
            .chars()
            .all(|c| c.is_ascii_lowercase() || ('2'..='7').contains(&c)));
    }

    #[test]
    fn test_namespace_normalizes_email() {
        assert_eq!(
            namespace_for_email("  Alice@Example.COM "),
            namespace_for_email("alice@example.com")
        );
        assert_ne!(
            namespace_for_email("alice@example.com"),
            namespace_for_email("bob@example.com")
        );
    }
}
