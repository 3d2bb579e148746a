use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};

/// Raw bytes behind every session and verification token.
pub const TOKEN_BYTES: usize = 32;
/// Length of the base64url (unpadded) encoding of [`TOKEN_BYTES`].
pub const TOKEN_LEN: usize = 43;

/// Source of cryptographically strong random bytes.
pub trait TokenSource: Send + Sync {
    fn fill(&self, buf: &mut [u8]);
}

/// Operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsTokenSource;

impl TokenSource for OsTokenSource {
    fn fill(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }
}

/// New opaque token: 32 random bytes, base64url without padding.
pub fn generate(source: &dyn TokenSource) -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    source.fill(&mut bytes);
    Base64UrlUnpadded::encode_string(&bytes)
}

/// Cheap shape check done before any storage lookup.
pub fn is_well_formed(token: &str) -> bool {
    if token.len() != TOKEN_LEN {
        return false;
    }
    let mut buf = [0u8; TOKEN_BYTES];
    matches!(Base64UrlUnpadded::decode(token, &mut buf), Ok(b) if b.len() == TOKEN_BYTES)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_tokens_are_well_formed_and_distinct() {
        let seen: HashSet<String> = (0..256).map(|_| generate(&OsTokenSource)).collect();
        assert_eq!(seen.len(), 256);
        for t in &seen {
            assert_eq!(t.len(), TOKEN_LEN);
            assert!(is_well_formed(t), "{t}");
            assert!(t.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("abc"));
        assert!(!is_well_formed(&"!".repeat(TOKEN_LEN)));
        let padded = format!("{}=", generate(&OsTokenSource));
        assert!(!is_well_formed(&padded));
    }
}
