//! Constant-time credential comparison.

use crate::crypto::digest::sha256;
use subtle::ConstantTimeEq;

/// Compare two secrets without leaking where or whether their lengths differ.
///
/// Both sides are hashed first, so the comparison always runs over 32
/// bytes regardless of input length.
pub fn secrets_match(provided: &str, expected: &str) -> bool {
    let provided = sha256(provided.as_bytes());
    let expected = sha256(expected.as_bytes());
    provided[..].ct_eq(&expected[..]).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_secrets_match() {
        assert!(secrets_match("s3cret-token", "s3cret-token"));
    }

    #[test]
    fn test_different_content_rejected() {
        assert!(!secrets_match("s3cret-tokem", "s3cret-token"));
    }

    #[test]
    fn test_different_length_rejected() {
        assert!(!secrets_match("s3cret", "s3cret-token"));
        assert!(!secrets_match("", "s3cret-token"));
    }
}
