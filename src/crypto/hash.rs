//! SHA-1 / SHA-256 wrappers, and KeePassRPC's non-standard "HMAC".
//!
//! KeePassRPC's record tag is **not** RFC 2104 HMAC. It is a nested SHA-1
//! construction: `H(H(key) || ciphertext || iv)`. Reimplementing this with
//! a real HMAC function will not interoperate with the server.

use sha1::Sha1;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// SHA-1 digest of `data`.
pub fn sha1(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// KeePassRPC's "HMAC": `SHA1(SHA1(sessionKeyBytes) || message || iv)`.
///
/// `session_key_bytes` is the big-endian minimal-byte encoding of the
/// session-key integer (no leading zero) - see [`crate::session_key`].
pub fn keepassrpc_record_tag(session_key_bytes: &[u8], message: &[u8], iv: &[u8]) -> [u8; 20] {
    let inner = sha1(session_key_bytes);
    let mut hasher = Sha1::new();
    hasher.update(inner);
    hasher.update(message);
    hasher.update(iv);
    hasher.finalize().into()
}

/// Constant-time byte comparison, used everywhere two tags/evidences are
/// compared so that a mismatch cannot be timed by an attacker.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_tag_matches_nested_construction() {
        let key = b"session-key-bytes";
        let message = b"ciphertext";
        let iv = b"0123456789abcdef";

        let expected = sha1(&[sha1(key).as_slice(), message, iv].concat());
        assert_eq!(keepassrpc_record_tag(key, message, iv), expected);
    }

    #[test]
    fn constant_time_eq_detects_any_bit_flip() {
        let a = [0xAAu8; 20];
        let mut b = a;
        assert!(constant_time_eq(&a, &b));
        b[10] ^= 0x01;
        assert!(!constant_time_eq(&a, &b));
    }
}
