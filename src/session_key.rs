//! The shared secret born at the end of a successful SRP handshake.
//!
//! A [`SessionKey`] plays three roles in the protocol: it is hashed into
//! the challenge/response resumption proof, its minimal big-endian bytes
//! feed the record "HMAC", and the low 16 bytes of those same bytes are
//! the AES-128 key. Keeping all three derivations on one type avoids the
//! easy mistake of mixing up which byte slice goes where.

use num_bigint::BigUint;
use secrecy::{ExposeSecret, Secret};

use crate::crypto::{hex_to_bytes_padded, lower_hex, upper_hex};
use crate::error::Result;

/// A 256-bit value derived from the SRP premaster secret. Reused across
/// connections (via the [`crate::store::CredentialStore`]) until the
/// server rejects a resumption attempt.
#[derive(Clone)]
pub struct SessionKey(Secret<Vec<u8>>);

impl SessionKey {
    /// Wrap the minimal big-endian bytes of a session-key integer.
    pub fn from_minimal_bytes(bytes: Vec<u8>) -> Self {
        Self(Secret::new(bytes))
    }

    /// Derive from a [`BigUint`] (e.g. `SHA256(upperHex(S))` during SRP).
    pub fn from_biguint(n: &BigUint) -> Self {
        Self::from_minimal_bytes(n.to_bytes_be())
    }

    /// Parse from a hex string as persisted by the credential store.
    pub fn from_hex(hex: &str) -> Result<Self> {
        Ok(Self::from_minimal_bytes(hex_to_bytes_padded(hex)?))
    }

    /// The big-endian minimal-byte encoding (no leading zero) used as the
    /// "HMAC" key input.
    pub fn minimal_bytes(&self) -> &[u8] {
        self.0.expose_secret()
    }

    /// The AES-128 key: the low 16 bytes of [`Self::minimal_bytes`],
    /// left-padded with zeroes if the minimal encoding is shorter.
    pub fn aes_key(&self) -> [u8; 16] {
        let bytes = self.minimal_bytes();
        let mut key = [0u8; 16];
        let n = bytes.len().min(16);
        key[16 - n..].copy_from_slice(&bytes[bytes.len() - n..]);
        key
    }

    /// Uppercase hex of the underlying integer, used as `upperHex` input
    /// to the challenge/response hash.
    pub fn upper_hex(&self) -> String {
        upper_hex(&BigUint::from_bytes_be(self.minimal_bytes()))
    }

    /// Lowercase hex of the underlying integer, used for persistence.
    pub fn lower_hex(&self) -> String {
        lower_hex(&BigUint::from_bytes_be(self.minimal_bytes()))
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey(REDACTED)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aes_key_takes_low_16_bytes() {
        let mut bytes = vec![0xFFu8; 32];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        let key = SessionKey::from_minimal_bytes(bytes.clone());
        assert_eq!(&key.aes_key()[..], &bytes[16..]);
    }

    #[test]
    fn aes_key_left_pads_short_keys() {
        let key = SessionKey::from_minimal_bytes(vec![0xAB]);
        let expected = {
            let mut k = [0u8; 16];
            k[15] = 0xAB;
            k
        };
        assert_eq!(key.aes_key(), expected);
    }

    #[test]
    fn hex_round_trip() {
        let key = SessionKey::from_minimal_bytes(vec![0x01, 0x02, 0x03]);
        let hex = key.upper_hex();
        let parsed = SessionKey::from_hex(&hex).unwrap();
        assert_eq!(parsed.minimal_bytes(), key.minimal_bytes());
    }
}
