//! Challenge/response state machine (C3): resume a session using a
//! cached [`SessionKey`] instead of running full SRP.
//!
//! Security level is hard-coded to `2` per the specification. The client
//! challenge `cc` is generated up front but is **not** sent until the
//! server's own challenge `sc` arrives - the server replies first.

use num_bigint::BigUint;

use crate::crypto::{hash::constant_time_eq, random_bytes, sha256, upper_hex};
use crate::error::Result;
use crate::session_key::SessionKey;

/// One resumption attempt. Transient: constructed fresh per `Session::open`
/// call, dropped once the server's response is validated (or rejected).
pub struct ChallengeResponse {
    client_challenge: String,
}

impl ChallengeResponse {
    /// Generate a fresh 256-bit client challenge `cc`.
    pub fn new() -> Self {
        let cc = BigUint::from_bytes_be(&random_bytes(32));
        Self {
            client_challenge: cc.to_str_radix(16),
        }
    }

    /// The client challenge `cc`, sent alongside the response (not on its
    /// own - the server challenge arrives first).
    pub fn client_challenge(&self) -> &str {
        &self.client_challenge
    }

    /// Compute `CR = hex(SHA256("1" || upperHex(SessionKey) || sc || cc))`
    /// in response to the server's challenge `sc`.
    pub fn respond(&self, session_key: &SessionKey, server_challenge: &str) -> String {
        let input = format!(
            "1{}{}{}",
            session_key.upper_hex(),
            server_challenge,
            self.client_challenge
        );
        hex::encode(sha256(input.as_bytes()))
    }

    /// Recompute the expected server response `SR' = hex(SHA256("0" ||
    /// upperHex(SessionKey) || sc || cc))` and compare it in constant time
    /// against the server's `sr`.
    ///
    /// On mismatch the resumption has failed: the caller (the session
    /// orchestrator) drops the cached key and falls back to full SRP -
    /// this is [`crate::error::Error::ResumeRejected`], not fatal.
    pub fn verify_server_response(
        &self,
        session_key: &SessionKey,
        server_challenge: &str,
        server_response_hex: &str,
    ) -> Result<()> {
        let input = format!(
            "0{}{}{}",
            session_key.upper_hex(),
            server_challenge,
            self.client_challenge
        );
        let expected = sha256(input.as_bytes());
        let expected_hex = hex::encode(expected);

        if constant_time_eq(expected_hex.as_bytes(), server_response_hex.as_bytes()) {
            Ok(())
        } else {
            Err(crate::error::Error::ResumeRejected(
                "server challenge/response proof did not match".into(),
            ))
        }
    }
}

impl Default for ChallengeResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal hex encode/decode, local to this module so the rest of the
/// crate doesn't need to pull in a dedicated hex crate for this one spot.
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_spec_test_vector() {
        let session_key = SessionKey::from_minimal_bytes(vec![0x01]);
        let cr = ChallengeResponse {
            client_challenge: "bb".to_owned(),
        };
        let expected_cr = hex::encode(sha256(b"11aabb"));
        assert_eq!(cr.respond(&session_key, "aa"), expected_cr);

        let expected_sr = hex::encode(sha256(b"01aabb"));
        assert!(cr.verify_server_response(&session_key, "aa", &expected_sr).is_ok());
    }

    #[test]
    fn mismatched_server_response_is_resume_rejected() {
        let session_key = SessionKey::from_minimal_bytes(vec![0x01]);
        let cr = ChallengeResponse::new();
        let err = cr
            .verify_server_response(&session_key, "aa", "0000000000000000000000000000000000000000000000000000000000000000")
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::ResumeRejected(_)));
    }
}
