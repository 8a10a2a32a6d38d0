//! SRP-6a state machine (C2).
//!
//! Parameters are fixed by the KeePassRPC server: a 512-bit safe prime
//! `N` (below), generator `g = 2`, SHA-256 for `x`/`u`/evidence, and
//! SHA-1 for the multiplier `k`. This is a bespoke parameter set, not
//! RFC 5054 - an off-the-shelf `srp` crate built around the RFC groups
//! cannot be reused here, so the arithmetic is implemented directly on
//! top of `num_bigint`.
//!
//! State diagram (see the specification for the authoritative version):
//!
//! ```text
//! new() ---------------------------> (A generated, ready to identify)
//! set_server(B, s) -----------------> server known
//! evidence_hex() --------------------> M computed, ready to send
//! verify_server_evidence(M2) --------> established | SrpEvidenceMismatch
//! ```
//!
//! Calling `evidence_hex` before `set_server` and `set_password`, or
//! `verify_server_evidence` before `evidence_hex`, is a programming error
//! surfaced as [`Error::PreconditionNotMet`].

use num_bigint::BigUint;
use secrecy::{ExposeSecret, Secret};

use crate::crypto::{hex_to_bytes_padded, lower_hex, random_bytes, sha256, upper_hex};
use crate::error::{Error, Result};
use crate::session_key::SessionKey;

/// The 512-bit safe prime `N`, big-endian.
#[rustfmt::skip]
const N_BYTES: [u8; 64] = [
    0xd4, 0xc7, 0xf8, 0xa2, 0xb3, 0x2c, 0x11, 0xb8, 0xfb, 0xa9, 0x58, 0x1e, 0xc4, 0xba, 0x4f, 0x1b,
    0x04, 0x21, 0x56, 0x42, 0xef, 0x73, 0x55, 0xe3, 0x7c, 0x0f, 0xc0, 0x44, 0x3e, 0xf7, 0x56, 0xea,
    0x2c, 0x6b, 0x8e, 0xeb, 0x75, 0x5a, 0x1c, 0x72, 0x30, 0x27, 0x66, 0x3c, 0xaa, 0x26, 0x5e, 0xf7,
    0x85, 0xb8, 0xff, 0x6a, 0x9b, 0x35, 0x22, 0x7a, 0x52, 0xd8, 0x66, 0x33, 0xdb, 0xdf, 0xca, 0x43,
];

const GENERATOR: u32 = 2;

fn modulus() -> BigUint {
    BigUint::from_bytes_be(&N_BYTES)
}

/// `k = SHA1(N || zero-pad(g, len(N)))`, interpreted as a big-endian
/// integer. `g` is left-padded with zero bytes to the length of `N`.
fn multiplier() -> BigUint {
    let n = modulus();
    let n_bytes = n.to_bytes_be();
    let mut g_padded = vec![0u8; n_bytes.len()];
    let g_bytes = BigUint::from(GENERATOR).to_bytes_be();
    g_padded[n_bytes.len() - g_bytes.len()..].copy_from_slice(&g_bytes);

    let mut input = n_bytes;
    input.extend_from_slice(&g_padded);
    BigUint::from_bytes_be(&crate::crypto::sha1(&input))
}

/// The client side of an SRP-6a handshake. One instance per handshake;
/// dropped once `verify_server_evidence` returns.
pub struct SrpClient {
    identity: String,
    a: Secret<BigUint>,
    a_pub: BigUint,
    server_pub: Option<BigUint>,
    salt: Option<String>,
    passcode: Option<Secret<String>>,
    evidence: Option<BigUint>,
    premaster_hex: Option<String>,
}

impl SrpClient {
    /// Generate a fresh 256-bit private exponent `a` and compute the
    /// public ephemeral `A = g^a mod N`.
    pub fn new(identity: impl Into<String>) -> Self {
        let n = modulus();
        let a = BigUint::from_bytes_be(&random_bytes(32));
        let a_pub = BigUint::from(GENERATOR).modpow(&a, &n);
        Self {
            identity: identity.into(),
            a: Secret::new(a),
            a_pub,
            server_pub: None,
            salt: None,
            passcode: None,
            evidence: None,
            premaster_hex: None,
        }
    }

    /// Construct with an explicit private exponent `a` instead of a
    /// random one. Only exposed to tests, which need reproducible runs
    /// to check the session-key-determinism property.
    #[cfg(test)]
    fn with_private_exponent(identity: impl Into<String>, a: BigUint) -> Self {
        let n = modulus();
        let a_pub = BigUint::from(GENERATOR).modpow(&a, &n);
        Self {
            identity: identity.into(),
            a: Secret::new(a),
            a_pub,
            server_pub: None,
            salt: None,
            passcode: None,
            evidence: None,
            premaster_hex: None,
        }
    }

    /// The client's identity (SRP "I"), sent verbatim to the server.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// `upperHex(A)`, sent in the `identifyToServer` stage.
    pub fn public_ephemeral_hex(&self) -> String {
        upper_hex(&self.a_pub)
    }

    /// Record the server's public ephemeral `B` and salt `s`.
    ///
    /// Rejects `B` if `B mod N == 0` (spec §4.2 safety check). An
    /// odd-length `B` is left-padded with `'0'` before parsing.
    pub fn set_server(&mut self, server_public_hex: &str, salt: &str) -> Result<()> {
        let b = BigUint::from_bytes_be(&hex_to_bytes_padded(server_public_hex)?);
        if &b % modulus() == BigUint::from(0u32) {
            return Err(Error::SrpParameterInvalid("server public ephemeral B ≡ 0 (mod N)".into()));
        }
        self.server_pub = Some(b);
        self.salt = Some(salt.to_owned());
        Ok(())
    }

    /// Record the passcode obtained from the [`crate::prompt::PasscodePrompt`].
    /// Used exactly once per handshake and never cached.
    pub fn set_password(&mut self, passcode: String) {
        self.passcode = Some(Secret::new(passcode));
    }

    /// Compute the client evidence `M` and return it as uppercase hex,
    /// ready to send in the `proofToServer` stage.
    ///
    /// Requires [`Self::set_server`] and [`Self::set_password`] to have
    /// been called first.
    pub fn evidence_hex(&mut self) -> Result<String> {
        let b = self
            .server_pub
            .clone()
            .ok_or_else(|| Error::PreconditionNotMet("server B/s not set before computing evidence".into()))?;
        let salt = self
            .salt
            .clone()
            .ok_or_else(|| Error::PreconditionNotMet("server B/s not set before computing evidence".into()))?;
        let passcode = self
            .passcode
            .as_ref()
            .ok_or_else(|| Error::PreconditionNotMet("passcode not set before computing evidence".into()))?;

        let n = modulus();
        let k = multiplier();
        let g = BigUint::from(GENERATOR);

        // x = SHA256(s || P), raw string bytes concatenated.
        let x_input = [salt.as_bytes(), passcode.expose_secret().as_bytes()].concat();
        let x = BigUint::from_bytes_be(&sha256(&x_input));

        // u = SHA256(upperHex(A) || upperHex(B))
        let u_input = format!("{}{}", upper_hex(&self.a_pub), upper_hex(&b));
        let u = BigUint::from_bytes_be(&sha256(u_input.as_bytes()));

        // S = (B - k*g^x mod N)^(a + u*x) mod N
        let a = self.a.expose_secret();
        let gx = g.modpow(&x, &n);
        let kgx = (&k * &gx) % &n;
        let base = (&n + &b - &kgx) % &n;
        let exp = a + &u * &x;
        let s = base.modpow(&exp, &n);

        // M = SHA256(upperHex(A) || upperHex(B) || upperHex(S))
        let m_input = format!("{}{}{}", upper_hex(&self.a_pub), upper_hex(&b), upper_hex(&s));
        let m = BigUint::from_bytes_be(&sha256(m_input.as_bytes()));

        self.evidence = Some(m.clone());
        self.premaster_hex = Some(upper_hex(&s));
        Ok(upper_hex(&m))
    }

    /// Verify the server's evidence `M2` and, on success, derive the
    /// reusable [`SessionKey`].
    ///
    /// Requires [`Self::evidence_hex`] to have been called first. Note the
    /// intentional case asymmetry: `M` is hashed in *lower* case here,
    /// while `A` and `S` stay upper case - this matches the peer exactly.
    pub fn verify_server_evidence(&self, server_evidence_hex: &str) -> Result<SessionKey> {
        let m = self
            .evidence
            .as_ref()
            .ok_or_else(|| Error::PreconditionNotMet("evidence not computed before verifying server proof".into()))?;
        let s_hex = self
            .premaster_hex
            .as_ref()
            .ok_or_else(|| Error::PreconditionNotMet("evidence not computed before verifying server proof".into()))?;

        // M2 = SHA256(upperHex(A) || lowerHex(M) || upperHex(S))
        let m2_input = format!("{}{}{}", upper_hex(&self.a_pub), lower_hex(m), s_hex);
        let expected_m2 = sha256(m2_input.as_bytes());

        let received = hex_to_bytes_padded(server_evidence_hex)?;
        if !crate::crypto::hash::constant_time_eq(&expected_m2, &received) {
            return Err(Error::SrpEvidenceMismatch);
        }

        // SessionKey = SHA256(upperHex(S)), stored as its minimal big-endian
        // encoding (no leading zero byte), matching the server.
        let session_key = sha256(s_hex.as_bytes());
        Ok(SessionKey::from_biguint(&BigUint::from_bytes_be(&session_key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiplier_matches_known_value() {
        let expected = "b7867f1299da8cc24ab93e08986ebc4d6a478ad0";
        assert_eq!(lower_hex(&multiplier()), expected);
    }

    #[test]
    fn server_public_zero_mod_n_is_rejected() {
        let mut client = SrpClient::new("tester");
        let err = client.set_server(&upper_hex(&modulus()), "salt").unwrap_err();
        assert!(matches!(err, Error::SrpParameterInvalid(_)));
    }

    #[test]
    fn evidence_before_server_set_fails() {
        let mut client = SrpClient::new("tester");
        client.set_password("password".into());
        assert!(matches!(
            client.evidence_hex().unwrap_err(),
            Error::PreconditionNotMet(_)
        ));
    }

    #[test]
    fn evidence_before_password_set_fails() {
        let mut client = SrpClient::new("tester");
        client.set_server(&upper_hex(&BigUint::from(12345u32)), "salt").unwrap();
        assert!(matches!(
            client.evidence_hex().unwrap_err(),
            Error::PreconditionNotMet(_)
        ));
    }

    #[test]
    fn verify_before_evidence_computed_fails() {
        let mut client = SrpClient::new("tester");
        client.set_server(&upper_hex(&BigUint::from(12345u32)), "salt").unwrap();
        client.set_password("password".into());
        assert!(matches!(
            client.verify_server_evidence("00").unwrap_err(),
            Error::PreconditionNotMet(_)
        ));
    }

    /// Build a server ephemeral (B, S, M, M2) the way a real KeePassRPC
    /// server would, so the client state machine can be exercised
    /// end-to-end without a live server.
    fn server_side(a_pub: &BigUint, b_priv: &BigUint, salt: &str, password: &str) -> (BigUint, BigUint, BigUint) {
        let n = modulus();
        let g = BigUint::from(GENERATOR);
        let k = multiplier();

        let x = BigUint::from_bytes_be(&sha256(format!("{salt}{password}").as_bytes()));
        let v = g.modpow(&x, &n);
        let b_pub = (&k * &v + g.modpow(b_priv, &n)) % &n;

        let u = BigUint::from_bytes_be(&sha256(format!("{}{}", upper_hex(a_pub), upper_hex(&b_pub)).as_bytes()));
        let s = (a_pub * v.modpow(&u, &n)).modpow(b_priv, &n);

        let m_input = format!("{}{}{}", upper_hex(a_pub), upper_hex(&b_pub), upper_hex(&s));
        let m = BigUint::from_bytes_be(&sha256(m_input.as_bytes()));
        let m2_input = format!("{}{}{}", upper_hex(a_pub), lower_hex(&m), upper_hex(&s));
        let m2 = BigUint::from_bytes_be(&sha256(m2_input.as_bytes()));

        (b_pub, m, m2)
    }

    #[test]
    fn full_handshake_round_trips() {
        let salt = "salt";
        let password = "password";
        let b_priv = BigUint::from_bytes_be(&random_bytes(32));

        let mut client = SrpClient::new("alice");
        client.set_password(password.into());

        let (b_pub, expected_m, expected_m2) = server_side(&client.a_pub, &b_priv, salt, password);
        client.set_server(&upper_hex(&b_pub), salt).unwrap();

        let m_hex = client.evidence_hex().unwrap();
        assert_eq!(m_hex, upper_hex(&expected_m));

        let session_key = client.verify_server_evidence(&upper_hex(&expected_m2)).unwrap();
        assert_eq!(session_key.minimal_bytes().len(), 32);
    }

    #[test]
    fn session_key_is_deterministic_given_fixed_inputs() {
        let salt = "salt";
        let password = "password";
        let a = BigUint::from(7u32);
        let b_priv = BigUint::from(11u32);

        let derive = || -> Vec<u8> {
            let mut client = SrpClient::with_private_exponent("alice", a.clone());
            client.set_password(password.into());
            let (b_pub, _m, m2) = server_side(&client.a_pub, &b_priv, salt, password);
            client.set_server(&upper_hex(&b_pub), salt).unwrap();
            client.evidence_hex().unwrap();
            client.verify_server_evidence(&upper_hex(&m2)).unwrap().minimal_bytes().to_vec()
        };

        assert_eq!(derive(), derive());
    }

    #[test]
    fn wrong_password_fails_evidence_check() {
        let salt = "salt";
        let b_priv = BigUint::from_bytes_be(&random_bytes(32));

        let mut client = SrpClient::new("alice");
        client.set_password("wrong-password".into());

        let (b_pub, _m, m2) = server_side(&client.a_pub, &b_priv, salt, "correct-password");
        client.set_server(&upper_hex(&b_pub), salt).unwrap();
        client.evidence_hex().unwrap();

        assert!(matches!(
            client.verify_server_evidence(&upper_hex(&m2)).unwrap_err(),
            Error::SrpEvidenceMismatch
        ));
    }
}
