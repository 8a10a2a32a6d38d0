//! Big-endian hex conversions for SRP's arbitrary-precision integers.
//!
//! KeePassRPC's wire format is fussy about hex case: evidence values mix
//! upper- and lower-case hex in the same hash input (see
//! [`crate::srp`]), and servers occasionally emit an odd-length `B` that
//! must be left-padded before it is parsed. `num_bigint::BigUint` gives us
//! the arithmetic; this module gives us the exact string forms the peer
//! expects.

use num_bigint::BigUint;

use crate::error::{Error, Result};

/// Render `n` as uppercase hex with no leading zero, matching
/// `upperHex(...)` in the specification.
pub fn upper_hex(n: &BigUint) -> String {
    n.to_str_radix(16).to_uppercase()
}

/// Render `n` as lowercase hex with no leading zero, matching
/// `lowerHex(...)` in the specification.
pub fn lower_hex(n: &BigUint) -> String {
    n.to_str_radix(16).to_lowercase()
}

/// Parse a hex string into bytes, left-padding with a `'0'` nibble first
/// if the string has odd length (so `"abc"` and `"0abc"` decode to the
/// same bytes, per the SRP safety checks in the specification).
pub fn hex_to_bytes_padded(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    if s.is_empty() {
        return Err(Error::SrpParameterInvalid("empty hex string".into()));
    }
    let owned;
    let padded = if s.len() % 2 != 0 {
        owned = format!("0{s}");
        owned.as_str()
    } else {
        s
    };
    (0..padded.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&padded[i..i + 2], 16)
                .map_err(|e| Error::SrpParameterInvalid(format!("invalid hex: {e}")))
        })
        .collect()
}

/// Parse a hex string (odd-length tolerant) directly into a `BigUint`.
pub fn hex_to_bigint(s: &str) -> Result<BigUint> {
    Ok(BigUint::from_bytes_be(&hex_to_bytes_padded(s)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_length_hex_matches_padded() {
        assert_eq!(hex_to_bigint("abc").unwrap(), hex_to_bigint("0abc").unwrap());
    }

    #[test]
    fn upper_and_lower_hex_have_no_leading_zero() {
        let n = BigUint::from(0x0Fu32);
        assert_eq!(upper_hex(&n), "F");
        assert_eq!(lower_hex(&n), "f");
    }

    #[test]
    fn round_trip() {
        let original = BigUint::from(0x00010AFF10u64);
        let hex = upper_hex(&original);
        assert_eq!(hex_to_bigint(&hex).unwrap(), original);
    }
}
