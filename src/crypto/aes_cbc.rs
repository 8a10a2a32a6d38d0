//! AES-128-CBC with KeePassRPC's PKCS#7 deviation.
//!
//! Standard PKCS#7 always adds between 1 and `block_size` bytes of
//! padding. KeePassRPC follows that rule when the plaintext is *not*
//! already a multiple of the block size, but when it already is, it still
//! appends a full extra block (also standard PKCS#7 - some
//! implementations wrongly skip this case, which is why it's called out
//! explicitly in the specification).

use aes::Aes128;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::{Error, Result};

const BLOCK_SIZE: usize = 16;

type Encryptor = cbc::Encryptor<Aes128>;
type Decryptor = cbc::Decryptor<Aes128>;

/// Pad `data` per KeePassRPC's PKCS#7 variant: always append between 1 and
/// 16 bytes, each byte equal to the number of padding bytes added.
pub fn pad(data: &[u8]) -> Vec<u8> {
    let remainder = data.len() % BLOCK_SIZE;
    let pad_len = if remainder == 0 { BLOCK_SIZE } else { BLOCK_SIZE - remainder };
    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    out.extend(std::iter::repeat(pad_len as u8).take(pad_len));
    out
}

/// Reverse [`pad`], validating that every padding byte equals the declared
/// length and that the length lies in `[1, 16]`. Any violation is a fatal
/// decode error - the caller should treat the session as desynchronised.
pub fn unpad(data: &[u8]) -> Result<Vec<u8>> {
    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(Error::CryptoFailure("padded length is not a positive multiple of 16".into()));
    }
    let pad_len = *data.last().expect("checked non-empty") as usize;
    if pad_len == 0 || pad_len > BLOCK_SIZE || pad_len > data.len() {
        return Err(Error::CryptoFailure(format!("invalid padding length {pad_len}")));
    }
    let (body, padding) = data.split_at(data.len() - pad_len);
    if !padding.iter().all(|&b| b as usize == pad_len) {
        return Err(Error::CryptoFailure("padding bytes do not match declared length".into()));
    }
    Ok(body.to_vec())
}

/// Pad, then AES-128-CBC encrypt `plaintext` under `key`/`iv`.
pub fn encrypt(key: &[u8; 16], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    let mut buf = pad(plaintext);
    let n = buf.len();
    Encryptor::new(key.into(), iv.into())
        .encrypt_padded_mut::<NoPadding>(&mut buf, n)
        .expect("buffer is already a multiple of the block size")
        .to_vec()
}

/// AES-128-CBC decrypt `ciphertext` under `key`/`iv`, then strip padding.
pub fn decrypt(key: &[u8; 16], iv: &[u8; 16], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(Error::CryptoFailure("ciphertext length is not a multiple of 16".into()));
    }
    let mut buf = ciphertext.to_vec();
    let decrypted = Decryptor::new(key.into(), iv.into())
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|e| Error::CryptoFailure(format!("AES-CBC decrypt failed: {e}")))?;
    unpad(decrypted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_round_trips_for_every_length_up_to_one_block() {
        for len in 0..=64usize {
            let msg = vec![0x42u8; len];
            let padded = pad(&msg);
            assert_eq!(padded.len() % 16, 0);
            assert!(padded.len() > 0);
            if len % 16 == 0 {
                assert_eq!(padded.len(), len + 16);
            }
            assert_eq!(unpad(&padded).unwrap(), msg);
        }
    }

    #[test]
    fn encrypt_decrypt_round_trips() {
        let key = [0x11u8; 16];
        let iv = [0x22u8; 16];
        let ciphertext = encrypt(&key, &iv, b"hello");
        let plaintext = decrypt(&key, &iv, &ciphertext).unwrap();
        assert_eq!(plaintext, b"hello");
    }

    #[test]
    fn bit_flip_in_ciphertext_fails_to_decrypt_or_unpad() {
        let key = [0x11u8; 16];
        let iv = [0x22u8; 16];
        let mut ciphertext = encrypt(&key, &iv, b"hello world, this is a test!!!!");
        ciphertext[0] ^= 0x01;
        // A flipped byte in the first block will not, by itself, corrupt
        // PKCS#7 padding (CBC only propagates corruption into the next
        // block), so assert on the decrypted bytes differing instead.
        let plaintext = decrypt(&key, &iv, &ciphertext);
        match plaintext {
            Ok(bytes) => assert_ne!(bytes, b"hello world, this is a test!!!!"),
            Err(Error::CryptoFailure(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unpad_rejects_corrupted_padding() {
        let mut block = vec![0u8; 16];
        block[15] = 0; // invalid: length must be in [1, 16]
        assert!(unpad(&block).is_err());

        let mut block = vec![0u8; 16];
        block[15] = 17; // invalid: exceeds block size
        assert!(unpad(&block).is_err());

        let mut block = vec![5u8; 16];
        block[10] = 4; // byte doesn't match declared pad length
        assert!(unpad(&block).is_err());
    }
}
