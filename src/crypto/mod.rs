//! Arbitrary-precision integer helpers, hashing, and the AES-CBC record
//! layer that the SRP, challenge/response, and transport layers build on.

pub mod aes_cbc;
pub mod bigint;
pub mod hash;
pub mod rng;

pub use aes_cbc::{decrypt, encrypt, pad, unpad};
pub use bigint::{hex_to_bytes_padded, lower_hex, upper_hex};
pub use hash::{keepassrpc_record_tag, sha1, sha256};
pub use rng::random_bytes;
