//! Encrypted JSON-RPC transport (C5): wraps JSON-RPC 1.0 request/response
//! bodies in the AES-128-CBC envelope described in spec §4.5, carried as
//! the `jsonrpc` sub-payload of a [`Frame`].
//!
//! Calls are strictly sequential: a [`CallId`] is only ever used by one
//! in-flight request at a time, and the transport does not attempt to
//! pipeline or demultiplex concurrent calls (see [`crate::session`]).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::{self, keepassrpc_record_tag};
use crate::error::{Error, Result};
use crate::frame::JsonrpcPayload;
use crate::session_key::SessionKey;

/// JSON-RPC 1.0 request. `id` is a monotonically increasing integer
/// starting at 1 for the lifetime of a [`crate::session::Session`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub method: String,
    pub params: Vec<Value>,
    pub id: u64,
}

/// JSON-RPC 1.0 response. Exactly one of `result`/`error` is set, per the
/// 1.0 convention (the other is JSON `null`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub result: Option<Value>,
    pub error: Option<Value>,
    pub id: u64,
}

/// Encrypt a JSON-RPC request into the `jsonrpc` frame sub-payload.
///
/// `message = AES128-CBC(key, iv, pad(json(request)))`, `hmac` is the
/// nested-SHA1 record tag over `key || message || iv` (see
/// [`crate::crypto::hash::keepassrpc_record_tag`]; despite the name it is
/// not RFC 2104 HMAC).
pub fn encrypt_call(session_key: &SessionKey, request: &JsonRpcRequest) -> Result<JsonrpcPayload> {
    let plaintext = serde_json::to_vec(request)?;
    let iv = crypto::random_bytes(16);
    let iv_arr: [u8; 16] = iv.clone().try_into().expect("random_bytes(16) returns 16 bytes");
    let aes_key = session_key.aes_key();
    let message = crypto::encrypt(&aes_key, &iv_arr, &plaintext);
    let hmac = keepassrpc_record_tag(session_key.minimal_bytes(), &message, &iv).to_vec();
    Ok(JsonrpcPayload { message, iv, hmac })
}

/// Decrypt and authenticate an inbound `jsonrpc` payload, returning the
/// parsed response.
///
/// The record tag is checked before decryption: a mismatch means either
/// corruption or a desynchronised session and is reported as
/// [`Error::CryptoFailure`], not silently decrypted.
pub fn decrypt_response(session_key: &SessionKey, payload: &JsonrpcPayload) -> Result<JsonRpcResponse> {
    let expected_hmac = keepassrpc_record_tag(session_key.minimal_bytes(), &payload.message, &payload.iv);
    if !crypto::hash::constant_time_eq(&expected_hmac, &payload.hmac) {
        return Err(Error::CryptoFailure("record tag mismatch on inbound jsonrpc payload".into()));
    }
    let iv_arr: [u8; 16] = payload
        .iv
        .clone()
        .try_into()
        .map_err(|_| Error::CryptoFailure("iv is not 16 bytes".into()))?;
    let aes_key = session_key.aes_key();
    let plaintext = crypto::decrypt(&aes_key, &iv_arr, &payload.message)?;
    serde_json::from_slice(&plaintext).map_err(Into::into)
}

/// Encrypt a raw JSON-RPC request body, for callers (tests, the `call`
/// body builder) that already have serialized JSON rather than a typed
/// [`JsonRpcRequest`].
pub fn encrypt_value(session_key: &SessionKey, value: &Value) -> Result<JsonrpcPayload> {
    let plaintext = serde_json::to_vec(value)?;
    let iv = crypto::random_bytes(16);
    let iv_arr: [u8; 16] = iv.clone().try_into().expect("random_bytes(16) returns 16 bytes");
    let aes_key = session_key.aes_key();
    let message = crypto::encrypt(&aes_key, &iv_arr, &plaintext);
    let hmac = keepassrpc_record_tag(session_key.minimal_bytes(), &message, &iv).to_vec();
    Ok(JsonrpcPayload { message, iv, hmac })
}
