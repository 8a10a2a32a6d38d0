//! Error taxonomy for the KeePassRPC client core.
//!
//! Every variant here corresponds to one row of the error table in the
//! specification: each carries enough context to produce a useful message
//! without leaking secret material (passcodes, session keys, premaster
//! secrets never appear in a `Display` impl).

use thiserror::Error;

/// Errors produced by the KeePassRPC client core.
#[derive(Error, Debug)]
pub enum Error {
    /// WebSocket dial/read/write failure, or malformed outer JSON.
    #[error("transport error: {0}")]
    Transport(String),

    /// Unknown `protocol`, or mutually-exclusive fields both set/unset.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// `B mod N == 0`, or a malformed `B`/`s` value from the server.
    #[error("invalid SRP parameter: {0}")]
    SrpParameterInvalid(String),

    /// The server's evidence `M2` did not match ours - wrong passcode.
    #[error("SRP evidence mismatch (likely wrong passcode)")]
    SrpEvidenceMismatch,

    /// Challenge/response resumption failed. Recoverable: the orchestrator
    /// catches this, drops the cached session key, and falls back to SRP.
    #[error("session resumption rejected: {0}")]
    ResumeRejected(String),

    /// Bad padding, HMAC mismatch, or AES failure. The session is
    /// considered compromised or desynchronised and must be torn down.
    #[error("crypto failure: {0}")]
    CryptoFailure(String),

    /// The server returned an explicit `error` frame for a JSON-RPC call.
    #[error("server error {code}: {}", .message_params.join(", "))]
    ServerError {
        code: String,
        message_params: Vec<String>,
    },

    /// The credential store (secret-store half) is missing or locked.
    /// `Open` still succeeds; it just forces a fresh SRP every time and
    /// does not persist the new session key.
    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),

    /// A handshake operation was attempted before its prerequisites were
    /// satisfied (e.g. computing evidence before the server's `B`/`s` or
    /// the passcode were set).
    #[error("precondition not met: {0}")]
    PreconditionNotMet(String),

    /// JSON (de)serialization failure outside of the frame protocol itself.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for KeePassRPC client operations.
pub type Result<T> = std::result::Result<T, Error>;
