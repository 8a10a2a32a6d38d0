//! Frame codec (C4): the outer JSON envelope carried over one WebSocket
//! text frame, with its discriminated `protocol` sub-payloads.
//!
//! Field names are lowerCamelCase and several use unusual capitalisation
//! (`hTTPRealm`, `uRLs`, `clientTypeID`) that the peer is strict about -
//! this module only models the handful of fields the handshake and
//! transport layers actually touch (spec §1 scopes the full business
//! surface out), but keeps their exact casing.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use serde_with::{base64::Base64, serde_as};

use crate::error::{Error, Result};

/// `(major<<16)|(minor<<8)|patch`, packed per spec §4.4/§6.
pub const fn pack_version(major: u32, minor: u32, patch: u32) -> u32 {
    (major << 16) | (minor << 8) | patch
}

/// The version this client speaks: `1.7.0`.
pub const PROTOCOL_VERSION: u32 = pack_version(1, 7, 0);

/// KeePassRPC's security-level tag. This client hard-codes [`SecurityLevel::Medium`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize_repr, Serialize_repr)]
#[repr(u32)]
pub enum SecurityLevel {
    Low = 1,
    Medium = 2,
    High = 3,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Setup,
    Jsonrpc,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SrpPayload {
    pub stage: String,
    pub security_level: SecurityLevel,
    #[serde(rename = "I", skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(rename = "A", skip_serializing_if = "Option::is_none")]
    pub public_ephemeral: Option<String>,
    #[serde(rename = "B", skip_serializing_if = "Option::is_none")]
    pub server_public_ephemeral: Option<String>,
    #[serde(rename = "M", skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    #[serde(rename = "M2", skip_serializing_if = "Option::is_none")]
    pub server_evidence: Option<String>,
    #[serde(rename = "s", skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KeyPayload {
    pub security_level: SecurityLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cr: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonrpcPayload {
    #[serde_as(as = "Base64")]
    pub message: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub iv: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub hmac: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub code: String,
    pub message_params: Vec<String>,
}

/// The outer JSON envelope. Exactly one of `srp`/`key`/`jsonrpc`/`error`
/// is present on any non-handshake-initiator frame (see [`Frame::classify`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Frame {
    pub protocol: Protocol,
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srp: Option<SrpPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<KeyPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<JsonrpcPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
    #[serde(rename = "clientTypeID", skip_serializing_if = "Option::is_none")]
    pub client_type_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_display_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
}

impl Frame {
    fn bare(protocol: Protocol) -> Self {
        Self {
            protocol,
            version: PROTOCOL_VERSION,
            srp: None,
            key: None,
            jsonrpc: None,
            error: None,
            client_type_id: None,
            client_display_name: None,
            client_display_description: None,
            features: None,
        }
    }

    /// The first setup frame a client sends, carrying its identification
    /// alongside the initial SRP `identifyToServer` stage.
    pub fn client_init_srp(client_type_id: &str, display_name: &str, display_description: &str, srp: SrpPayload) -> Self {
        let mut frame = Self::bare(Protocol::Setup);
        frame.srp = Some(srp);
        frame.client_type_id = Some(client_type_id.to_owned());
        frame.client_display_name = Some(display_name.to_owned());
        frame.client_display_description = Some(display_description.to_owned());
        frame
    }

    /// The first setup frame for a challenge/response resumption attempt.
    pub fn client_init_key(client_type_id: &str, display_name: &str, display_description: &str, key: KeyPayload) -> Self {
        let mut frame = Self::bare(Protocol::Setup);
        frame.key = Some(key);
        frame.client_type_id = Some(client_type_id.to_owned());
        frame.client_display_name = Some(display_name.to_owned());
        frame.client_display_description = Some(display_description.to_owned());
        frame
    }

    /// A subsequent setup/srp frame (no client identification repeated).
    pub fn setup_srp(srp: SrpPayload) -> Self {
        let mut frame = Self::bare(Protocol::Setup);
        frame.srp = Some(srp);
        frame
    }

    /// A subsequent setup/key frame (no client identification repeated).
    pub fn setup_key(key: KeyPayload) -> Self {
        let mut frame = Self::bare(Protocol::Setup);
        frame.key = Some(key);
        frame
    }

    /// Wrap an encrypted JSON-RPC record for transmission.
    pub fn jsonrpc(payload: JsonrpcPayload) -> Self {
        let mut frame = Self::bare(Protocol::Jsonrpc);
        frame.jsonrpc = Some(payload);
        frame
    }

    /// Classify an inbound frame per the dispatch rules in spec §4.4,
    /// rejecting protocol violations (both/neither sub-payload set, or an
    /// unrecognised `protocol`).
    pub fn classify(&self) -> Result<FrameKind<'_>> {
        if let Some(error) = &self.error {
            return Ok(FrameKind::Error(error));
        }
        match self.protocol {
            Protocol::Setup => match (&self.srp, &self.key) {
                (Some(srp), None) => Ok(FrameKind::Srp(srp)),
                (None, Some(key)) => Ok(FrameKind::Key(key)),
                (Some(_), Some(_)) => Err(Error::ProtocolViolation(
                    "setup frame carries both srp and key payloads".into(),
                )),
                (None, None) => Err(Error::ProtocolViolation(
                    "setup frame carries neither srp nor key payload".into(),
                )),
            },
            Protocol::Jsonrpc => self
                .jsonrpc
                .as_ref()
                .map(FrameKind::Jsonrpc)
                .ok_or_else(|| Error::ProtocolViolation("jsonrpc frame missing jsonrpc payload".into())),
            Protocol::Error => Err(Error::ProtocolViolation(
                "error frame must set the error field".into(),
            )),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Transport(format!("malformed frame: {e}")))
    }
}

/// The result of [`Frame::classify`]: which sub-payload an inbound frame
/// carries.
#[derive(Debug)]
pub enum FrameKind<'a> {
    Srp(&'a SrpPayload),
    Key(&'a KeyPayload),
    Jsonrpc(&'a JsonrpcPayload),
    Error(&'a ErrorPayload),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_packing() {
        assert_eq!(pack_version(1, 2, 3), 66051);
        assert_eq!(PROTOCOL_VERSION, 67840);
    }

    #[test]
    fn setup_frame_with_both_srp_and_key_is_a_protocol_violation() {
        let mut frame = Frame::bare(Protocol::Setup);
        frame.srp = Some(SrpPayload {
            stage: "identifyToServer".into(),
            security_level: SecurityLevel::Medium,
            identity: None,
            public_ephemeral: None,
            server_public_ephemeral: None,
            evidence: None,
            server_evidence: None,
            salt: None,
        });
        frame.key = Some(KeyPayload {
            security_level: SecurityLevel::Medium,
            username: None,
            sc: None,
            cc: None,
            sr: None,
            cr: None,
        });
        assert!(matches!(frame.classify(), Err(Error::ProtocolViolation(_))));
    }

    #[test]
    fn setup_frame_with_neither_is_a_protocol_violation() {
        let frame = Frame::bare(Protocol::Setup);
        assert!(matches!(frame.classify(), Err(Error::ProtocolViolation(_))));
    }

    #[test]
    fn error_payload_takes_priority_regardless_of_protocol() {
        let mut frame = Frame::bare(Protocol::Jsonrpc);
        frame.error = Some(ErrorPayload {
            code: "AUTH_FAILED".into(),
            message_params: vec!["bad passcode".into()],
        });
        assert!(matches!(frame.classify(), Ok(FrameKind::Error(_))));
    }

    #[test]
    fn client_type_id_field_uses_exact_wire_casing() {
        let frame = Frame::client_init_srp(
            "rskp",
            "keepassrpc-rs",
            "",
            SrpPayload {
                stage: "identifyToServer".into(),
                security_level: SecurityLevel::Medium,
                identity: Some("I".into()),
                public_ephemeral: Some("A".into()),
                server_public_ephemeral: None,
                evidence: None,
                server_evidence: None,
                salt: None,
            },
        );
        let json = frame.to_json().unwrap();
        assert!(json.contains("\"clientTypeID\":\"rskp\""));
    }
}
