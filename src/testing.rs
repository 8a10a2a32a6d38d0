//! Test tooling (C12): fakes for the three seams a `Session` is built
//! from, so handshake and call-loop logic can be exercised without a
//! real server or OS keychain.
//!
//! Gated behind `cfg(test)` or the `test-util` feature so downstream
//! crates can reuse these fakes in their own integration tests without
//! pulling keyring/terminal dependencies.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::prompt::PasscodePrompt;
use crate::session::FrameStream;
use crate::session_key::SessionKey;
use crate::store::CredentialStore;

/// In-memory [`CredentialStore`], keyed by `(app_id, identity)`.
#[derive(Default)]
pub struct MemoryStore {
    identities: Mutex<HashMap<String, String>>,
    keys: Mutex<HashMap<(String, String), SessionKey>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn load_identity(&self, app_id: &str) -> Result<Option<String>> {
        Ok(self.identities.lock().unwrap().get(app_id).cloned())
    }

    async fn save_identity(&self, app_id: &str, identity: &str) -> Result<()> {
        self.identities.lock().unwrap().insert(app_id.to_owned(), identity.to_owned());
        Ok(())
    }

    async fn load_session_key(&self, app_id: &str, identity: &str) -> Result<Option<SessionKey>> {
        Ok(self
            .keys
            .lock()
            .unwrap()
            .get(&(app_id.to_owned(), identity.to_owned()))
            .cloned())
    }

    async fn save_session_key(&self, app_id: &str, identity: &str, key: &SessionKey) -> Result<()> {
        self.keys
            .lock()
            .unwrap()
            .insert((app_id.to_owned(), identity.to_owned()), key.clone());
        Ok(())
    }

    async fn clear_session_key(&self, app_id: &str, identity: &str) -> Result<()> {
        self.keys.lock().unwrap().remove(&(app_id.to_owned(), identity.to_owned()));
        Ok(())
    }
}

/// [`PasscodePrompt`] that returns a fixed passcode, never touching a
/// terminal.
pub struct FixedPrompt {
    passcode: String,
}

impl FixedPrompt {
    pub fn new(passcode: impl Into<String>) -> Self {
        Self { passcode: passcode.into() }
    }
}

#[async_trait]
impl PasscodePrompt for FixedPrompt {
    async fn get_passcode(&self) -> Result<SecretString> {
        Ok(SecretString::new(self.passcode.clone()))
    }
}

/// A [`FrameStream`] backed by two in-process queues, letting a test
/// drive both sides of a handshake/call exchange without sockets.
///
/// `outbox` captures everything the client under test sends; `inbox` is
/// drained in order to answer `recv_frame`.
pub struct DuplexFrameStream {
    inbox: VecDeque<Frame>,
    pub outbox: Vec<Frame>,
}

impl DuplexFrameStream {
    pub fn new(scripted_replies: Vec<Frame>) -> Self {
        Self {
            inbox: scripted_replies.into(),
            outbox: Vec::new(),
        }
    }
}

#[async_trait]
impl FrameStream for DuplexFrameStream {
    async fn send_frame(&mut self, frame: Frame) -> Result<()> {
        self.outbox.push(frame);
        Ok(())
    }

    async fn recv_frame(&mut self) -> Result<Frame> {
        self.inbox
            .pop_front()
            .ok_or_else(|| Error::Transport("no more scripted frames".into()))
    }

    async fn close(&mut self, _reason: &str) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_key::SessionKey;

    #[tokio::test]
    async fn memory_store_round_trips_identity_and_key() {
        let store = MemoryStore::new();
        assert!(store.load_identity("app").await.unwrap().is_none());
        store.save_identity("app", "id-1").await.unwrap();
        assert_eq!(store.load_identity("app").await.unwrap().as_deref(), Some("id-1"));

        let key = SessionKey::from_minimal_bytes(vec![1, 2, 3]);
        store.save_session_key("app", "id-1", &key).await.unwrap();
        let loaded = store.load_session_key("app", "id-1").await.unwrap().unwrap();
        assert_eq!(loaded.minimal_bytes(), key.minimal_bytes());

        store.clear_session_key("app", "id-1").await.unwrap();
        assert!(store.load_session_key("app", "id-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fixed_prompt_returns_configured_passcode() {
        use secrecy::ExposeSecret;
        let prompt = FixedPrompt::new("hunter2");
        let passcode = prompt.get_passcode().await.unwrap();
        assert_eq!(passcode.expose_secret(), "hunter2");
    }

    #[tokio::test]
    async fn duplex_stream_drains_scripted_replies_in_order() {
        let reply = Frame::jsonrpc(crate::frame::JsonrpcPayload {
            message: vec![1],
            iv: vec![2],
            hmac: vec![3],
        });
        let mut stream = DuplexFrameStream::new(vec![reply]);
        stream
            .send_frame(Frame::jsonrpc(crate::frame::JsonrpcPayload {
                message: vec![],
                iv: vec![],
                hmac: vec![],
            }))
            .await
            .unwrap();
        assert_eq!(stream.outbox.len(), 1);
        let received = stream.recv_frame().await.unwrap();
        assert!(matches!(received.classify().unwrap(), crate::frame::FrameKind::Jsonrpc(_)));
        assert!(stream.recv_frame().await.is_err());
    }
}
