//! Session orchestrator (C6): owns the handshake (resume-then-SRP-fallback)
//! and the strictly sequential call loop over a [`FrameStream`].
//!
//! `FrameStream` abstracts the wire transport so the handshake/call logic
//! can be exercised against an in-memory duplex in tests
//! ([`crate::testing::DuplexFrameStream`]) and a real WebSocket in
//! production.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, instrument, warn, Span};
use uuid::Uuid;

use crate::challenge::ChallengeResponse;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame::{Frame, FrameKind, KeyPayload, SecurityLevel, SrpPayload};
use crate::prompt::PasscodePrompt;
use crate::session_key::SessionKey;
use crate::srp::SrpClient;
use crate::store::CredentialStore;
use crate::transport::{self, JsonRpcRequest};

/// Abstracts "send one text frame, receive one text frame" over whatever
/// the underlying transport is. Implementations are not expected to
/// buffer or reorder: the session drives strictly one outstanding
/// request/response at a time.
#[async_trait]
pub trait FrameStream: Send {
    async fn send_frame(&mut self, frame: Frame) -> Result<()>;
    async fn recv_frame(&mut self) -> Result<Frame>;
    async fn close(&mut self, reason: &str) -> Result<()>;
}

/// A [`FrameStream`] backed by a live `ws://` connection.
pub struct WebSocketStream {
    inner: tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
}

impl WebSocketStream {
    pub async fn connect(url: &url::Url) -> Result<Self> {
        let (inner, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| Error::Transport(format!("websocket connect failed: {e}")))?;
        Ok(Self { inner })
    }
}

#[async_trait]
impl FrameStream for WebSocketStream {
    async fn send_frame(&mut self, frame: Frame) -> Result<()> {
        let text = frame.to_json()?;
        self.inner
            .send(Message::Text(text))
            .await
            .map_err(|e| Error::Transport(format!("websocket send failed: {e}")))
    }

    async fn recv_frame(&mut self) -> Result<Frame> {
        loop {
            let message = self
                .inner
                .next()
                .await
                .ok_or_else(|| Error::Transport("websocket closed by peer".into()))?
                .map_err(|e| Error::Transport(format!("websocket recv failed: {e}")))?;
            match message {
                Message::Text(text) => return Frame::from_json(&text),
                Message::Close(_) => return Err(Error::Transport("websocket closed by peer".into())),
                Message::Ping(_) | Message::Pong(_) => continue,
                other => return Err(Error::Transport(format!("unexpected websocket message: {other:?}"))),
            }
        }
    }

    async fn close(&mut self, reason: &str) -> Result<()> {
        use tokio_tungstenite::tungstenite::protocol::{frame::coding::CloseCode, CloseFrame};
        let _ = self
            .inner
            .close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: reason.to_owned().into(),
            }))
            .await;
        Ok(())
    }
}

/// An authenticated connection to a KeePassRPC server. Calls take `&mut
/// self`: the server speaks one JSON-RPC exchange at a time, so `Session`
/// is deliberately `!Sync`-shaped (there is nothing useful to share
/// between threads beyond the `Arc`-wrapped store/prompt handed in at
/// construction).
pub struct Session<S: FrameStream> {
    stream: S,
    session_key: SessionKey,
    next_call_id: u64,
    span: Span,
}

impl<S: FrameStream> Session<S> {
    /// Run the handshake over an already-connected stream and identity,
    /// using `store` to load/persist the cached session key and `prompt`
    /// to ask for the passcode when SRP is required.
    #[instrument(skip_all, fields(app_id = %config.app_id))]
    pub async fn open_with_stream(
        mut stream: S,
        config: &Config,
        store: &dyn CredentialStore,
        prompt: &dyn PasscodePrompt,
    ) -> Result<Self> {
        let identity = match store.load_identity(&config.app_id).await? {
            Some(identity) => identity,
            None => Uuid::new_v4().to_string(),
        };

        if let Some(cached_key) = store.load_session_key(&config.app_id, &identity).await? {
            match Self::try_resume(&mut stream, config, &identity, &cached_key).await {
                Ok(()) => {
                    info!("resumed session via cached key");
                    return Ok(Self {
                        stream,
                        session_key: cached_key,
                        next_call_id: 1,
                        span: Span::current(),
                    });
                }
                Err(Error::ResumeRejected(reason)) => {
                    warn!(%reason, "session resumption rejected, clearing cached key and falling back to SRP");
                    store.clear_session_key(&config.app_id, &identity).await?;
                }
                Err(other) => return Err(other),
            }
        }

        let session_key = Self::run_srp(&mut stream, config, &identity, prompt).await?;
        store.save_identity(&config.app_id, &identity).await?;
        store.save_session_key(&config.app_id, &identity, &session_key).await?;
        info!("established new session via SRP");

        Ok(Self {
            stream,
            session_key,
            next_call_id: 1,
            span: Span::current(),
        })
    }

    /// Connect a real WebSocket to `config.server_url` and run
    /// [`Self::open_with_stream`] over it.
    pub async fn open(config: &Config, store: &dyn CredentialStore, prompt: &dyn PasscodePrompt) -> Result<Session<WebSocketStream>> {
        let stream = WebSocketStream::connect(&config.server_url).await?;
        Session::open_with_stream(stream, config, store, prompt).await
    }

    async fn try_resume(stream: &mut S, config: &Config, identity: &str, cached_key: &SessionKey) -> Result<()> {
        let cr = ChallengeResponse::new();
        let init = KeyPayload {
            security_level: SecurityLevel::Medium,
            username: Some(identity.to_owned()),
            sc: None,
            cc: None,
            sr: None,
            cr: None,
        };
        stream
            .send_frame(Frame::client_init_key(
                &config.client_type_id,
                &config.client_display_name,
                &config.client_display_description,
                init,
            ))
            .await?;

        let reply = stream.recv_frame().await?;
        let server_challenge = match reply.classify()? {
            FrameKind::Key(key) => key
                .sc
                .clone()
                .ok_or_else(|| Error::ProtocolViolation("key payload missing sc".into()))?,
            FrameKind::Error(error) => {
                return Err(Error::ServerError {
                    code: error.code.clone(),
                    message_params: error.message_params.clone(),
                })
            }
            _ => return Err(Error::ProtocolViolation("expected key payload during resumption".into())),
        };

        let response = cr.respond(cached_key, &server_challenge);
        stream
            .send_frame(Frame::setup_key(KeyPayload {
                security_level: SecurityLevel::Medium,
                username: None,
                sc: None,
                cc: Some(cr.client_challenge().to_owned()),
                sr: None,
                cr: Some(response),
            }))
            .await?;

        let reply = stream.recv_frame().await?;
        match reply.classify()? {
            FrameKind::Key(key) => {
                let server_response = key
                    .sr
                    .clone()
                    .ok_or_else(|| Error::ProtocolViolation("key payload missing sr".into()))?;
                cr.verify_server_response(cached_key, &server_challenge, &server_response)
            }
            FrameKind::Error(error) => Err(Error::ResumeRejected(format!(
                "{}: {}",
                error.code,
                error.message_params.join(", ")
            ))),
            _ => Err(Error::ProtocolViolation("expected key payload during resumption".into())),
        }
    }

    async fn run_srp(stream: &mut S, config: &Config, identity: &str, prompt: &dyn PasscodePrompt) -> Result<SessionKey> {
        let mut client = SrpClient::new(identity.to_owned());

        stream
            .send_frame(Frame::client_init_srp(
                &config.client_type_id,
                &config.client_display_name,
                &config.client_display_description,
                SrpPayload {
                    stage: "identifyToServer".into(),
                    security_level: SecurityLevel::Medium,
                    identity: Some(client.identity().to_owned()),
                    public_ephemeral: Some(client.public_ephemeral_hex()),
                    server_public_ephemeral: None,
                    evidence: None,
                    server_evidence: None,
                    salt: None,
                },
            ))
            .await?;

        let reply = stream.recv_frame().await?;
        let (server_pub, salt) = match reply.classify()? {
            FrameKind::Srp(srp) => {
                let server_pub = srp
                    .server_public_ephemeral
                    .clone()
                    .ok_or_else(|| Error::ProtocolViolation("srp payload missing B".into()))?;
                let salt = srp
                    .salt
                    .clone()
                    .ok_or_else(|| Error::ProtocolViolation("srp payload missing salt".into()))?;
                (server_pub, salt)
            }
            FrameKind::Error(error) => {
                return Err(Error::ServerError {
                    code: error.code.clone(),
                    message_params: error.message_params.clone(),
                })
            }
            _ => return Err(Error::ProtocolViolation("expected srp payload".into())),
        };

        client.set_server(&server_pub, &salt)?;
        let passcode = prompt.get_passcode().await?;
        client.set_password(secrecy::ExposeSecret::expose_secret(&passcode).to_owned());
        let evidence = client.evidence_hex()?;

        stream
            .send_frame(Frame::setup_srp(SrpPayload {
                stage: "proofToServer".into(),
                security_level: SecurityLevel::Medium,
                identity: None,
                public_ephemeral: None,
                server_public_ephemeral: None,
                evidence: Some(evidence),
                server_evidence: None,
                salt: None,
            }))
            .await?;

        let reply = stream.recv_frame().await?;
        match reply.classify()? {
            FrameKind::Srp(srp) => {
                let server_evidence = srp
                    .server_evidence
                    .clone()
                    .ok_or_else(|| Error::ProtocolViolation("srp payload missing M2".into()))?;
                client.verify_server_evidence(&server_evidence)
            }
            FrameKind::Error(_) => Err(Error::SrpEvidenceMismatch),
            _ => Err(Error::ProtocolViolation("expected srp payload".into())),
        }
    }

    /// Issue one JSON-RPC call and await its response. Calls are
    /// sequential by construction: this takes `&mut self`, so two
    /// concurrent `call` futures on the same `Session` cannot exist.
    #[instrument(skip(self, params), fields(method = %method))]
    pub async fn call(&mut self, method: &str, params: Vec<Value>) -> Result<Value> {
        let id = self.next_call_id;
        self.next_call_id += 1;
        let request = JsonRpcRequest {
            method: method.to_owned(),
            params,
            id,
        };
        let payload = transport::encrypt_call(&self.session_key, &request)?;
        self.stream.send_frame(Frame::jsonrpc(payload)).await?;

        let reply = self.stream.recv_frame().await?;
        let response = match reply.classify()? {
            FrameKind::Jsonrpc(payload) => transport::decrypt_response(&self.session_key, payload)?,
            FrameKind::Error(error) => {
                return Err(Error::ServerError {
                    code: error.code.clone(),
                    message_params: error.message_params.clone(),
                })
            }
            _ => return Err(Error::ProtocolViolation("expected jsonrpc payload".into())),
        };

        if response.id != id {
            return Err(Error::ProtocolViolation(format!(
                "response id {} did not match request id {id}",
                response.id
            )));
        }
        if let Some(error) = response.error {
            return Err(Error::ServerError {
                code: "JSONRPC_ERROR".into(),
                message_params: vec![error.to_string()],
            });
        }
        debug!("call completed");
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Close the underlying connection with WebSocket close code 1000.
    pub async fn close(mut self) -> Result<()> {
        self.stream.close("goodbye").await
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

/// Default handshake timeout (spec §4.6 does not mandate a value; this
/// mirrors the connect timeout used elsewhere in the client).
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
