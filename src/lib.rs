//! Client library for the KeePassRPC plug-in protocol: SRP-6a
//! authentication, AES-128-CBC encrypted JSON-RPC transport, and
//! challenge/response session resumption, spoken over a localhost
//! WebSocket.
//!
//! ```ignore
//! use keepassrpc::{config::Config, session::Session, store::FileKeyringStore, prompt::TerminalPrompt};
//!
//! # async fn run() -> keepassrpc::error::Result<()> {
//! let config = Config::from_env()?;
//! let store = FileKeyringStore::from_platform_dirs()?;
//! let prompt = TerminalPrompt::new();
//! let mut session = Session::open(&config, &store, &prompt).await?;
//! let groups = session.call("GetAllDataases", vec![]).await?;
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod challenge;
pub mod config;
pub mod crypto;
pub mod error;
pub mod frame;
pub mod prompt;
pub mod session;
pub mod session_key;
pub mod srp;
pub mod store;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::Config;
pub use error::{Error, Result};
pub use session::Session;
pub use session_key::SessionKey;
