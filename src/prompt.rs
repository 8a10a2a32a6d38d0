//! Passcode prompt capability (C8): how the client asks the user for
//! their master passcode when a full SRP handshake is required.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::{Error, Result};

/// Abstracts asking the user for their passcode, so the handshake can be
/// driven by a scripted fake in tests.
#[async_trait]
pub trait PasscodePrompt: Send + Sync {
    async fn get_passcode(&self) -> Result<SecretString>;
}

/// Default [`PasscodePrompt`]: reads from the terminal with echo
/// disabled via `rpassword`.
pub struct TerminalPrompt {
    message: String,
}

impl TerminalPrompt {
    pub fn new() -> Self {
        Self {
            message: "KeePassRPC passcode: ".to_owned(),
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl Default for TerminalPrompt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PasscodePrompt for TerminalPrompt {
    async fn get_passcode(&self) -> Result<SecretString> {
        let message = self.message.clone();
        tokio::task::spawn_blocking(move || rpassword::prompt_password(message))
            .await
            .map_err(|e| Error::CryptoFailure(format!("prompt task panicked: {e}")))?
            .map(SecretString::new)
            .map_err(|e| Error::StoreUnavailable(format!("reading passcode: {e}")))
    }
}
