//! Credential store (C7): the split between a plain-text identity file
//! and an OS-backed secret store for the session key.
//!
//! Grounded on the storage abstraction real KeePassRPC clients use to
//! separate "who am I" (safe to keep in a dotfile) from "what can I
//! authenticate with" (must go through the platform keychain).

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::session_key::SessionKey;

/// Persists the client's identity (a UUID) and cached session key across
/// process restarts. Implementations must not ever return the session
/// key's bytes through any channel other than [`Self::load_session_key`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load_identity(&self, app_id: &str) -> Result<Option<String>>;
    async fn save_identity(&self, app_id: &str, identity: &str) -> Result<()>;
    async fn load_session_key(&self, app_id: &str, identity: &str) -> Result<Option<SessionKey>>;
    async fn save_session_key(&self, app_id: &str, identity: &str, key: &SessionKey) -> Result<()>;
    async fn clear_session_key(&self, app_id: &str, identity: &str) -> Result<()>;
}

#[derive(serde::Serialize, serde::Deserialize, Default)]
struct Settings {
    username: Option<String>,
}

/// Default [`CredentialStore`]: identity lives in
/// `{config_root}/{app_id}/settings.json`, the session key in the OS
/// keychain via the `keyring` crate, service-scoped by `app_id`/`identity`.
pub struct FileKeyringStore {
    config_root: PathBuf,
}

impl FileKeyringStore {
    pub fn new(config_root: PathBuf) -> Self {
        Self { config_root }
    }

    /// Use the platform config directory (`~/.config/keepassrpc` on
    /// Linux, the equivalent on macOS/Windows) via the `directories` crate.
    pub fn from_platform_dirs() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "keepassrpc")
            .ok_or_else(|| Error::StoreUnavailable("no home directory for this user".into()))?;
        Ok(Self::new(dirs.config_dir().to_path_buf()))
    }

    /// Use `config.config_root` if set, otherwise fall back to the
    /// platform config directory.
    pub fn from_config(config: &crate::config::Config) -> Result<Self> {
        match &config.config_root {
            Some(root) => Ok(Self::new(root.clone())),
            None => Self::from_platform_dirs(),
        }
    }

    fn settings_path(&self, app_id: &str) -> PathBuf {
        self.config_root.join(app_id).join("settings.json")
    }

    fn keyring_entry(&self, app_id: &str, identity: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&format!("keepassrpc:{app_id}"), identity)
            .map_err(|e| Error::StoreUnavailable(format!("keyring entry: {e}")))
    }

    fn read_settings(&self, app_id: &str) -> Result<Settings> {
        let path = self.settings_path(app_id);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(Error::StoreUnavailable(format!("reading {}: {e}", path.display()))),
        }
    }

    fn write_settings(&self, app_id: &str, settings: &Settings) -> Result<()> {
        let path = self.settings_path(app_id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::StoreUnavailable(format!("creating {}: {e}", parent.display())))?;
        }
        let contents = serde_json::to_string_pretty(settings)?;
        std::fs::write(&path, contents).map_err(|e| Error::StoreUnavailable(format!("writing {}: {e}", path.display())))
    }
}

#[async_trait]
impl CredentialStore for FileKeyringStore {
    async fn load_identity(&self, app_id: &str) -> Result<Option<String>> {
        Ok(self.read_settings(app_id)?.username)
    }

    async fn save_identity(&self, app_id: &str, identity: &str) -> Result<()> {
        let mut settings = self.read_settings(app_id)?;
        settings.username = Some(identity.to_owned());
        self.write_settings(app_id, &settings)
    }

    async fn load_session_key(&self, app_id: &str, identity: &str) -> Result<Option<SessionKey>> {
        match self.keyring_entry(app_id, identity)?.get_password() {
            Ok(hex) => Ok(Some(SessionKey::from_hex(&hex)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::StoreUnavailable(format!("keyring read: {e}"))),
        }
    }

    async fn save_session_key(&self, app_id: &str, identity: &str, key: &SessionKey) -> Result<()> {
        self.keyring_entry(app_id, identity)?
            .set_password(&key.lower_hex())
            .map_err(|e| Error::StoreUnavailable(format!("keyring write: {e}")))
    }

    async fn clear_session_key(&self, app_id: &str, identity: &str) -> Result<()> {
        match self.keyring_entry(app_id, identity)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::StoreUnavailable(format!("keyring delete: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_round_trip_through_json() {
        let settings = Settings {
            username: Some("abc-123".into()),
        };
        let json = serde_json::to_string(&settings).unwrap();
        let parsed: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.username, settings.username);
    }
}
