//! Configuration (C11): connection and identity parameters, overridable
//! via `KEEPASSRPC_*` environment variables.

use std::path::PathBuf;

use url::Url;

use crate::error::{Error, Result};

const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:12546/";

/// Everything a [`crate::session::Session`] needs to open a connection,
/// besides the store and prompt it is handed separately.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_url: Url,
    pub app_id: String,
    pub client_type_id: String,
    pub client_display_name: String,
    pub client_display_description: String,
    pub config_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: Url::parse(DEFAULT_SERVER_URL).expect("default server url is valid"),
            app_id: "keepassrpc".to_owned(),
            client_type_id: "keepassrpc-rs".to_owned(),
            client_display_name: "keepassrpc-rs".to_owned(),
            client_display_description: String::new(),
            config_root: None,
        }
    }
}

impl Config {
    /// Start from [`Self::default`] and apply any `KEEPASSRPC_*`
    /// environment variables that are set:
    ///
    /// - `KEEPASSRPC_SERVER_URL`
    /// - `KEEPASSRPC_APP_ID`
    /// - `KEEPASSRPC_CONFIG_ROOT`
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("KEEPASSRPC_SERVER_URL") {
            config.server_url = Url::parse(&url).map_err(|e| Error::ProtocolViolation(format!("KEEPASSRPC_SERVER_URL: {e}")))?;
        }
        if let Ok(app_id) = std::env::var("KEEPASSRPC_APP_ID") {
            config.app_id = app_id;
        }
        if let Ok(root) = std::env::var("KEEPASSRPC_CONFIG_ROOT") {
            config.config_root = Some(PathBuf::from(root));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_server_url_is_localhost() {
        let config = Config::default();
        assert_eq!(config.server_url.as_str(), DEFAULT_SERVER_URL);
        assert_eq!(config.server_url.port(), Some(12546));
    }

    #[test]
    fn from_env_without_overrides_matches_default() {
        std::env::remove_var("KEEPASSRPC_SERVER_URL");
        std::env::remove_var("KEEPASSRPC_APP_ID");
        std::env::remove_var("KEEPASSRPC_CONFIG_ROOT");
        let config = Config::from_env().unwrap();
        assert_eq!(config.server_url, Config::default().server_url);
        assert_eq!(config.app_id, Config::default().app_id);
    }
}
