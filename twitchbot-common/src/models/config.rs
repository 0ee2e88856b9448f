//! twitchbot-common/src/models/config.rs

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Error;

pub const DEFAULT_HOST: &str = "irc.chat.twitch.tv";
pub const DEFAULT_PORT: u16 = 6697;

/// Bot configuration, loaded from a JSON file at startup.
#[derive(Clone, Deserialize)]
pub struct Config {
    pub username: String,
    pub channel: String,
    pub oauth_token: String,
    pub client_id: String,

    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the SQLite file used by handlers that keep state.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Directory for the date-partitioned session log.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_path() -> String {
    "db.db".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

impl Config {
    pub fn from_json(s: &str) -> Result<Self, Error> {
        let config: Config = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&data)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.username.is_empty() {
            return Err(Error::Config("username must not be empty".into()));
        }
        if self.channel.is_empty() {
            return Err(Error::Config("channel must not be empty".into()));
        }
        if self.channel.starts_with('#') {
            return Err(Error::Config("channel must be given without the leading '#'".into()));
        }
        Ok(())
    }

    /// The part of `oauth_token` after the `oauth:` style prefix, used as a
    /// bearer token for HTTP calls.
    pub fn oauth_token_token(&self) -> Result<&str, Error> {
        self.oauth_token
            .split_once(':')
            .map(|(_, token)| token)
            .ok_or_else(|| Error::Config("oauth_token must look like 'oauth:<token>'".into()))
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("channel", &self.channel)
            .field("oauth_token", &"***")
            .field("client_id", &"***")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db_path", &self.db_path)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "username": "botname",
        "channel": "somechannel",
        "oauth_token": "oauth:abc123",
        "client_id": "clientid"
    }"#;

    #[test]
    fn defaults_are_filled_in() {
        let config = Config::from_json(MINIMAL).unwrap();
        assert_eq!(config.host, "irc.chat.twitch.tv");
        assert_eq!(config.port, 6697);
        assert_eq!(config.db_path, "db.db");
        assert_eq!(config.log_dir, PathBuf::from("logs"));
    }

    #[test]
    fn bearer_token_is_after_the_colon() {
        let config = Config::from_json(MINIMAL).unwrap();
        assert_eq!(config.oauth_token_token().unwrap(), "abc123");

        let mut bad = config.clone();
        bad.oauth_token = "abc123".into();
        assert!(bad.oauth_token_token().is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = Config::from_json(MINIMAL).unwrap();
        let dbg = format!("{:?}", config);
        assert!(!dbg.contains("abc123"));
        assert!(!dbg.contains("clientid"));
        assert!(dbg.contains("somechannel"));
    }

    #[test]
    fn rejects_hash_prefixed_channel() {
        let json = MINIMAL.replace("somechannel", "#somechannel");
        assert!(matches!(Config::from_json(&json), Err(Error::Config(_))));
    }
}
