//! CLI configuration.

use anyhow::{bail, Context, Result};
use mediavc_core::DEFAULT_CHUNK_SIZE;
use mediavc_relay::RelayConfig;
use std::path::PathBuf;
use std::time::Duration;

/// CLI configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// `SQLite` database holding blocks and refs
    pub db_path: PathBuf,

    /// Chunk size for large values, in bytes
    pub chunk_size: usize,

    /// Relay connection
    pub relay: RelayConfig,

    /// Encoded Ed25519 seed used to sign commits
    pub signing_key: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./mediavc.db"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            relay: RelayConfig::default(),
            signing_key: None,
        }
    }
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `MEDIAVC_DB_PATH`: `SQLite` database path
    /// - `MEDIAVC_CHUNK_SIZE`: chunk size in bytes
    /// - `MEDIAVC_RELAY_URL`: relay base URL
    /// - `MEDIAVC_RELAY_TIMEOUT_SECS`: relay request timeout
    /// - `MEDIAVC_BEARER_TOKEN`: relay bearer token
    /// - `MEDIAVC_SIGNING_KEY`: signing seed from `mediavc keygen`
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(db_path) = lookup("MEDIAVC_DB_PATH") {
            config.db_path = PathBuf::from(db_path);
        }

        if let Some(size) = lookup("MEDIAVC_CHUNK_SIZE") {
            config.chunk_size = size.parse().context("Invalid MEDIAVC_CHUNK_SIZE")?;
            if config.chunk_size == 0 {
                bail!("MEDIAVC_CHUNK_SIZE must be positive");
            }
        }

        if let Some(url) = lookup("MEDIAVC_RELAY_URL") {
            config.relay.base_url = url;
        }

        if let Some(secs) = lookup("MEDIAVC_RELAY_TIMEOUT_SECS") {
            let secs = secs.parse().context("Invalid MEDIAVC_RELAY_TIMEOUT_SECS")?;
            config.relay.timeout = Duration::from_secs(secs);
        }

        if let Some(token) = lookup("MEDIAVC_BEARER_TOKEN") {
            config.relay.bearer_token = Some(token);
        }

        config.signing_key = lookup("MEDIAVC_SIGNING_KEY");

        Ok(config)
    }
}
