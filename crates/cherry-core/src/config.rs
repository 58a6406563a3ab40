//! Configuration types for the Cherry Servers provider
//!
//! This module defines the runtime configuration handed to client factories
//! and the poller settings used by controllers that wait on the remote API.

use crate::error::{Error, Result};
use crate::poll::{JitterInterval, Poller};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable that overrides the configured API token
pub const TOKEN_ENV_VAR: &str = "CHERRY_AUTH_TOKEN";

/// Provider configuration
///
/// Consumed by client factories only. Controllers never read the token.
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Cherry Servers API token
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub token: String,

    /// Poller settings
    #[serde(default)]
    pub poller: PollerConfig,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("token", &"<REDACTED>")
            .field("poller", &self.poller)
            .finish()
    }
}

impl ProviderConfig {
    /// Create a configuration with the given token
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            poller: PollerConfig::default(),
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Apply the `CHERRY_AUTH_TOKEN` override, if set
    pub fn with_env_override(self) -> Self {
        self.with_token_override(std::env::var(TOKEN_ENV_VAR).ok())
    }

    /// Replace the token when an override is present
    pub fn with_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token {
            self.token = token;
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.token.is_empty() {
            return Err(Error::config(format!(
                "API token is empty; set it in the config file or via {}",
                TOKEN_ENV_VAR
            )));
        }

        self.poller.validate()?;

        Ok(())
    }
}

/// Poller settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Constant delay between attempts (in seconds)
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,

    /// Lower bound of the random jitter (in milliseconds, inclusive)
    #[serde(default = "default_jitter_min_ms")]
    pub jitter_min_ms: i64,

    /// Upper bound of the random jitter (in milliseconds, exclusive)
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: i64,
}

impl PollerConfig {
    /// Validate the jitter interval
    pub fn validate(&self) -> Result<()> {
        JitterInterval::from_millis(self.jitter_min_ms, self.jitter_max_ms).map(|_| ())
    }

    /// Build a poller from these settings
    pub fn build(&self) -> Result<Poller> {
        let jitter = JitterInterval::from_millis(self.jitter_min_ms, self.jitter_max_ms)?;
        Ok(Poller::new(Duration::from_secs(self.delay_secs), jitter))
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_delay_secs(),
            jitter_min_ms: default_jitter_min_ms(),
            jitter_max_ms: default_jitter_max_ms(),
        }
    }
}

fn default_delay_secs() -> u64 {
    10
}

fn default_jitter_min_ms() -> i64 {
    1_000
}

fn default_jitter_max_ms() -> i64 {
    2_000
}
