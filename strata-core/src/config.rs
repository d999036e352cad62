//! Runtime Configuration
//!
//! Settings that bound the resources a running server holds: how long an idle
//! session keeps its hook slots, how many render generations of event
//! handlers survive, and the transport limits.
//!
//! Configuration is plain JSON. Every field has a default, so an empty object
//! is a valid configuration:
//!
//! ```json
//! {
//!     "bind_addr": "127.0.0.1:8765",
//!     "session_ttl_secs": 1800,
//!     "sweep_interval_secs": 60,
//!     "handler_generations": 2,
//!     "max_frame_bytes": 1048576
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Configuration for the session runtime and the WebSocket transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the WebSocket server listens on.
    pub bind_addr: String,

    /// Idle time after which a session's hook slots and tree are released.
    ///
    /// `None` keeps sessions until the client disconnects.
    pub session_ttl_secs: Option<u64>,

    /// How often the idle-session sweeper runs.
    pub sweep_interval_secs: u64,

    /// Number of render generations whose handlers stay resolvable.
    ///
    /// `1` keeps only the handlers registered by the latest render.
    pub handler_generations: u64,

    /// Largest inbound frame accepted by the transport.
    pub max_frame_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8765".to_string(),
            session_ttl_secs: Some(30 * 60),
            sweep_interval_secs: 60,
            handler_generations: 2,
            max_frame_bytes: 1024 * 1024,
        }
    }
}

impl Config {
    /// Parse a configuration from a JSON string and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid configuration JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.handler_generations == 0 {
            return Err(Error::Config(
                "handler_generations must be at least 1".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::Config(
                "sweep_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.session_ttl_secs == Some(0) {
            return Err(Error::Config(
                "session_ttl_secs must be positive; use null to disable expiry".to_string(),
            ));
        }
        if self.max_frame_bytes == 0 {
            return Err(Error::Config("max_frame_bytes must be positive".to_string()));
        }
        Ok(())
    }

    pub fn session_ttl(&self) -> Option<Duration> {
        self.session_ttl_secs.map(Duration::from_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let config = Config::from_json_str("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn null_ttl_disables_expiry() {
        let config = Config::from_json_str(r#"{"session_ttl_secs": null}"#).unwrap();
        assert_eq!(config.session_ttl(), None);
    }

    #[test]
    fn rejects_zero_generations() {
        let err = Config::from_json_str(r#"{"handler_generations": 0}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = Config::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = Config::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
