//! Session and server settings.
//!
//! Both structs deserialize from JSON with every field optional; durations
//! are given in milliseconds.
//!
//! ```
//! use std::time::Duration;
//! use netconf_emu::ServerConfig;
//!
//! let config = ServerConfig::from_json(r#"{ "store_messages": true, "grace_period_ms": 500 }"#).unwrap();
//! assert!(config.store_messages);
//! assert_eq!(config.session.grace_period, Duration::from_millis(500));
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::protocol::DEFAULT_MAX_FRAME_SIZE;

/// Default time the processing task gets to finish after a stop request.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Per-session runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Bounded wait for the processing task before it is aborted.
    #[serde(rename = "grace_period_ms", with = "millis")]
    pub grace_period: Duration,
    /// Largest message accepted without a delimiter.
    pub max_frame_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// Host-wide settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Record every received message.
    pub store_messages: bool,
    /// File served to `get-config`; the built-in router config when unset.
    pub config_file: Option<PathBuf>,
    #[serde(flatten)]
    pub session: SessionConfig,
}

impl ServerConfig {
    /// Parse settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetconfError;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert!(!config.store_messages);
        assert!(config.config_file.is_none());
        assert_eq!(config.session.grace_period, Duration::from_secs(2));
        assert_eq!(config.session.max_frame_size, 16 * 1024 * 1024);
    }

    #[test]
    fn test_empty_json_gives_defaults() {
        assert_eq!(ServerConfig::from_json("{}").unwrap(), ServerConfig::default());
    }

    #[test]
    fn test_full_json() {
        let config = ServerConfig::from_json(
            r#"{
                "store_messages": true,
                "config_file": "/etc/router.xml",
                "grace_period_ms": 250,
                "max_frame_size": 4096
            }"#,
        )
        .unwrap();

        assert!(config.store_messages);
        assert_eq!(config.config_file, Some(PathBuf::from("/etc/router.xml")));
        assert_eq!(config.session.grace_period, Duration::from_millis(250));
        assert_eq!(config.session.max_frame_size, 4096);
    }

    #[test]
    fn test_invalid_json() {
        let err = ServerConfig::from_json(r#"{ "grace_period_ms": "soon" }"#).unwrap_err();
        assert!(matches!(err, NetconfError::Json(_)));
    }
}
