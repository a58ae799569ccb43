//! Transport configuration.
//!
//! Every field has a default, so an empty TOML file (or none at all) yields a
//! working configuration:
//!
//! ```toml
//! connect_timeout_secs = 10
//! read_timeout_secs = 30
//! write_timeout_secs = 30
//! buffer_size = 4096
//! ```
//!
//! A timeout of `0` disables that timeout and lets the call block
//! indefinitely.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Settings applied to every request a client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
    /// Size of the fixed read buffer the response is accumulated through.
    pub buffer_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            read_timeout_secs: 30,
            write_timeout_secs: 30,
            buffer_size: 4096,
        }
    }
}

impl TransportConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| ClientError::invalid_config("toml", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ClientError::invalid_config(path.display().to_string(), e.to_string()))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(ClientError::invalid_config("buffer_size", "must be greater than 0"));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        seconds(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        seconds(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        seconds(self.write_timeout_secs)
    }
}

fn seconds(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = TransportConfig::from_toml_str("").unwrap();
        assert_eq!(config, TransportConfig::default());
        assert_eq!(config.read_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn partial_file_overrides_only_its_fields() {
        let config = TransportConfig::from_toml_str("buffer_size = 16\nread_timeout_secs = 0\n").unwrap();
        assert_eq!(config.buffer_size, 16);
        assert_eq!(config.read_timeout(), None);
        assert_eq!(config.connect_timeout_secs, 10);
    }

    #[test]
    fn zero_buffer_is_rejected() {
        let err = TransportConfig::from_toml_str("buffer_size = 0").unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfig { ref field, .. } if field == "buffer_size"));
        assert_eq!(err.code(), 1300);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = TransportConfig::from_toml_str("buffer_size = \"big\"").unwrap_err();
        assert!(matches!(err, ClientError::InvalidConfig { .. }));
    }
}
