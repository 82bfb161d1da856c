//! Link configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::{
    ProtocolError, DEFAULT_BAUD_RATE, DEFAULT_HISTORY_LEN, DEFAULT_KEEPALIVE_INTERVAL_MS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS, DEFAULT_WRITE_TIMEOUT_MS,
};

/// Settings for one serial link to a stimulator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Serial port name (e.g. "/dev/ttyUSB0" or "COM1")
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Serial I/O timeout in milliseconds. Reads only fetch bytes already
    /// waiting, so in practice this bounds writes.
    pub write_timeout_ms: u64,
    /// Period of the comm loop in milliseconds
    pub poll_interval_ms: u64,
    /// Idle time after which a keepalive is sent, in milliseconds
    pub keepalive_interval_ms: u64,
    /// How long a request waits for its reply, in milliseconds
    pub reply_timeout_ms: u64,
    /// Number of frames kept in the traffic history
    pub history_len: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            write_timeout_ms: DEFAULT_WRITE_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            keepalive_interval_ms: DEFAULT_KEEPALIVE_INTERVAL_MS,
            reply_timeout_ms: DEFAULT_TIMEOUT_MS,
            history_len: DEFAULT_HISTORY_LEN,
        }
    }
}

impl LinkConfig {
    /// Default settings for the given port
    pub fn for_port(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(content: &str) -> Result<Self, ProtocolError> {
        let config: LinkConfig =
            serde_json::from_str(content).map_err(|e| ProtocolError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load settings from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ProtocolError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Reject settings the comm loop cannot run with
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.baud_rate == 0 {
            return Err(ProtocolError::Config("baud_rate must be non-zero".into()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ProtocolError::Config("poll_interval_ms must be non-zero".into()));
        }
        if self.keepalive_interval_ms < self.poll_interval_ms {
            return Err(ProtocolError::Config(format!(
                "keepalive_interval_ms ({}) is shorter than poll_interval_ms ({})",
                self.keepalive_interval_ms, self.poll_interval_ms
            )));
        }
        Ok(())
    }

    /// Comm loop period
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Idle time before a keepalive
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    /// Time a request waits for its reply
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}
