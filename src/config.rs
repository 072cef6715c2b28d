//! Connection configuration.
//!
//! Window sizes and buffer capacities are applied when a connection is
//! created. Congestion and timer values are carried for callers that build
//! on top of the connection; nothing in this crate schedules timers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default advertised window, in bytes
pub const DEFAULT_WINDOW_SIZE: u16 = 65535;

/// Per-connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Window advertised on outbound data segments
    pub send_window: u16,
    /// Window advertised on acknowledgments
    pub receive_window: u16,
    /// Starting congestion window, in segments
    pub initial_congestion_window: u16,
    /// Slow-start threshold
    pub slow_start_threshold: u16,
    /// Initial capacity reserved for each of the send and receive buffers
    pub buffer_capacity: usize,
    /// Retransmission timeout in milliseconds
    pub retransmit_timeout_ms: u64,
    /// Connection establishment timeout in milliseconds
    pub connection_timeout_ms: u64,
    /// Keep-alive idle time in milliseconds
    pub keep_alive_timeout_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            send_window: DEFAULT_WINDOW_SIZE,
            receive_window: DEFAULT_WINDOW_SIZE,
            initial_congestion_window: 1,
            slow_start_threshold: 65535,
            buffer_capacity: 8192,
            retransmit_timeout_ms: 3_000,
            connection_timeout_ms: 30_000,
            keep_alive_timeout_ms: 7_200_000,
        }
    }
}

impl ConnectionConfig {
    pub fn retransmit_timeout(&self) -> Duration {
        Duration::from_millis(self.retransmit_timeout_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn keep_alive_timeout(&self) -> Duration {
        Duration::from_millis(self.keep_alive_timeout_ms)
    }
}

/// Top-level configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    pub connection: ConnectionConfig,
}

impl StackConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }
}
