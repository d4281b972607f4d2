//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// Local accepting socket.
    pub listener: ListenerConfig,

    /// The printer every session connects to.
    pub upstream: UpstreamConfig,

    /// Chunk size caps and the descriptor classification threshold.
    pub limits: LimitsConfig,

    /// Polling, settle and drain timings.
    pub timing: TimingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Local address to bind (IP or hostname).
    pub bind_address: String,

    /// Local port to bind. 0 lets the OS pick one.
    pub port: u16,

    /// Listen backlog.
    pub backlog: u32,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 9100,
            backlog: 5,
        }
    }
}

/// Printer (upstream) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Printer host name or IP.
    pub host: String,

    /// Printer raw TCP port.
    pub port: u16,

    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            host: "vc-500w.host".to_string(),
            port: 9100,
            connect_timeout_secs: 10,
        }
    }
}

/// Size limits applied to forwarded chunks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest chunk read from the client in one go (image data).
    pub max_image_chunk: usize,

    /// Chunks larger than this are treated as image data and never rewritten.
    /// Also the read size for the printer-to-client direction.
    pub max_descriptor_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_image_chunk: 20_000_000,
            max_descriptor_size: 50_000,
        }
    }
}

/// Timing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Upper bound on how long a readiness wait goes without re-checking shutdown.
    pub poll_interval_ms: u64,

    /// Delay between a leg becoming readable and reading it, so a peer can
    /// finish emitting a message before it is read as one chunk.
    pub read_settle_ms: u64,

    /// Maximum time spent draining a leg on close. 0 waits indefinitely.
    pub drain_timeout_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            read_settle_ms: 500,
            drain_timeout_secs: 0,
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn read_settle(&self) -> Duration {
        Duration::from_millis(self.read_settle_ms)
    }

    /// `None` when draining is unbounded.
    pub fn drain_timeout(&self) -> Option<Duration> {
        (self.drain_timeout_secs > 0).then(|| Duration::from_secs(self.drain_timeout_secs))
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}
