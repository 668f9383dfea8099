//! Configuration for the capture daemon.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gator_core::SenderConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatordConfig {
    /// Collector listener settings.
    pub network: NetworkConfig,
    /// Flow control and watchdog tuning.
    pub transport: TransportConfig,
    /// Capture source and local persistence.
    pub capture: CaptureConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind the collector listener on.
    pub bind_address: String,
    /// TCP port collectors connect to.
    pub port: u16,
}

/// Transport tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Seconds a single chunk may take before the watchdog aborts.
    pub deadline_secs: u64,
    /// Throughput ceiling in kilobits per second.
    pub max_rate_kbps: u64,
}

/// Capture configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Pre-framed capture stream to ship; "-" reads stdin.
    pub input: String,
    /// Directory for the local data file. Empty disables persistence.
    pub output_dir: String,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            deadline_secs: 8,
            max_rate_kbps: 100,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            input: "-".into(),
            output_dir: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl GatordConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Convert transport settings into the core `SenderConfig`.
    pub fn to_sender_config(&self) -> SenderConfig {
        SenderConfig {
            deadline: Duration::from_secs(self.transport.deadline_secs.max(1)),
            max_rate_bps: self.transport.max_rate_kbps.max(1) * 1000,
        }
    }

    /// The data file directory, if persistence is enabled.
    pub fn output_dir(&self) -> Option<PathBuf> {
        if self.capture.output_dir.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.capture.output_dir))
        }
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.network.bind_address, self.network.port)
    }
}

// ── Tests ────────────────────────────────────────────────────────
