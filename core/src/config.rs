use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure for fraudwatch.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub console: ConsoleConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path.as_ref()).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file is missing.
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "Failed to load config from {:?}: {}. Using defaults.",
                    path.as_ref(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Get the default configuration as a TOML string.
    pub fn default_toml() -> Result<String> {
        let config = Self::default();
        toml::to_string_pretty(&config).context("Failed to serialize default config")
    }

    /// Validate the configuration for obvious misconfiguration.
    pub fn validate(&self) -> Result<()> {
        let url = self.console.server_url.trim();
        if url.is_empty() {
            anyhow::bail!("server_url cannot be empty");
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("server_url must start with http:// or https://: {}", url);
        }

        if self.console.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms must be greater than 0");
        }

        if self.console.alert_display_limit == 0 {
            anyhow::bail!("alert_display_limit must be greater than 0");
        }

        if !(0.0..=1.0).contains(&self.console.high_risk_threshold) {
            anyhow::bail!(
                "high_risk_threshold must be within [0, 1], got {}",
                self.console.high_risk_threshold
            );
        }

        if self.console.pending_ack_timeout_ms == Some(0) {
            anyhow::bail!("pending_ack_timeout_ms must be greater than 0 when set");
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!("Invalid log level: {}", other),
        }

        Ok(())
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("Failed to parse config")?;
        Ok(config)
    }
}

/// Polling and display settings for the console.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_alert_display_limit")]
    pub alert_display_limit: usize,

    #[serde(default = "default_high_risk_threshold")]
    pub high_risk_threshold: f64,

    /// Skip a scheduled cycle while the previous one is still in flight.
    #[serde(default)]
    pub skip_overlapping_cycles: bool,

    /// Upper bound on how long an optimistic acknowledgment may wait for the backend to
    /// report it. Unset keeps the overlay until confirmation or an explicit failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_ack_timeout_ms: Option<u64>,
}

impl ConsoleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn pending_ack_timeout(&self) -> Option<Duration> {
        self.pending_ack_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            poll_interval_ms: default_poll_interval(),
            alert_display_limit: default_alert_display_limit(),
            high_risk_threshold: default_high_risk_threshold(),
            skip_overlapping_cycles: false,
            pending_ack_timeout_ms: None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log destination while the interactive console owns the terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

// Default providers ---------------------------------------------------------

fn default_server_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_poll_interval() -> u64 {
    5000
}

fn default_alert_display_limit() -> usize {
    10
}

fn default_high_risk_threshold() -> f64 {
    0.7
}

fn default_log_level() -> String {
    "info".to_string()
}
