//! Configuration system for the `CareChat` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/carechat/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use carechat_proto::participant::ParticipantId;

use crate::sync::SyncConfig;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    network: NetworkFileConfig,
    sync: SyncFileConfig,
    ui: UiFileConfig,
}

/// `[network]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct NetworkFileConfig {
    base_url: Option<String>,
    token: Option<String>,
    participant_id: Option<String>,
}

/// `[sync]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SyncFileConfig {
    message_poll_ms: Option<u64>,
    list_poll_ms: Option<u64>,
    notice_buffer: Option<usize>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    timestamp_format: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Everything needed to talk to a server as one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    /// Server base URL, e.g. `http://127.0.0.1:8080`.
    pub base_url: String,
    /// Bearer token for the session.
    pub token: String,
    /// The participant the token authenticates as.
    pub participant_id: ParticipantId,
}

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL.
    pub base_url: Option<String>,
    /// Bearer token.
    pub token: Option<String>,
    /// Local participant identifier.
    pub participant_id: Option<String>,
    /// Polling cadence.
    pub sync: SyncConfig,
    /// Timestamp display format string (chrono).
    pub timestamp_format: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            participant_id: None,
            sync: SyncConfig::default(),
            timestamp_format: "%H:%M".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, file))
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            base_url: cli.base_url.clone().or(file.network.base_url),
            token: cli.token.clone().or(file.network.token),
            participant_id: cli.participant.clone().or(file.network.participant_id),
            sync: SyncConfig {
                message_interval: file
                    .sync
                    .message_poll_ms
                    .filter(|ms| *ms > 0)
                    .map_or(defaults.sync.message_interval, Duration::from_millis),
                list_interval: file
                    .sync
                    .list_poll_ms
                    .filter(|ms| *ms > 0)
                    .map_or(defaults.sync.list_interval, Duration::from_millis),
                notice_buffer: file
                    .sync
                    .notice_buffer
                    .unwrap_or(defaults.sync.notice_buffer),
            },
            timestamp_format: cli
                .timestamp_format
                .clone()
                .or(file.ui.timestamp_format)
                .unwrap_or(defaults.timestamp_format),
        }
    }

    /// Builds a [`Connection`] if every networking field is present.
    ///
    /// Returns `None` for offline demo mode.
    #[must_use]
    pub fn connection(&self) -> Option<Connection> {
        let base_url = self.base_url.clone()?;
        let token = self.token.clone()?;
        let participant_id = self.participant_id.clone()?;
        if token.is_empty() || participant_id.trim().is_empty() {
            return None;
        }
        Some(Connection {
            base_url,
            token,
            participant_id: ParticipantId::new(participant_id),
        })
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Direct messaging between doctors and patients")]
pub struct CliArgs {
    /// Base URL of the CareChat server.
    #[arg(long, env = "CARECHAT_URL")]
    pub base_url: Option<String>,

    /// Session token.
    #[arg(long, env = "CARECHAT_TOKEN")]
    pub token: Option<String>,

    /// Your participant identifier.
    #[arg(long, env = "CARECHAT_PARTICIPANT")]
    pub participant: Option<String>,

    /// Path to config file (default: `~/.config/carechat/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Timestamp display format (chrono format string).
    #[arg(long)]
    pub timestamp_format: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "CARECHAT_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/carechat.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Load and parse a TOML config file.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("carechat").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
