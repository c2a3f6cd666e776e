//! Configuration system for the `CareChat` messaging server.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/carechat-server/config.toml`)
//! 4. Compiled defaults
//!
//! The file may also carry `[[participants]]` entries that seed the profile
//! and session directories for standalone deployments.

use std::path::PathBuf;
use std::time::Duration;

use carechat_proto::message::MAX_MESSAGE_SIZE;
use carechat_proto::participant::{ParticipantId, Role};

/// Errors that can occur when loading server configuration.
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

    /// A seed entry is unusable.
    #[error("invalid participant seed: {0}")]
    InvalidSeed(String),

    /// A setting is out of range.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Name of the setting.
        key: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerConfigFile {
    server: ServerFileConfig,
    participants: Vec<ParticipantSeed>,
}

/// `[server]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    max_body_size: Option<usize>,
    snapshot_path: Option<PathBuf>,
    snapshot_interval_secs: Option<u64>,
}

/// A `[[participants]]` entry: one profile plus an optional session token.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ParticipantSeed {
    /// Participant identifier.
    pub id: ParticipantId,
    /// Identity pool.
    pub role: Role,
    /// Display name.
    pub name: String,
    /// Avatar reference.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Specialization (doctors) or health identifier (patients).
    #[serde(default)]
    pub label: Option<String>,
    /// Bearer token that authenticates as this participant.
    #[serde(default)]
    pub token: Option<String>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments for the messaging server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "CareChat direct-messaging server")]
pub struct ServerCliArgs {
    /// Address to bind the HTTP server to.
    #[arg(short, long, env = "CARECHAT_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/carechat-server/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum request body size in bytes.
    #[arg(long)]
    pub max_body_size: Option<usize>,

    /// File to load the store from and periodically save it to.
    #[arg(long, env = "CARECHAT_SNAPSHOT")]
    pub snapshot_path: Option<PathBuf>,

    /// Seconds between periodic snapshots.
    #[arg(long)]
    pub snapshot_interval_secs: Option<u64>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "CARECHAT_LOG")]
    pub log_level: String,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to (e.g., `0.0.0.0:8080`).
    pub bind_addr: String,
    /// Maximum accepted request body in bytes.
    pub max_body_size: usize,
    /// Snapshot file; persistence is off when `None`.
    pub snapshot_path: Option<PathBuf>,
    /// Time between periodic snapshots.
    pub snapshot_interval: Duration,
    /// Log level filter string.
    pub log_level: String,
    /// Profiles and sessions to seed at start-up.
    pub participants: Vec<ParticipantSeed>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            // Room for the largest body plus JSON framing.
            max_body_size: MAX_MESSAGE_SIZE * 2,
            snapshot_path: None,
            snapshot_interval: Duration::from_secs(30),
            log_level: "info".to_string(),
            participants: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// If `--config` is given and the file does not exist, returns an error.
    /// If no `--config` is given, the default path is tried and a missing
    /// file is treated as empty config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read,
    /// cannot be parsed, or contains an invalid participant seed.
    pub fn load(cli: &ServerCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        let config = Self::resolve(cli, file);
        config.validate()?;
        Ok(config)
    }

    /// Priority: CLI > file > default.
    fn resolve(cli: &ServerCliArgs, file: ServerConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: cli
                .bind
                .clone()
                .or(file.server.bind_addr)
                .unwrap_or(defaults.bind_addr),
            max_body_size: cli
                .max_body_size
                .or(file.server.max_body_size)
                .unwrap_or(defaults.max_body_size),
            snapshot_path: cli.snapshot_path.clone().or(file.server.snapshot_path),
            snapshot_interval: cli
                .snapshot_interval_secs
                .or(file.server.snapshot_interval_secs)
                .map_or(defaults.snapshot_interval, Duration::from_secs),
            log_level: cli.log_level.clone(),
            participants: file.participants,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for seed in &self.participants {
            if seed.id.is_blank() {
                return Err(ConfigError::InvalidSeed("participant id is empty".into()));
            }
            if !seen.insert(&seed.id) {
                return Err(ConfigError::InvalidSeed(format!(
                    "participant {} is listed twice",
                    seed.id
                )));
            }
        }
        if self.snapshot_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "snapshot_interval_secs",
                reason: "must be positive",
            });
        }
        Ok(())
    }
}

/// Load and parse a TOML config file for the server.
fn load_config_file(
    explicit_path: Option<&std::path::Path>,
) -> Result<ServerConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ServerConfigFile::default());
        };
        config_dir.join("carechat-server").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServerConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
