//! Configuration for the taskboard client.
//!
//! Layered with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskboard/config.toml`)
//! 4. Compiled defaults
//!
//! A missing default config file is not an error. An explicit `--config`
//! path that doesn't exist is.

use std::path::PathBuf;
use std::time::Duration;

use crate::board::{DEFAULT_HISTORY_CAPACITY, DEFAULT_UNDO_WINDOW, StoreConfig};
use crate::retry::RetryPolicy;

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

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    remote: RemoteFileConfig,
    retry: RetryFileConfig,
    board: BoardFileConfig,
    ui: UiFileConfig,
}

/// `[remote]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RemoteFileConfig {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// `[retry]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RetryFileConfig {
    max_retries: Option<u32>,
    base_delay_ms: Option<u64>,
}

/// `[board]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BoardFileConfig {
    undo_window_secs: Option<u64>,
    history_capacity: Option<usize>,
    event_buffer: Option<usize>,
}

/// `[ui]` section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    poll_timeout_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -- Remote --
    /// Base URL of the task service. `None` runs the board offline.
    pub base_url: Option<String>,
    /// Upper bound for a single HTTP request, also used as the per-attempt
    /// retry timeout.
    pub request_timeout: Duration,

    // -- Retry --
    /// Additional attempts after a failed remote call.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles per retry.
    pub base_delay: Duration,

    // -- Board --
    /// How long the undo prompt stays visible after a move.
    pub undo_window: Duration,
    /// Number of moves kept for undo.
    pub history_capacity: usize,
    /// Capacity of the board event channel.
    pub event_buffer: usize,

    // -- UI --
    /// Poll timeout for the TUI event loop.
    pub poll_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            base_url: None,
            request_timeout: retry.attempt_timeout,
            max_retries: retry.max_retries,
            base_delay: retry.base_delay,
            undo_window: DEFAULT_UNDO_WINDOW,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            event_buffer: 64,
            poll_timeout: Duration::from_millis(50),
        }
    }
}

impl ClientConfig {
    /// Loads configuration by merging CLI args, env vars and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read,
    /// or if any config file cannot be parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolves a `ClientConfig` from CLI args and a parsed config file.
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        let base_url = if cli.offline {
            None
        } else {
            cli.base_url
                .clone()
                .or_else(|| file.remote.base_url.clone())
                .filter(|url| !url.trim().is_empty())
        };

        Self {
            base_url,
            request_timeout: file
                .remote
                .request_timeout_secs
                .map_or(defaults.request_timeout, Duration::from_secs),
            max_retries: cli
                .max_retries
                .or(file.retry.max_retries)
                .unwrap_or(defaults.max_retries),
            base_delay: file
                .retry
                .base_delay_ms
                .map_or(defaults.base_delay, Duration::from_millis),
            undo_window: file
                .board
                .undo_window_secs
                .map_or(defaults.undo_window, Duration::from_secs),
            history_capacity: file
                .board
                .history_capacity
                .unwrap_or(defaults.history_capacity)
                .max(1),
            event_buffer: file
                .board
                .event_buffer
                .unwrap_or(defaults.event_buffer)
                .max(1),
            poll_timeout: file
                .ui
                .poll_timeout_ms
                .map_or(defaults.poll_timeout, Duration::from_millis),
        }
    }

    /// Retry policy for remote calls.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: self.base_delay,
            attempt_timeout: self.request_timeout,
        }
    }

    /// Store tunables derived from this configuration.
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            retry: self.retry_policy(),
            history_capacity: self.history_capacity,
            event_buffer: self.event_buffer,
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Terminal task board with optimistic sync")]
pub struct CliArgs {
    /// Base URL of the task service, e.g. `http://127.0.0.1:8080`.
    #[arg(long, env = "TASKBOARD_URL")]
    pub base_url: Option<String>,

    /// Run against an in-memory board, ignoring any configured URL.
    #[arg(long)]
    pub offline: bool,

    /// Additional attempts after a failed remote call.
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Path to config file (default: `~/.config/taskboard/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKBOARD_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskboard.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Loads and parses a TOML config file.
///
/// An explicit path must exist. Without one, the default path is tried and
/// a missing file yields an empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("taskboard").join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
