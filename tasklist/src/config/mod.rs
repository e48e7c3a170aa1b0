//! Configuration system for the `tasklist` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/tasklist/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;

use tasklist_proto::task::{SortOrder, TaskId};
use url::Url;

/// Default endpoint base URL, matching the server's default bind address.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3005";

/// Default header name.
pub const DEFAULT_APP_NAME: &str = "Tasklist";

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

    /// The endpoint URL is not a valid http(s) URL.
    #[error("invalid API URL {url:?}: {reason}")]
    InvalidApiUrl {
        /// URL as given.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The configured list order is not `asc` or `desc`.
    #[error("invalid list order: {0}")]
    InvalidOrder(String),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiFileConfig,
    ui: UiFileConfig,
}

/// `[api]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ApiFileConfig {
    url: Option<String>,
}

/// `[ui]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct UiFileConfig {
    order: Option<String>,
    app_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved configuration (concrete types, all fields populated)
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the task endpoint.
    pub api_url: Url,
    /// Display order of the task list.
    pub order: SortOrder,
    /// Name shown in the header.
    pub app_name: String,
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed, or if the URL or order values are invalid.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default. The newest task is shown first
    /// unless an order is configured.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let raw_url = cli
            .api_url
            .as_deref()
            .or(file.api.url.as_deref())
            .unwrap_or(DEFAULT_API_URL);
        let order = match (cli.order, file.ui.order.as_deref()) {
            (Some(order), _) => order,
            (None, Some(raw)) => raw.parse().map_err(ConfigError::InvalidOrder)?,
            (None, None) => SortOrder::Descending,
        };

        Ok(Self {
            api_url: parse_api_url(raw_url)?,
            order,
            app_name: file
                .ui
                .app_name
                .clone()
                .unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
        })
    }
}

/// Accepts absolute `http` or `https` URLs only.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidApiUrl {
        url: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme {other:?}"))),
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Task list client")]
pub struct CliArgs {
    /// Base URL of the task endpoint.
    #[arg(long, global = true, env = "TASKLIST_API_URL")]
    pub api_url: Option<String>,

    /// List order: asc or desc.
    #[arg(long, global = true)]
    pub order: Option<SortOrder>,

    /// Path to config file (default: `~/.config/tasklist/config.toml`).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info", env = "TASKLIST_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/tasklist.log`).
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// What to do (default: list).
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Client subcommands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq, Default)]
pub enum Command {
    /// Show the task list.
    #[default]
    List,
    /// Add a task.
    Add {
        /// Task title.
        title: String,
        /// Create it already completed.
        #[arg(long)]
        completed: bool,
    },
    /// Replace a task's title and completed flag.
    Edit {
        /// Task id.
        id: TaskId,
        /// New title.
        title: String,
        /// Mark it completed.
        #[arg(long)]
        completed: bool,
    },
    /// Flip a task's completed flag.
    Toggle {
        /// Task id.
        id: TaskId,
    },
    /// Delete a task.
    Remove {
        /// Task id.
        id: TaskId,
    },
    /// Delete every task.
    Clear,
    /// Replace the list with the sample tasks.
    Reset,
    /// Print the id the next created task would get.
    NextId,
    /// Interactive shell.
    Shell,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            // No config dir available, use defaults.
            return Ok(ConfigFile::default());
        };
        config_dir.join("tasklist").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
