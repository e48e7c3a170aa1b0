//! Server settings: listen address, database file, log level.
//!
//! Each setting comes from the first source that provides it: command line,
//! environment (`TASKLIST_ADDR`, `TASKLIST_DB`, `TASKLIST_SERVER_LOG`),
//! `~/.config/tasklist-server/config.toml`, then the built-in default.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Address the server listens on when nothing else is configured.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3005";

/// Database file used when nothing else is configured.
pub const DEFAULT_DB_PATH: &str = "db.json";

/// Errors that can occur when loading server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this layout.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// The listen address is not `host:port` with a numeric host.
    #[error("invalid bind address {0:?}")]
    InvalidBindAddr(String),
}

/// `config.toml` layout. Every key is optional.
///
/// ```toml
/// [server]
/// bind_addr = "0.0.0.0:3005"
/// db_path = "/var/lib/tasklist/db.json"
/// ```
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerConfigFile {
    server: ServerSection,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerSection {
    bind_addr: Option<String>,
    db_path: Option<PathBuf>,
}

/// Command line of `tasklist-server`.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "JSON-file backed task endpoint")]
pub struct ServerCliArgs {
    /// Listen address, e.g. `0.0.0.0:3005`.
    #[arg(short, long, env = "TASKLIST_ADDR")]
    pub bind: Option<String>,

    /// JSON database file; created on the first write if missing.
    #[arg(short, long, env = "TASKLIST_DB")]
    pub db: Option<PathBuf>,

    /// Alternate config file. Unlike the default one, it must exist.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// `tracing` filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info", env = "TASKLIST_SERVER_LOG")]
    pub log_level: String,
}

/// Settings the server runs with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Listen address.
    pub bind_addr: SocketAddr,
    /// JSON database file.
    pub db_path: PathBuf,
    /// `tracing` filter directive.
    pub log_level: String,
}

impl ServerConfig {
    /// Reads the config file (if any) and merges it under `cli`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit `--config` file is missing or
    /// unreadable, if any config file is malformed, or if the bind address
    /// does not parse.
    pub fn load(cli: &ServerCliArgs) -> Result<Self, ConfigError> {
        let file = read_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file.server)
    }

    fn resolve(cli: &ServerCliArgs, file: &ServerSection) -> Result<Self, ConfigError> {
        let raw_addr = cli
            .bind
            .as_deref()
            .or(file.bind_addr.as_deref())
            .unwrap_or(DEFAULT_BIND_ADDR);
        let bind_addr = raw_addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(raw_addr.to_string()))?;

        let db_path = cli
            .db
            .clone()
            .or_else(|| file.db_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        Ok(Self {
            bind_addr,
            db_path,
            log_level: cli.log_level.clone(),
        })
    }
}

/// Reads `explicit` if given, else the per-user default file.
///
/// Only the default file may be absent.
fn read_config_file(explicit: Option<&Path>) -> Result<ServerConfigFile, ConfigError> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => match dirs::config_dir() {
            Some(dir) => (dir.join("tasklist-server").join("config.toml"), false),
            None => return Ok(ServerConfigFile::default()),
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => {
            Ok(ServerConfigFile::default())
        }
        Err(source) => Err(ConfigError::ReadFile { path, source }),
    }
}
