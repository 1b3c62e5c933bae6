//! Configuration management for Keepsake Server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Name of the directory under the public root that holds uploaded blobs
pub const UPLOAD_SUBDIR: &str = "upload";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Served under `/public`; uploads land in `<public_dir>/upload`
    pub public_dir: PathBuf,
    pub favicon_path: PathBuf,
    pub template_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Idle deadline between two chunks of an incoming file
    pub read_timeout_secs: u64,
    pub list_backend: UploadListBackend,
    pub list_max_entries: usize,
    /// Visitors kept by the memory backend before the oldest is dropped
    pub list_max_visitors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadListBackend {
    Cookie,
    Memory,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

impl StorageConfig {
    /// Directory that holds content-addressed uploads
    pub fn upload_dir(&self) -> PathBuf {
        self.public_dir.join(UPLOAD_SUBDIR)
    }
}

impl UploadConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

impl FromStr for UploadListBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cookie" => Ok(UploadListBackend::Cookie),
            "memory" => Ok(UploadListBackend::Memory),
            _ => Err(ConfigError::InvalidValue {
                name: "UPLOAD_LIST_BACKEND",
                value: s.to_string(),
            }),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            storage: StorageConfig {
                public_dir: PathBuf::from("./public"),
                favicon_path: PathBuf::from("./assets/favicon.ico"),
                template_dir: PathBuf::from("./templates"),
            },
            uploads: UploadConfig {
                read_timeout_secs: 30,
                list_backend: UploadListBackend::Cookie,
                list_max_entries: 64,
                list_max_visitors: crate::session::store::DEFAULT_MAX_VISITORS,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", defaults.server.port)?,
            },
            storage: StorageConfig {
                public_dir: env::var("PUBLIC_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.public_dir),
                favicon_path: env::var("FAVICON_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.favicon_path),
                template_dir: env::var("TEMPLATE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.storage.template_dir),
            },
            uploads: UploadConfig {
                read_timeout_secs: parse_var(
                    "UPLOAD_READ_TIMEOUT_SECS",
                    defaults.uploads.read_timeout_secs,
                )?,
                list_backend: parse_var("UPLOAD_LIST_BACKEND", defaults.uploads.list_backend)?,
                list_max_entries: parse_var(
                    "UPLOAD_LIST_MAX_ENTRIES",
                    defaults.uploads.list_max_entries,
                )?,
                list_max_visitors: parse_var(
                    "UPLOAD_LIST_MAX_VISITORS",
                    defaults.uploads.list_max_visitors,
                )?,
            },
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}
