//! File-based configuration for hosts embedding the core.
//!
//! # Invariants
//! - Every section has defaults; an empty file is a valid config.
//! - A missing file yields defaults, an unparsable file is an error.

use crate::service::person_service::DEFAULT_RESTORE_WINDOW_DAYS;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_DB_FILE_NAME: &str = "kinship.sqlite3";
const DEFAULT_EDGE_COLOR: &str = "#9ca3af";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinshipConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub retention: RetentionConfig,
    pub types: TypesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files; file logging is off when
    /// unset.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Days a deleted person stays restorable.
    pub restore_window_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypesConfig {
    /// Seed the starter relationship types for accounts without any.
    pub seed_defaults: bool,
    /// Color renderers use for edges whose type has none.
    pub default_color: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            dir: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_FILE_NAME),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            restore_window_days: DEFAULT_RESTORE_WINDOW_DAYS,
        }
    }
}

impl Default for TypesConfig {
    fn default() -> Self {
        Self {
            seed_defaults: true,
            default_color: DEFAULT_EDGE_COLOR.to_string(),
        }
    }
}

/// Configuration load failure.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: Option<PathBuf>, source: toml::de::Error },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse {
                path: Some(path),
                source,
            } => write!(f, "failed to parse config `{}`: {source}", path.display()),
            Self::Parse { path: None, source } => write!(f, "failed to parse config: {source}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

impl KinshipConfig {
    /// Loads configuration from a TOML file.
    ///
    /// Returns defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "event=config_load module=config status=default path={}",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })?;
        info!(
            "event=config_load module=config status=ok path={}",
            path.display()
        );
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse { path: None, source })
    }
}
