//! Provider configuration.
//!
//! Every knob has a default matching the stock station provider, so an empty
//! TOML document is a valid configuration.

use crate::db::schema::{is_valid_table_name, MAX_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_AUTHORITY: &str = "eu.tanov.android.StationProvider";
pub const DEFAULT_TABLE_NAME: &str = "stations";
pub const DEFAULT_DATABASE_FILE: &str = "station.db";
pub const DEFAULT_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_RESULT_LIMIT: u32 = 10;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Authority segment of every station locator.
    pub authority: String,
    /// Table name; also the first path segment of locators.
    pub table_name: String,
    pub database_path: PathBuf,
    /// Bumping this drops and recreates the table on next open.
    pub schema_version: u32,
    /// Fixed cap applied to every read.
    pub result_limit: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            authority: DEFAULT_AUTHORITY.to_string(),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            database_path: PathBuf::from(DEFAULT_DATABASE_FILE),
            schema_version: DEFAULT_SCHEMA_VERSION,
            result_limit: DEFAULT_RESULT_LIMIT,
        }
    }
}

impl ProviderConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_table_name(&self.table_name) {
            return Err(ConfigError::Invalid(format!(
                "table_name `{}` is not a plain identifier",
                self.table_name
            )));
        }
        let authority = self.authority.as_str();
        if authority.is_empty() || authority.contains(['/', '?', '#']) {
            return Err(ConfigError::Invalid(format!(
                "authority `{authority}` must be non-empty and contain no `/`, `?` or `#`"
            )));
        }
        if self.schema_version < 1 || self.schema_version > MAX_SCHEMA_VERSION {
            return Err(ConfigError::Invalid(format!(
                "schema_version must be between 1 and {MAX_SCHEMA_VERSION}"
            )));
        }
        if self.result_limit < 1 {
            return Err(ConfigError::Invalid(
                "result_limit must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Loads a provider config from a TOML file.
pub fn load_config(path: &Path) -> Result<ProviderConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ProviderConfig::from_toml_str(&contents)
}
