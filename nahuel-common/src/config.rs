//! Configuration loading and resolution
//!
//! Every setting is resolved in this priority order:
//! 1. Command-line argument or its environment variable (highest priority)
//! 2. TOML config file
//! 3. Compiled default (fallback)
//!
//! A missing or unreadable config file never stops startup; it is logged
//! and the compiled defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "NAHUEL_CONFIG";

/// Default HTTP port (the historical Nahuel port)
pub const DEFAULT_PORT: u16 = 8080;

/// Default bind host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default tracing filter directive
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// What to do when a human-readable code (state, type, mode, resolution type)
/// does not match any catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeResolution {
    /// Unknown codes resolve to a null identifier and the write proceeds
    #[default]
    Permissive,
    /// Unknown codes fail the request
    Strict,
}

impl FromStr for CodeResolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "strict" => Ok(Self::Strict),
            other => Err(Error::Config(format!(
                "Unknown code resolution mode '{}' (expected 'permissive' or 'strict')",
                other
            ))),
        }
    }
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub database: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub code_resolution: Option<CodeResolution>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Load the config file from its resolved location, falling back to an
    /// empty config when there is none or it cannot be read.
    ///
    /// Nothing is logged here: this runs before tracing is initialized, so
    /// the outcome is returned for the caller to log.
    pub fn discover(explicit: Option<&Path>) -> (Self, ConfigSource) {
        let Some(path) = locate_config_file(explicit) else {
            return (Self::default(), ConfigSource::Defaults);
        };

        match Self::load(&path) {
            Ok(config) => (config, ConfigSource::File(path)),
            Err(e) => (Self::default(), ConfigSource::Ignored(path, e.to_string())),
        }
    }
}

/// Where the file layer of the configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// No config file was found
    Defaults,
    /// Loaded from this file
    File(PathBuf),
    /// This file exists or was named but could not be used
    Ignored(PathBuf, String),
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            Self::Defaults => info!("No config file found, using compiled defaults"),
            Self::File(path) => info!("Loaded config file: {}", path.display()),
            Self::Ignored(path, reason) => {
                warn!("Ignoring config file {}: {}", path.display(), reason)
            }
        }
    }
}

/// Values supplied on the command line (clap fills these from env as well)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub code_resolution: Option<CodeResolution>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub code_resolution: CodeResolution,
    pub log_level: String,
}

impl ServiceConfig {
    /// Merge command-line overrides over the config file over compiled defaults
    pub fn resolve(overrides: ConfigOverrides, file: TomlConfig) -> Self {
        Self {
            database_path: overrides
                .database
                .or(file.database)
                .unwrap_or_else(default_database_path),
            host: overrides
                .host
                .or(file.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides.port.or(file.port).unwrap_or(DEFAULT_PORT),
            code_resolution: overrides
                .code_resolution
                .or(file.code_resolution)
                .unwrap_or_default(),
            log_level: overrides
                .log_level
                .or(file.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    /// Socket address string for the HTTP listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Find the config file to read.
///
/// Explicit path, then `NAHUEL_CONFIG`, then the user config directory
/// (`~/.config/nahuel/config.toml` on Linux), then `/etc/nahuel/config.toml`
/// on Linux. Only existing files are returned, except an explicit path
/// which is returned as-is so that a typo surfaces as a warning.
pub fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("nahuel").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/nahuel/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("nahuel").join("nahuel.db"))
        .unwrap_or_else(|| PathBuf::from("./nahuel_data/nahuel.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_resolution_parse() {
        assert_eq!("strict".parse::<CodeResolution>().unwrap(), CodeResolution::Strict);
        assert_eq!(
            " Permissive ".parse::<CodeResolution>().unwrap(),
            CodeResolution::Permissive
        );
        assert!("lenient".parse::<CodeResolution>().is_err());
    }

    #[test]
    fn test_code_resolution_defaults_to_permissive() {
        assert_eq!(CodeResolution::default(), CodeResolution::Permissive);
    }

    #[test]
    fn test_resolve_uses_compiled_defaults() {
        let config = ServiceConfig::resolve(ConfigOverrides::default(), TomlConfig::default());
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.code_resolution, CodeResolution::Permissive);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.database_path, default_database_path());
    }

    #[test]
    fn test_overrides_beat_file() {
        let file = TomlConfig {
            port: Some(9000),
            host: Some("127.0.0.1".to_string()),
            code_resolution: Some(CodeResolution::Strict),
            ..Default::default()
        };
        let overrides = ConfigOverrides {
            port: Some(9100),
            ..Default::default()
        };

        let config = ServiceConfig::resolve(overrides, file);
        assert_eq!(config.port, 9100);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.code_resolution, CodeResolution::Strict);
        assert_eq!(config.bind_addr(), "127.0.0.1:9100");
    }
}
