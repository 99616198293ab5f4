use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Config file read when `--config` is not given. Missing is fine.
pub const DEFAULT_CONFIG_FILE: &str = "blocks.toml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Tracing filter directive, used when `RUST_LOG` is unset.
    pub log: Option<String>,
    /// Seed for sprite placement.
    pub seed: Option<u64>,
    /// Ask confirm/prompt questions on the terminal instead of answering
    /// them with "no" and "cancel".
    pub interactive: bool,
    pub canvas: CanvasConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log: None,
            seed: None,
            interactive: false,
            canvas: CanvasConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    pub enabled: bool,
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        CanvasConfig {
            enabled: true,
            width: 480.0,
            height: 360.0,
        }
    }
}

impl CanvasConfig {
    pub fn size(&self) -> Option<(f64, f64)> {
        self.enabled.then_some((self.width, self.height))
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read config '{}': {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => {
                write!(f, "invalid config '{}': {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
        }
    }
}

impl Config {
    pub fn parse(text: &str, path: &Path) -> Result<Config, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `explicit` if given (it must exist), otherwise `blocks.toml` in
    /// the working directory if present, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        match std::fs::read_to_string(&path) {
            Ok(text) => Config::parse(&text, &path),
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(source) => Err(ConfigError::Io { path, source }),
        }
    }
}
