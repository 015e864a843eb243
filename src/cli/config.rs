use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::query::RouteOptions;
use crate::storage::ReadOptions;

/// Prefix matches listed when neither the command line nor the config file sets a cap.
pub const DEFAULT_PREFIX_MAX: usize = 10;

/// Settings read from the optional `cli.toml`.
///
/// Every key is optional; command-line flags override whatever the file sets.
#[derive(Debug, Default)]
pub struct CliConfig {
    path: Option<PathBuf>,
    data: RawConfig,
}

impl CliConfig {
    /// Loads `explicit`, or the per-user default location when `None`.
    ///
    /// A missing file yields the defaults; an unreadable or malformed one is an error.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(default_config_path);
        let data = match path.as_ref() {
            Some(config_path) if config_path.exists() => read_file(config_path)?,
            _ => RawConfig::default(),
        };
        validate(path.as_deref(), &data)?;
        Ok(Self { path, data })
    }

    /// Parses a config from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let data: RawConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        validate(None, &data)?;
        Ok(Self { path: None, data })
    }

    /// Location the config was looked up at.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Graph file used when a command names none.
    pub fn default_graph(&self) -> Option<&Path> {
        self.data.graph.as_deref()
    }

    /// Route options with the file's overrides applied.
    pub fn route_options(&self) -> RouteOptions {
        let mut opts = RouteOptions::default();
        if let Some(limit) = self.data.frontier_limit {
            opts = opts.frontier_limit(limit);
        }
        if let Some(unidirectional) = self.data.unidirectional {
            opts = opts.bidirectional(!unidirectional);
        }
        opts
    }

    /// Read options with the file's overrides applied.
    pub fn read_options(&self) -> ReadOptions {
        match self.data.window_bytes {
            Some(bytes) => ReadOptions::default().window_bytes(bytes),
            None => ReadOptions::default(),
        }
    }

    /// Cap on prefix matches.
    pub fn prefix_max(&self) -> usize {
        self.data.prefix_max.unwrap_or(DEFAULT_PREFIX_MAX)
    }
}

fn read_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn validate(path: Option<&Path>, data: &RawConfig) -> Result<(), ConfigError> {
    let invalid = |key: &'static str, reason: &'static str| ConfigError::Invalid {
        path: path.map(Path::to_path_buf).unwrap_or_default(),
        key,
        reason,
    };
    if data.window_bytes == Some(0) {
        return Err(invalid("window_bytes", "must be positive"));
    }
    if data.prefix_max == Some(0) {
        return Err(invalid("prefix_max", "must be positive"));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawConfig {
    #[serde(default)]
    graph: Option<PathBuf>,
    #[serde(default)]
    frontier_limit: Option<usize>,
    #[serde(default)]
    unidirectional: Option<bool>,
    #[serde(default)]
    window_bytes: Option<usize>,
    #[serde(default)]
    prefix_max: Option<usize>,
}

/// Failures loading the CLI config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read CLI config {path}: {source}")]
    Read {
        /// Config location.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },
    /// The file is not valid TOML for this schema.
    #[error("failed to parse CLI config {path}: {source}")]
    Parse {
        /// Config location.
        path: PathBuf,
        /// Underlying failure.
        source: toml::de::Error,
    },
    /// A key holds an unusable value.
    #[error("CLI config {path}: '{key}' {reason}")]
    Invalid {
        /// Config location.
        path: PathBuf,
        /// Offending key.
        key: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// `<config_dir>/wikiroute/cli.toml`, when the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|base| base.join("wikiroute").join("cli.toml"))
}
