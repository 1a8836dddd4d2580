//! Multi-source configuration loading.
//!
//! Priority: environment variables > config file > defaults. Command-line
//! overrides are applied by the caller on the extracted value.

use crate::config::QuiverConfig;
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

/// Config file names probed in the project root, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["quiver.config.json", "quiver.config.toml"];

/// Prefix for environment overrides (`QUIVER_STDIO=true`, `QUIVER_HTTP__PORT=4000`).
pub const ENV_PREFIX: &str = "QUIVER_";

/// Builder for loading a [`QuiverConfig`] rooted at a project directory.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    root: PathBuf,
    file: Option<PathBuf>,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            file: None,
            env_prefix: Some(ENV_PREFIX.to_string()),
        }
    }

    /// Use an explicit config file instead of probing the project root.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Skip environment overrides entirely.
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Locate the config file that [`load`](Self::load) would read.
    pub fn discover(&self) -> Option<PathBuf> {
        if let Some(file) = &self.file {
            return Some(resolve(&self.root, file));
        }

        CONFIG_FILE_NAMES
            .iter()
            .map(|name| self.root.join(name))
            .find(|candidate| candidate.is_file())
    }

    pub fn load(&self) -> Result<QuiverConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(QuiverConfig::default()));

        if let Some(path) = self.discover() {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path));
            }
            tracing::debug!(path = %path.display(), "loading config file");
            figment = merge_file(figment, &path)?;
        } else {
            tracing::debug!(root = %self.root.display(), "no config file found, using defaults");
        }

        if let Some(prefix) = &self.env_prefix {
            figment = figment.merge(Env::prefixed(prefix).split("__"));
        }

        Ok(figment.extract()?)
    }
}

/// Load configuration for `root` with default discovery and env overrides.
pub fn load(root: &Path) -> Result<QuiverConfig> {
    ConfigLoader::new(root).load()
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(figment.merge(Json::file(path))),
        Some("toml") => Ok(figment.merge(Toml::file(path))),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
