use crate::config::QuiverConfig;
use crate::error::{ConfigError, Result};
use std::path::{Component, Path};

/// Check that a configured directory stays inside the project root.
pub fn validate_project_path(field: &str, path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::invalid(
            field,
            "",
            "Path cannot be empty",
        ));
    }

    if path.is_absolute() {
        return Err(ConfigError::invalid(
            field,
            path.display().to_string(),
            "Use a path relative to the project root",
        ));
    }

    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(ConfigError::invalid(
            field,
            path.display().to_string(),
            "Path must not leave the project root",
        ));
    }

    Ok(())
}

impl QuiverConfig {
    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        validate_project_path("paths.tools", &self.paths.tools)?;
        validate_project_path("bundler.outDir", &self.bundler.out_dir)?;

        if let Some(http) = self.http.resolve() {
            if http.port == 0 {
                return Err(ConfigError::invalid(
                    "http.port",
                    "0",
                    "Port must be between 1 and 65535",
                ));
            }
            if !http.endpoint.starts_with('/') {
                return Err(ConfigError::invalid(
                    "http.endpoint",
                    http.endpoint,
                    "Endpoint must start with '/'",
                ));
            }
        }

        if self.bundler.command.trim().is_empty() {
            return Err(ConfigError::invalid(
                "bundler.command",
                "",
                "Provide the bundler executable, e.g. \"esbuild\"",
            ));
        }

        if self.runtime.command.is_empty() {
            return Err(ConfigError::invalid(
                "runtime.command",
                "[]",
                "Provide the command that starts the bundled runtime",
            ));
        }

        Ok(())
    }
}
