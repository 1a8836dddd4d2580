//! Error handling for the quiver CLI.
//!
//! Library errors from `quiver-config` and `quiver-compiler` convert into
//! [`CliError`] through `#[from]`, and [`ResultExt`] turns missing-file I/O
//! errors into [`CliError::FileNotFound`] on the way up.
//!
//! # Example
//!
//! ```rust,no_run
//! use quiver_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_handler(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path).with_path(path)
//! }
//! ```

mod diagnostic;

use std::path::PathBuf;
use thiserror::Error;

pub use diagnostic::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] quiver_config::ConfigError),

    /// The compile run ended with an error
    #[error(transparent)]
    Compile(#[from] quiver_compiler::Error),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The project's `.env` file could not be parsed
    #[error("Failed to load .env: {0}")]
    Dotenv(#[from] dotenvy::Error),
}

pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn a not-found I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_config::ConfigError;

    #[test]
    fn test_cli_error_from_config_error() {
        let err: CliError = ConfigError::NotFound(PathBuf::from("quiver.config.json")).into();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("quiver.config.json"));
    }

    #[test]
    fn test_cli_error_from_compile_error() {
        let err: CliError = quiver_compiler::Error::Compile {
            diagnostics: "src/tools/a.ts:1:1: ERROR".to_string(),
        }
        .into();
        assert!(matches!(err, CliError::Compile(_)));
        assert!(err.to_string().contains("src/tools/a.ts:1:1"));
    }

    #[test]
    fn test_result_ext_with_path() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));

        let err = result.with_path("/project/src/tools").unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(ref p) if p == &PathBuf::from("/project/src/tools")));
    }

    #[test]
    fn test_result_ext_with_path_keeps_other_io_errors() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));

        let err = result.with_path("/project").unwrap_err();
        assert!(matches!(err, CliError::Io(_)));
    }
}
