//! Error taxonomy for the compile pipeline.
//!
//! Only [`Error::Compile`] can be recovered from, and only in development
//! mode. Everything else ends the run.

use crate::context::Mode;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The watched root is missing or unreadable, or the OS watcher failed to attach.
    #[error("cannot watch {}: {reason}", .path.display())]
    WatchSetup { path: PathBuf, reason: String },

    /// A generated artifact could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    GenerationIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The bundler reported diagnostics.
    #[error("compilation failed\n{diagnostics}")]
    Compile { diagnostics: String },

    /// The bundler crashed or could not be started.
    #[error("fatal build error: {0}")]
    Fatal(String),

    /// The first-build hook or the listener failed to start.
    #[error("failed to start server: {0}")]
    Listener(String),
}

impl Error {
    pub(crate) fn watch_setup(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::WatchSetup {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn generation_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::GenerationIo {
            path: path.into(),
            source,
        }
    }

    /// Whether the run may continue after this error in the given mode.
    pub fn is_recoverable(&self, mode: Mode) -> bool {
        matches!(self, Error::Compile { .. }) && mode == Mode::Development
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_compile_errors_recover_in_development() {
        let compile = Error::Compile {
            diagnostics: "x".to_string(),
        };
        assert!(compile.is_recoverable(Mode::Development));
        assert!(!compile.is_recoverable(Mode::Production));

        let fatal = Error::Fatal("crash".to_string());
        assert!(!fatal.is_recoverable(Mode::Development));

        let io = Error::generation_io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!io.is_recoverable(Mode::Development));
    }

    #[test]
    fn test_watch_setup_message_names_path() {
        let err = Error::watch_setup("/project/src/tools", "No such file or directory");
        let msg = err.to_string();
        assert!(msg.contains("/project/src/tools"));
        assert!(msg.contains("No such file"));
    }
}
