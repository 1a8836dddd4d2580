//! Shared helpers for command implementations.

use crate::error::{CliError, Result, ResultExt};
use quiver_config::{ConfigLoader, QuiverConfig};
use std::path::{Path, PathBuf};

/// Resolve `path` against `cwd` unless it is already absolute.
pub fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

pub fn get_cwd() -> Result<PathBuf> {
    std::env::current_dir().map_err(CliError::from)
}

/// Resolve the project root from `--cwd` or the current directory.
///
/// The result is canonical so paths reported by the file watcher compare equal
/// to the discovered handler paths.
///
/// # Errors
///
/// [`CliError::FileNotFound`] when the directory does not exist and
/// [`CliError::InvalidArgument`] when it is not a directory.
pub fn resolve_project_root(explicit_cwd: Option<&Path>) -> Result<PathBuf> {
    let cwd = get_cwd()?;
    let root = match explicit_cwd {
        Some(dir) => resolve_path(dir, &cwd),
        None => cwd,
    };

    let root = root.canonicalize().with_path(&root)?;
    if !root.is_dir() {
        return Err(CliError::InvalidArgument(format!(
            "Project root is not a directory: {}",
            root.display()
        )));
    }
    Ok(root)
}

/// Load and validate the configuration for `root`.
///
/// An explicit `file` is resolved against the current directory; otherwise
/// `quiver.config.{json,toml}` is discovered in the root. `QUIVER_*`
/// environment variables apply on top either way.
pub fn load_config(root: &Path, file: Option<&Path>) -> Result<QuiverConfig> {
    let mut loader = ConfigLoader::new(root);
    if let Some(file) = file {
        loader = loader.with_file(resolve_path(file, &get_cwd()?));
    }
    let config = loader.load()?;
    config.validate()?;
    Ok(config)
}

/// Variables from the project's `.env`, for the bundler and the runtime.
///
/// A missing file yields nothing. Keys already set in the process environment
/// are left out so the shell keeps precedence.
pub fn load_dotenv(root: &Path) -> Result<Vec<(String, String)>> {
    let path = root.join(".env");
    let entries = match dotenvy::from_path_iter(&path) {
        Ok(entries) => entries,
        Err(e) if e.not_found() => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut vars = Vec::new();
    for entry in entries {
        let (key, value) = entry?;
        if std::env::var_os(&key).is_none() {
            vars.push((key, value));
        }
    }
    tracing::debug!(path = %path.display(), count = vars.len(), "loaded .env");
    Ok(vars)
}
