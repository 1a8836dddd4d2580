//! Bundler seam.
//!
//! The pipeline only knows the [`Bundler`] trait. [`ProcessBundler`] drives an
//! external esbuild-compatible executable; tests substitute in-memory fakes.

use crate::context::{BuildContext, Mode};
use crate::generator::ArtifactLayout;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::SystemTime;
use thiserror::Error;

/// Everything a bundler needs for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleConfig {
    pub mode: Mode,
    pub project_root: PathBuf,
    /// The generated import manifest.
    pub entry: PathBuf,
    pub out_dir: PathBuf,
    pub minify: bool,
    pub sourcemap: bool,
    pub env: Vec<(String, String)>,
    /// Executable and leading arguments, from `bundler.command` / `bundler.args`.
    pub command: String,
    pub args: Vec<String>,
}

impl BundleConfig {
    /// Bundler settings for the current context.
    pub fn derive(ctx: &BuildContext, layout: &ArtifactLayout) -> Self {
        let bundler = &ctx.config.bundler;
        Self {
            mode: ctx.mode,
            project_root: ctx.project_root.clone(),
            entry: layout.manifest_path(),
            out_dir: ctx.project_root.join(&bundler.out_dir),
            minify: ctx.mode == Mode::Production,
            sourcemap: ctx.mode == Mode::Development,
            env: vec![("QUIVER_MODE".to_string(), ctx.mode.as_str().to_string())],
            command: bundler.command.clone(),
            args: bundler.args.clone(),
        }
    }
}

/// What a bundler invocation produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleReport {
    pub has_errors: bool,
    pub diagnostics: Option<String>,
    /// Bundler-reported timing, when it has any.
    pub started_at: Option<SystemTime>,
    pub finished_at: Option<SystemTime>,
}

impl BundleReport {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn failure(diagnostics: impl Into<String>) -> Self {
        Self {
            has_errors: true,
            diagnostics: Some(diagnostics.into()),
            ..Self::default()
        }
    }

    /// `finished_at - started_at` in milliseconds, if both are known and ordered.
    pub fn reported_ms(&self) -> Option<u64> {
        let (start, end) = (self.started_at?, self.finished_at?);
        let elapsed = end.duration_since(start).ok()?;
        Some(elapsed.as_millis() as u64)
    }
}

/// The bundler could not run at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct BundlerCrash {
    pub message: String,
}

impl BundlerCrash {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait Bundler: Send + Sync {
    async fn bundle(&self, config: &BundleConfig) -> Result<BundleReport, BundlerCrash>;
}

/// Runs the configured bundler executable.
#[derive(Debug, Clone, Default)]
pub struct ProcessBundler {
    env: Vec<(String, String)>,
}

impl ProcessBundler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra environment for every invocation. [`BundleConfig::env`] is
    /// applied afterwards and wins on conflicts.
    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env = env;
        self
    }

    /// Command-line arguments for one invocation.
    pub fn arguments(config: &BundleConfig) -> Vec<String> {
        let mut args = config.args.clone();
        args.push(config.entry.display().to_string());
        args.extend([
            "--bundle".to_string(),
            "--platform=node".to_string(),
            "--format=esm".to_string(),
            format!("--outdir={}", config.out_dir.display()),
        ]);
        if config.minify {
            args.push("--minify".to_string());
        }
        if config.sourcemap {
            args.push("--sourcemap".to_string());
        }
        args
    }
}

#[async_trait]
impl Bundler for ProcessBundler {
    async fn bundle(&self, config: &BundleConfig) -> Result<BundleReport, BundlerCrash> {
        let args = Self::arguments(config);
        tracing::debug!(command = %config.command, ?args, "running bundler");

        let output = tokio::process::Command::new(&config.command)
            .args(&args)
            .current_dir(&config.project_root)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .envs(config.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => BundlerCrash::new(format!(
                    "bundler '{}' not found; install it or set bundler.command",
                    config.command
                )),
                _ => BundlerCrash::new(format!("failed to run '{}': {}", config.command, e)),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if output.status.success() {
            if !stderr.is_empty() {
                tracing::debug!("bundler output: {}", stderr);
            }
            return Ok(BundleReport::success());
        }

        let diagnostics = match (stderr.is_empty(), stdout.is_empty()) {
            (false, _) => stderr,
            (true, false) => stdout,
            (true, true) => format!("'{}' exited with {}", config.command, output.status),
        };
        Ok(BundleReport::failure(diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiver_config::QuiverConfig;
    use std::sync::Arc;
    use std::time::Duration;

    fn config(mode: Mode) -> BundleConfig {
        let ctx = BuildContext::new(mode, "/project", Arc::new(QuiverConfig::default()));
        BundleConfig::derive(&ctx, &ArtifactLayout::new("/project"))
    }

    #[test]
    fn test_derive_development() {
        let config = config(Mode::Development);
        assert_eq!(config.entry, PathBuf::from("/project/.quiver/import-map.js"));
        assert_eq!(config.out_dir, PathBuf::from("/project/dist"));
        assert!(config.sourcemap);
        assert!(!config.minify);
        assert_eq!(
            config.env,
            vec![("QUIVER_MODE".to_string(), "development".to_string())]
        );
    }

    #[test]
    fn test_derive_production_minifies() {
        let config = config(Mode::Production);
        assert!(config.minify);
        assert!(!config.sourcemap);
    }

    #[test]
    fn test_process_arguments() {
        let mut config = config(Mode::Production);
        config.args = vec!["--log-level=warning".to_string()];

        assert_eq!(
            ProcessBundler::arguments(&config),
            vec![
                "--log-level=warning",
                "/project/.quiver/import-map.js",
                "--bundle",
                "--platform=node",
                "--format=esm",
                "--outdir=/project/dist",
                "--minify",
            ]
        );
    }

    #[test]
    fn test_reported_ms() {
        let start = SystemTime::UNIX_EPOCH + Duration::from_secs(10);
        let report = BundleReport {
            started_at: Some(start),
            finished_at: Some(start + Duration::from_millis(250)),
            ..BundleReport::default()
        };
        assert_eq!(report.reported_ms(), Some(250));

        assert_eq!(BundleReport::success().reported_ms(), None);

        let backwards = BundleReport {
            started_at: Some(start),
            finished_at: Some(start - Duration::from_millis(1)),
            ..BundleReport::default()
        };
        assert_eq!(backwards.reported_ms(), None);
    }

    #[tokio::test]
    async fn test_missing_executable_is_crash() {
        let mut config = config(Mode::Production);
        config.command = "quiver-definitely-missing-bundler".to_string();
        config.project_root = std::env::temp_dir();

        let err = ProcessBundler::new().bundle(&config).await.unwrap_err();
        assert!(err.message.contains("not found"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_extra_env_reaches_bundler() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = config(Mode::Development);
        config.project_root = temp.path().to_path_buf();
        config.command = "sh".to_string();
        config.args = vec![
            "-c".to_string(),
            "printf '%s:%s' \"$DATABASE_URL\" \"$QUIVER_MODE\" > env.txt".to_string(),
        ];

        let bundler = ProcessBundler::new().with_env(vec![
            ("DATABASE_URL".to_string(), "postgres://local".to_string()),
            ("QUIVER_MODE".to_string(), "ignored".to_string()),
        ]);
        let report = bundler.bundle(&config).await.unwrap();
        assert!(!report.has_errors);

        let written = std::fs::read_to_string(temp.path().join("env.txt")).unwrap();
        assert_eq!(written, "postgres://local:development");
    }
}
