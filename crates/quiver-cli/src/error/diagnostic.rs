//! Conversion from CLI errors to miette reports.

use crate::error::CliError;
use miette::Report;
use quiver_compiler::Error as CompileError;
use quiver_config::ConfigError;

/// Convert a [`CliError`] into a miette report with a hint where one helps.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Config(e) => config_error_to_miette(e),
        CliError::Compile(e) => compile_error_to_miette(e),
        CliError::Dotenv(e) => miette::miette!(
            "Failed to load .env: {}\n\nHint: Each line must be KEY=value; quote values with spaces",
            e
        ),
        other => miette::miette!("{}", other),
    }
}

fn config_error_to_miette(err: ConfigError) -> Report {
    match err {
        ConfigError::NotFound(path) => miette::miette!(
            "Config file not found: {}\n\nHint: Check the path passed to --config",
            path.display()
        ),
        ConfigError::InvalidValue { field, value, hint } => {
            miette::miette!("Invalid value for '{}': {}\n\nHint: {}", field, value, hint)
        }
        other => miette::miette!("Configuration error: {}", other),
    }
}

fn compile_error_to_miette(err: CompileError) -> Report {
    match err {
        CompileError::WatchSetup { path, reason } => miette::miette!(
            "Cannot watch {}: {}\n\nHint: Create the directory or set paths.tools in quiver.config.json",
            path.display(),
            reason
        ),
        CompileError::Compile { diagnostics } => {
            miette::miette!("Compilation failed\n\n{}", diagnostics.trim_end())
        }
        CompileError::Fatal(cause) => miette::miette!(
            "Bundler failed: {}\n\nHint: Check bundler.command in your configuration",
            cause
        ),
        other => miette::miette!("{}", other),
    }
}
