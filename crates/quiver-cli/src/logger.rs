//! Logging setup for the quiver CLI.
//!
//! `--verbose` turns on debug output for the quiver crates, `--quiet` keeps
//! errors only, and otherwise `RUST_LOG` wins over the info default.
//!
//! ```rust,no_run
//! use quiver_cli::logger::init_logger;
//!
//! init_logger(false, false, false);
//! tracing::info!("watching handlers");
//! ```

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERBOSE_FILTER: &str = "quiver_cli=debug,quiver_compiler=debug,quiver_config=debug";
const QUIET_FILTER: &str = "quiver_cli=error,quiver_compiler=error,quiver_config=error";
const DEFAULT_FILTER: &str = "quiver_cli=info,quiver_compiler=info,quiver_config=info";

/// Install the global tracing subscriber. Call once, before any logging.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    init_logger_with_filter(filter_for(verbose, quiet), no_color);
}

/// Install the global tracing subscriber with an explicit filter.
pub fn init_logger_with_filter(filter: EnvFilter, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}
