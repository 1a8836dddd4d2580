//! Command-line interface definition.
//!
//! - `quiver build` - one production compile, then exit
//! - `quiver dev` - compile, watch the tools directory, rebuild and serve

mod commands;
mod tests;

use clap::Parser;

pub use commands::{BuildArgs, Command, DevArgs};

/// quiver - compile a directory of tool handlers into a runnable server
#[derive(Parser, Debug)]
#[command(
    name = "quiver",
    version,
    about = "Compile a directory of tool handlers into a runnable server",
    long_about = "quiver discovers tool handlers under your tools directory, generates the\n\
                  runtime manifest and type declarations, and hands the result to the bundler.\n\
                  In dev mode it keeps watching and rebuilds whenever handlers come or go."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
