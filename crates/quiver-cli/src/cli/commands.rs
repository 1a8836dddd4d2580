use clap::{Args, Subcommand};
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile once for production and exit
    ///
    /// Scans the tools directory, writes the generated runtime files and runs
    /// the bundler. Any bundler diagnostic fails the command.
    Build(BuildArgs),

    /// Compile, watch and serve for development
    ///
    /// Rebuilds when handlers are added or removed. Compile errors are shown
    /// and the watcher keeps running until you fix them.
    Dev(DevArgs),
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Project root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Explicit configuration file instead of quiver.config.{json,toml}
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DevArgs {
    /// Project root (defaults to the current directory)
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Explicit configuration file instead of quiver.config.{json,toml}
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Serve HTTP on this port, enabling the transport if the config does not
    #[arg(short, long, value_name = "PORT", value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,
}
