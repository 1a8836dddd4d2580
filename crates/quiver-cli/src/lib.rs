//! Library half of the `quiver` binary.
//!
//! Everything the binary does lives here so commands can be driven from
//! integration tests.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result};
