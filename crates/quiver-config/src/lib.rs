//! Configuration for the quiver build orchestrator.
//!
//! The compiler never parses configuration itself. It receives a resolved
//! [`QuiverConfig`] and only reads the handler root, the transport flags and the
//! values that end up in the generated runtime configuration.

pub mod config;
pub mod error;
pub mod loading;
pub mod validation;

pub use config::*;
pub use error::*;
pub use loading::{load, ConfigLoader, CONFIG_FILE_NAMES, ENV_PREFIX};
