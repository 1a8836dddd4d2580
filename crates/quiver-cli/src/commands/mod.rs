//! Command implementations.

pub mod build;
pub mod dev;
mod report;
pub mod utils;

pub use build::execute as build_execute;
pub use dev::execute as dev_execute;
