//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the nimbus binary.

mod commands;
mod limits;

pub use commands::Cli;
pub use limits::run;
