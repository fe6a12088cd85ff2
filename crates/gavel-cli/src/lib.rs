//! # gavel-cli
//!
//! Command-line interface for the gavel auction simulator.
//!
//! Provides commands for:
//! - Running a simulation and printing its summary
//! - Checking the advisory service key and connectivity
//! - Printing the effective configuration
//!
//! The advisory API key is resolved once here, probed, and handed to the
//! simulation as a shared advisor. Without a working key every agent runs
//! locally.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::{Cli, Commands, Format, ProbeArgs, RunArgs};
pub use error::CliError;
pub use output::OutputFormat;
