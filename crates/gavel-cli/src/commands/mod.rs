//! CLI command implementations.
//!
//! Each submodule implements a specific CLI command:
//! - [`run`] - Run a simulation
//! - [`probe`] - Advisory service check
//! - [`config`] - Effective configuration

pub mod config;
pub mod probe;
pub mod run;

pub use config::{ConfigCommand, load_config};
pub use probe::{ProbeCommand, resolve_advisor};
pub use run::RunCommand;
