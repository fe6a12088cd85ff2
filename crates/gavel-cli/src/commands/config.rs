//! Config command implementation.

use std::io::Write;
use std::path::Path;

use gavel_auction::SimulationConfig;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::{ConfigDump, OutputFormat};

/// Load the configuration file, if any, and apply flag overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the result is invalid.
pub fn load_config(path: Option<&Path>, args: &RunArgs) -> Result<SimulationConfig, CliError> {
    let mut config = match path {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::default(),
    };
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Config command executor.
pub struct ConfigCommand {
    config: SimulationConfig,
}

impl ConfigCommand {
    /// Create a new config command.
    #[must_use]
    pub const fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Print the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if formatting or writing fails.
    pub fn execute<W: Write>(self, writer: &mut W, format: &OutputFormat) -> Result<(), CliError> {
        format.emit(writer, &ConfigDump(self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Format;

    #[test]
    fn defaults_without_file() {
        let config = load_config(None, &RunArgs::default()).unwrap();
        assert_eq!(config.agents, 5);
        assert!(config.ai_enabled);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = load_config(Some(Path::new("/nonexistent/gavel.toml")), &RunArgs::default())
            .unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn flags_are_validated() {
        let args = RunArgs {
            agents: Some(0),
            ..RunArgs::default()
        };
        assert!(matches!(load_config(None, &args), Err(CliError::Config(_))));
    }

    #[test]
    fn zero_rounds_flag_is_config_error() {
        let args = RunArgs {
            rounds: Some(0),
            ..RunArgs::default()
        };
        let err = load_config(None, &args).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn json_dump() {
        let mut out = Vec::new();
        ConfigCommand::new(SimulationConfig::default())
            .execute(&mut out, &OutputFormat::new(Format::Json))
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["rounds"], 50);
        assert_eq!(value["market"]["policy"]["kind"], "random_walk");
    }
}
