//! CLI error types.

use std::fmt;

use gavel_agent::AgentError;
use gavel_auction::SimulationError;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Invalid configuration.
    Config(String),
    /// Advisory service check failed.
    Advisory(String),
    /// Simulation failed.
    Simulation(SimulationError),
    /// The run was interrupted.
    Cancelled {
        /// Rounds completed before the interrupt.
        completed_rounds: u32,
    },
    /// Output formatting error.
    Format(String),
    /// IO error.
    Io(std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Cancelled { .. } => 130,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Advisory(msg) => write!(f, "advisory error: {msg}"),
            Self::Simulation(e) => write!(f, "simulation error: {e}"),
            Self::Cancelled { completed_rounds } => {
                write!(f, "interrupted after {completed_rounds} rounds")
            }
            Self::Format(msg) => write!(f, "format error: {msg}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Simulation(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<SimulationError> for CliError {
    fn from(err: SimulationError) -> Self {
        match err {
            SimulationError::Cancelled { completed_rounds } => Self::Cancelled { completed_rounds },
            SimulationError::Config(msg) => Self::Config(msg),
            SimulationError::Agent(AgentError::Config(msg)) => Self::Config(msg),
            SimulationError::Io(e) => Self::Io(e),
            other => Self::Simulation(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_error_display_config() {
        let err = CliError::Config("rounds must be positive".into());
        assert_eq!(err.to_string(), "configuration error: rounds must be positive");
    }

    #[test]
    fn cli_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err = CliError::from(io_err);
        assert!(matches!(cli_err, CliError::Io(_)));
    }

    #[test]
    fn cancelled_simulation_maps_to_interrupt() {
        let err = CliError::from(SimulationError::Cancelled {
            completed_rounds: 4,
        });
        assert!(matches!(err, CliError::Cancelled { completed_rounds: 4 }));
        assert_eq!(err.exit_code(), 130);
        assert_eq!(err.to_string(), "interrupted after 4 rounds");
    }

    #[test]
    fn simulation_errors_keep_source() {
        let err = CliError::from(SimulationError::DuplicateName("Agent 1".into()));
        assert_eq!(err.exit_code(), 1);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn config_errors_exit_with_usage_code() {
        let err = CliError::from(SimulationError::Config("bad".into()));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn agent_config_errors_exit_with_usage_code() {
        let err = CliError::from(SimulationError::Agent(AgentError::Config(
            "budget must be a non-negative number".into(),
        )));
        assert!(matches!(err, CliError::Config(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
