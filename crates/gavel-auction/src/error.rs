//! Error types for gavel-auction.

use gavel_agent::AgentError;
use thiserror::Error;

/// Errors that can occur while configuring or running a simulation.
///
/// Round-level problems (invalid bids, failed negotiations, advisory
/// timeouts) are recorded in the round history instead of surfacing here.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Two participants share a name.
    #[error("duplicate participant name: {0}")]
    DuplicateName(String),

    /// The simulation has nobody to run.
    #[error("simulation has no participants")]
    NoParticipants,

    /// The run was cancelled between rounds.
    #[error("simulation cancelled after {completed_rounds} rounds")]
    Cancelled {
        /// Rounds fully resolved before cancellation.
        completed_rounds: u32,
    },

    /// Agent error.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// I/O error while rendering output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
