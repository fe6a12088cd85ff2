//! Error types for gavel-agent.

use thiserror::Error;

use crate::estimator::EstimatorError;

/// Errors surfaced by agent configuration and inspection.
///
/// Per-round failures (bad estimates, advisory timeouts, failed
/// negotiations) are recovered inside the agent and never reach callers.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Agent configuration is invalid.
    #[error("invalid agent configuration: {0}")]
    Config(String),

    /// Estimator error.
    #[error("estimator error: {0}")]
    Estimator(#[from] EstimatorError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::AgentConfig;

    #[test]
    fn estimator_errors_keep_the_source_message() {
        let err: AgentError = EstimatorError::Diverged.into();
        assert_eq!(err.to_string(), "estimator error: estimator parameters diverged");
    }

    #[test]
    fn invalid_budget_is_a_config_error() {
        let config = AgentConfig {
            budget: Some(-1.0),
            ..AgentConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
        assert_eq!(
            err.to_string(),
            "invalid agent configuration: budget must be a non-negative number"
        );
    }
}
