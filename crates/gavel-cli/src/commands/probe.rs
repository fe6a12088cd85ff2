//! Probe command implementation.
//!
//! Checks the advisory key and connectivity before any simulation relies on
//! them.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use gavel_agent::{Advisor, OpenAiAdvisor};
use tracing::{info, warn};

use crate::error::CliError;
use crate::output::{OutputFormat, ProbeResult};

/// Build an advisor from the key and check that it answers.
///
/// Returns `None`, and logs why, when no key is configured or the probe
/// fails; callers then run every agent without AI.
pub async fn resolve_advisor(
    api_key: Option<&str>,
    model: &str,
    deadline: Duration,
) -> Option<Arc<dyn Advisor>> {
    let Some(key) = api_key.filter(|k| !k.trim().is_empty()) else {
        info!("no advisory API key found, AI-enhanced bidding disabled");
        return None;
    };
    let advisor = match OpenAiAdvisor::new(key, model, deadline) {
        Ok(advisor) => advisor,
        Err(e) => {
            warn!(error = %e, "advisory client unavailable, AI-enhanced bidding disabled");
            return None;
        }
    };
    match advisor.probe(deadline).await {
        Ok(()) => Some(Arc::new(advisor)),
        Err(e) => {
            warn!(error = %e, model, "advisory probe failed, AI-enhanced bidding disabled");
            None
        }
    }
}

/// Probe command executor.
pub struct ProbeCommand {
    api_key: Option<String>,
    model: String,
}

impl ProbeCommand {
    /// Create a new probe command.
    #[must_use]
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
        }
    }

    /// Execute the probe.
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable or output fails.
    pub async fn execute<W: Write>(
        &self,
        writer: &mut W,
        format: &OutputFormat,
        timeout: Duration,
    ) -> Result<(), CliError> {
        let outcome = self.check(timeout).await;
        let result = ProbeResult {
            model: self.model.clone(),
            reachable: outcome.is_ok(),
            message: match &outcome {
                Ok(()) => "advisory service reachable".to_string(),
                Err(e) => e.clone(),
            },
        };
        format.emit(writer, &result)?;
        outcome.map_err(CliError::Advisory)
    }

    async fn check(&self, timeout: Duration) -> Result<(), String> {
        let key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| "no API key found (set OPENAI_API_KEY)".to_string())?;
        let advisor =
            OpenAiAdvisor::new(key, self.model.clone(), timeout).map_err(|e| e.to_string())?;
        advisor.probe(timeout).await.map_err(|e| e.to_string())
    }
}
