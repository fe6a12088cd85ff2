//! Run command implementation.
//!
//! Builds the roster from the configuration, runs every round, then prints
//! the summary, the sample estimates and, when enabled, the trend chart.

use std::io::Write;
use std::sync::Arc;

use gavel_agent::Advisor;
use gavel_auction::{AuctionSimulation, SAMPLE_STATES, SimulationConfig};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::CliError;
use crate::output::{OutputFormat, RunOutput};

/// Run command executor.
pub struct RunCommand {
    config: SimulationConfig,
    advisor: Option<Arc<dyn Advisor>>,
}

impl RunCommand {
    /// Create a new run command.
    ///
    /// AI stays off for every agent unless the configuration asks for it and
    /// an advisor is given.
    #[must_use]
    pub fn new(config: SimulationConfig, advisor: Option<Arc<dyn Advisor>>) -> Self {
        Self { config, advisor }
    }

    /// Execute the simulation.
    ///
    /// # Errors
    ///
    /// Returns an error if the simulation cannot be built, is cancelled, or
    /// output fails.
    pub async fn execute<W: Write>(
        self,
        writer: &mut W,
        format: &OutputFormat,
        cancel: &CancellationToken,
    ) -> Result<(), CliError> {
        let ai_enabled = self.config.ai_enabled && self.advisor.is_some();
        let mut simulation = AuctionSimulation::from_config(self.config, self.advisor)?;
        info!(
            participants = simulation.participants().len(),
            ai_enabled, "running simulation"
        );

        simulation.run(cancel).await?;

        let output = RunOutput {
            ai_enabled,
            report: simulation.report(),
            estimates: simulation.sample_estimates(&SAMPLE_STATES)?,
        };
        format.emit(writer, &output)?;

        if !format.is_json() {
            if let Some(visualizer) = simulation.trend_visualizer() {
                writeln!(writer)?;
                visualizer.visualize_bidding_trends(writer)?;
            }
        }
        Ok(())
    }
}
