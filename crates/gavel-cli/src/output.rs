//! Rendering of command results.
//!
//! Every result is `Serialize` for `--format json` and implements
//! [`TextReport`] for the default text layout.

use std::io::Write;

use gavel_agent::ParticipantKind;
use gavel_auction::{EstimateSample, RunReport, SimulationConfig};
use serde::Serialize;

use crate::cli::Format;
use crate::error::CliError;

/// Output format chosen with `--format`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFormat(Format);

impl OutputFormat {
    /// Wrap a parsed `--format` value.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self(format)
    }

    /// True for `--format json`. Extra text sections such as the trend
    /// chart are skipped in JSON mode.
    #[must_use]
    pub const fn is_json(&self) -> bool {
        matches!(self.0, Format::Json)
    }

    /// Emit a command result in the selected format.
    pub fn emit<W, T>(&self, out: &mut W, result: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TextReport,
    {
        if self.is_json() {
            serde_json::to_writer_pretty(&mut *out, result)
                .map_err(|e| CliError::Format(format!("cannot encode result as JSON: {e}")))?;
            writeln!(out)?;
        } else {
            result.render_text(out)?;
        }
        Ok(())
    }

    /// Render a command result into a string.
    pub fn render<T>(&self, result: &T) -> Result<String, CliError>
    where
        T: Serialize + TextReport,
    {
        let mut buf = Vec::new();
        self.emit(&mut buf, result)?;
        String::from_utf8(buf).map_err(|e| CliError::Format(format!("output is not UTF-8: {e}")))
    }
}

/// Text layout of a command result.
pub trait TextReport {
    /// Write the result for a terminal.
    fn render_text(&self, out: &mut dyn Write) -> Result<(), CliError>;
}

/// Result of `gavel run`.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    /// Whether agents consulted the advisory service.
    pub ai_enabled: bool,
    /// Summary and run metadata.
    pub report: RunReport,
    /// Estimator outputs for the diagnostic states.
    pub estimates: Vec<EstimateSample>,
}

impl TextReport for RunOutput {
    fn render_text(&self, writer: &mut dyn Write) -> Result<(), CliError> {
        let summary = &self.report.summary;

        writeln!(writer, "Simulation Summary")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Run ID:           {}", self.report.run_id)?;
        writeln!(writer, "Seed:             {}", self.report.seed)?;
        writeln!(
            writer,
            "AI advisory:      {}",
            if self.ai_enabled { "enabled" } else { "disabled" }
        )?;
        writeln!(writer)?;
        writeln!(writer, "Rounds")?;
        writeln!(writer, "  Played:         {}", summary.rounds)?;
        writeln!(writer, "  With winner:    {}", summary.resolved_rounds)?;
        writeln!(writer, "  No valid bids:  {}", summary.rounds_without_winner)?;
        writeln!(writer, "  Avg bid:        {}", fmt_opt(summary.average_bid))?;
        writeln!(
            writer,
            "  Avg clearing:   {}",
            fmt_opt(summary.average_clearing_price)
        )?;
        writeln!(writer)?;

        writeln!(
            writer,
            "{:<16}  {:<10}  {:>5}  {:>10}  {:>9}  {:>10}  {:>8}",
            "AGENT", "KIND", "WINS", "SPEND", "AVG BID", "REWARD", "TREND"
        )?;
        writeln!(writer, "{}", "─".repeat(82))?;
        for agent in &summary.agents {
            let kind = match agent.kind {
                ParticipantKind::Bidder => "bidder",
                ParticipantKind::Negotiator => "negotiator",
            };
            writeln!(
                writer,
                "{:<16}  {:<10}  {:>5}  {:>10.2}  {:>9}  {:>10.2}  {:>+8.3}",
                truncate(&agent.name, 16),
                kind,
                agent.wins,
                agent.total_spend,
                fmt_opt(agent.average_bid),
                agent.total_reward,
                agent.reward_trend
            )?;
        }

        if !self.estimates.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "Sample estimates (price, remaining)")?;
            for sample in &self.estimates {
                let values: Vec<String> = sample
                    .states
                    .iter()
                    .zip(&sample.estimates)
                    .map(|(state, value)| {
                        format!("({:.0}, {:.0}) {value:+.4}", state.price, state.remaining)
                    })
                    .collect();
                writeln!(
                    writer,
                    "  {:<16}  {}",
                    truncate(&sample.agent, 16),
                    values.join("  ")
                )?;
            }
        }
        Ok(())
    }
}

/// Result of `gavel probe`.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    /// Model that was probed.
    pub model: String,
    /// Whether the service answered.
    pub reachable: bool,
    /// Human-readable detail.
    pub message: String,
}

impl TextReport for ProbeResult {
    fn render_text(&self, writer: &mut dyn Write) -> Result<(), CliError> {
        let mark = if self.reachable { "ok" } else { "FAILED" };
        writeln!(writer, "Advisory probe ({}): {mark}", self.model)?;
        writeln!(writer, "  {}", self.message)?;
        Ok(())
    }
}

/// Effective configuration for `gavel config`.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct ConfigDump(pub SimulationConfig);

impl TextReport for ConfigDump {
    fn render_text(&self, writer: &mut dyn Write) -> Result<(), CliError> {
        let text = toml::to_string_pretty(&self.0)
            .map_err(|e| CliError::Format(format!("TOML serialization failed: {e}")))?;
        write!(writer, "{text}")?;
        Ok(())
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

/// Shorten a name to `max_len` characters for a fixed-width column.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}
