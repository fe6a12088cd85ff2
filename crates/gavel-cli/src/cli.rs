//! Command-line argument parsing with clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use gavel_agent::openai::DEFAULT_MODEL;
use gavel_auction::SimulationConfig;

/// Gavel - learning agents in repeated sealed-bid auctions.
#[derive(Parser, Debug, Clone)]
#[command(name = "gavel")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file; flags override its values.
    #[arg(short, long, env = "GAVEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// API key for the advisory service. Without it AI is disabled.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Advisory model name.
    #[arg(long, env = "GAVEL_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run a simulation.
    Run(RunArgs),

    /// Check that the advisory service is reachable with the given key.
    Probe(ProbeArgs),

    /// Print the effective configuration.
    Config(RunArgs),
}

/// Arguments for `gavel run`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Number of bidding agents.
    #[arg(short = 'n', long)]
    pub agents: Option<usize>,

    /// Number of negotiating agents.
    #[arg(long)]
    pub negotiators: Option<usize>,

    /// Number of rounds.
    #[arg(short, long)]
    pub rounds: Option<u32>,

    /// Run seed.
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Render bidding trends after the run.
    #[arg(long)]
    pub visualize: bool,

    /// Never consult the advisory service.
    #[arg(long)]
    pub no_ai: bool,

    /// Deadline for one advisory call in milliseconds.
    #[arg(long)]
    pub advisory_timeout_ms: Option<u64>,
}

impl RunArgs {
    /// Apply flag overrides on top of a loaded configuration.
    ///
    /// AI is requested unless `--no-ai` is given; it is only switched on for
    /// agents once an advisor has been resolved.
    pub fn apply(&self, config: &mut SimulationConfig) {
        if let Some(agents) = self.agents {
            config.agents = agents;
        }
        if let Some(negotiators) = self.negotiators {
            config.negotiators = negotiators;
        }
        if let Some(rounds) = self.rounds {
            config.rounds = rounds;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.visualize {
            config.visualize = true;
        }
        if let Some(timeout_ms) = self.advisory_timeout_ms {
            config.agent.advisory.timeout_ms = timeout_ms;
        }
        config.ai_enabled = !self.no_ai;
    }
}

/// Arguments for `gavel probe`.
#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Deadline for the probe request in milliseconds.
    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,
}
