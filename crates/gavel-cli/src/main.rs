//! Gavel CLI binary entrypoint.
//!
//! This is the main entry point for the `gavel` command-line tool.

use std::io;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use gavel_cli::cli::{Cli, Commands};
use gavel_cli::commands::{ConfigCommand, ProbeCommand, RunCommand, load_config, resolve_advisor};
use gavel_cli::output::OutputFormat;

fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), gavel_cli::CliError> {
    let format = OutputFormat::new(cli.format);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Run(args) => {
            let config = load_config(cli.config.as_deref(), &args)?;
            let advisor = if config.ai_enabled {
                resolve_advisor(
                    cli.openai_api_key.as_deref(),
                    &cli.model,
                    config.agent.advisory.timeout().max(Duration::from_secs(10)),
                )
                .await
            } else {
                None
            };

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, stopping after the current round");
                    on_interrupt.cancel();
                }
            });

            RunCommand::new(config, advisor)
                .execute(&mut stdout, &format, &cancel)
                .await?;
        }
        Commands::Probe(args) => {
            let cmd = ProbeCommand::new(cli.openai_api_key, cli.model);
            cmd.execute(&mut stdout, &format, Duration::from_millis(args.timeout_ms))
                .await?;
        }
        Commands::Config(args) => {
            let config = load_config(cli.config.as_deref(), &args)?;
            ConfigCommand::new(config).execute(&mut stdout, &format)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_cli::cli::Format;

    #[test]
    fn cli_parses_run() {
        let cli = Cli::parse_from(["gavel", "run"]);
        assert!(matches!(cli.command, Commands::Run(_)));
    }

    #[test]
    fn cli_respects_format_flag() {
        let cli = Cli::parse_from(["gavel", "--format", "json", "config"]);
        assert_eq!(cli.format, Format::Json);
    }

    #[tokio::test]
    async fn run_with_missing_config_file_fails() {
        let cli = Cli::parse_from(["gavel", "--config", "/nonexistent/gavel.toml", "run"]);
        let result = run(cli).await;
        assert!(matches!(result, Err(gavel_cli::CliError::Config(_))));
    }

    #[tokio::test]
    async fn run_without_ai_completes() {
        let cli = Cli::parse_from(["gavel", "run", "--no-ai", "-n", "2", "--rounds", "3"]);
        assert!(run(cli).await.is_ok());
    }
}
