//! untiscal CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error};
use untiscal_core::{TracingConfig, init_tracing};

use untiscal_cli::cli::{Cli, Command, ConfigAction, SyncArgs};
use untiscal_cli::commands;
use untiscal_cli::config::Config;
use untiscal_cli::error::SyncResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let tracing_config = if cli.debug {
        TracingConfig::cli_debug()
    } else {
        TracingConfig::default()
    };
    if let Err(e) = init_tracing(tracing_config.with_format(cli.log_format.into())) {
        eprintln!("warning: {e}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Run failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> SyncResult<()> {
    let config = Config::load(cli.config.as_deref())?;
    debug!(?config, "Loaded configuration");

    match cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
        Some(Command::Sync(args)) => commands::sync::run(&args, &config).await,
        None => commands::sync::run(&SyncArgs::default(), &config).await,
    }
}
