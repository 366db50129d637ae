//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use untiscal_core::TracingOutputFormat;

/// untiscal - Publish a WebUntis timetable as an iCalendar feed
#[derive(Debug, Parser)]
#[command(name = "untiscal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "UNTISCAL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output formats selectable on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Multi-line, human-readable
    Pretty,
    /// Single-line
    #[default]
    Compact,
    /// Newline-delimited JSON
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Pretty => TracingOutputFormat::Pretty,
            LogFormat::Compact => TracingOutputFormat::Compact,
            LogFormat::Json => TracingOutputFormat::Json,
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the timetable and write the calendar file (default)
    Sync(SyncArgs),

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options of the `sync` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct SyncArgs {
    /// Output file, overriding `calendar.output`
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Print the calendar to stdout instead of writing it
    #[arg(long)]
    pub dry_run: bool,

    /// Read raw lessons from a JSON file instead of WebUntis
    #[arg(long, value_name = "FILE")]
    pub raw_input: Option<PathBuf>,
}

/// Configuration actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (secrets redacted)
    Dump,

    /// Validate the configuration
    Validate,

    /// Show the configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_command_means_sync() {
        let cli = Cli::try_parse_from(["untiscal"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_format, LogFormat::Compact);
    }

    #[test]
    fn sync_flags() {
        let cli = Cli::try_parse_from([
            "untiscal",
            "sync",
            "--dry-run",
            "--raw-input",
            "lessons.json",
            "-o",
            "out.ics",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.log_format, LogFormat::Json);
        let Some(Command::Sync(args)) = cli.command else {
            panic!("expected sync command");
        };
        assert!(args.dry_run);
        assert_eq!(args.raw_input, Some(PathBuf::from("lessons.json")));
        assert_eq!(args.output, Some(PathBuf::from("out.ics")));
    }

    #[test]
    fn config_actions() {
        let cli = Cli::try_parse_from(["untiscal", "config", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Validate
            })
        ));
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        assert!(Cli::try_parse_from(["untiscal", "--log-format", "xml"]).is_err());
    }
}
