//! ginx: watch a git branch and react to new commits.
//!
//! # Usage
//!
//! ```text
//! ginx [-v] -s <url> [-b <branch>] [-n <seconds>] [--once] [--fail-fast]
//!      [--command-timeout <seconds>] [--workdir <dir>] [--config <file>]
//!      [-l <level>] [--log-format text|json] [-- <command> [args...]]
//! ```
//!
//! Exit codes: 0 on normal completion (including ctrl-c), 1 when the watcher
//! stops on a fatal error, 2 for configuration and usage errors.

mod args;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, CommandFactory, FromArgMatches, Parser};
use tracing::{error, Level};

use args::WatchArgs;
use ginx_core::{ConfigError, RunSummary};
use ginx_engine::logging::{init_tracing, LogFormat};
use ginx_engine::{watch_blocking, EngineError};

const EXIT_FATAL: u8 = 1;
const EXIT_CONFIG: u8 = 2;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "ginx",
    version,
    about = "Watch a git branch and run a command whenever it changes",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    watch: WatchArgs,

    /// Minimum log level; RUST_LOG overrides it.
    #[arg(short = 'l', long, default_value = "info", value_name = "LEVEL")]
    log_level: Level,

    /// Log output format: text or json.
    #[arg(long, default_value_t = LogFormat::Text, value_name = "FORMAT")]
    log_format: LogFormat,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = parse_cli();
    init_tracing(cli.log_level, cli.log_format);

    match run(&cli.watch) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            let (code, operation) = classify(&err);
            error!(fatal = true, operation, error = %format!("{err:#}"), "ginx stopped");
            ExitCode::from(code)
        }
    }
}

/// Parse arguments with `-v/--version` in place of clap's `-V`.
fn parse_cli() -> Cli {
    let matches = Cli::command()
        .disable_version_flag(true)
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .help("Print version")
                .action(ArgAction::Version),
        )
        .get_matches();
    Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit())
}

fn run(args: &WatchArgs) -> Result<RunSummary> {
    let target = args.resolve().context("invalid configuration")?;
    let summary = watch_blocking(target).context("watcher failed")?;
    Ok(summary)
}

/// Exit code and operation label for a failed run.
fn classify(err: &anyhow::Error) -> (u8, &'static str) {
    if err.downcast_ref::<ConfigError>().is_some() {
        return (EXIT_CONFIG, "configure");
    }
    match err.downcast_ref::<EngineError>() {
        Some(engine) => (EXIT_FATAL, engine.operation()),
        None => (EXIT_FATAL, "run"),
    }
}
