// ============================================================================
// drapto-cli/src/main.rs
// ============================================================================
//
// MAIN ENTRY POINT
//
// Parses arguments, sets up logging, installs the SIGINT/SIGTERM handler
// that drives the orchestrator's cooperative cancellation, dispatches to the
// `encode` command, and maps the result onto the process exit code (§6/§7).
//
// AI-ASSISTANT-INFO: entry point, signal handling, logging setup, and
// exit-code mapping.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;

use drapto_cli::error::{exit_code_for_error, EXIT_SUCCESS};
use drapto_cli::{logging, terminal, Cli, Commands};
use drapto_core::CancellationToken;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    terminal::set_color(!cli.no_color);
    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    logging::setup_stderr_logging(level);

    let cancel = CancellationToken::new();
    let cancel_for_handler = cancel.clone();
    ctrlc::set_handler(move || {
        log::warn!("received interrupt, finishing the current stage and tearing down");
        cancel_for_handler.cancel();
    })
    .context("failed to install signal handler")?;

    match cli.command {
        Commands::Encode(args) => match drapto_cli::run_encode(args, &cancel) {
            Ok(_job) => Ok(ExitCode::from(EXIT_SUCCESS as u8)),
            Err(err) => Ok(ExitCode::from(exit_code_for_error(&err) as u8)),
        },
    }
}
