// ============================================================================
// drapto-cli/src/lib.rs
// ============================================================================
//
// LIBRARY COMPONENT: argument definitions and command implementations shared
// between the `drapto` binary (main.rs) and the crate's integration tests.
//
// AI-ASSISTANT-INFO: library component for the CLI binary.

/// Command-line argument structures (clap derive)
pub mod args;

/// Command implementations for each subcommand
pub mod commands;

/// CLI-boundary error/exit-code mapping
pub mod error;

/// Logging setup (stderr-only or stderr+file)
pub mod logging;

/// Terminal UI components and styling
pub mod terminal;

pub use args::{Cli, Commands, EncodeArgs};
pub use commands::encode::run_encode;
