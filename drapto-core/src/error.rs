// ============================================================================
// drapto-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Custom Error Types and Result Definitions
//
// This module defines the error taxonomy used across the encoding pipeline.
// Each variant names a *kind* of failure rather than a specific call site, so
// callers (the orchestrator, the retry escalator, the CLI) can match on kind
// without caring which external tool produced it.
//
// AI-ASSISTANT-INFO: Error handling infrastructure for the drapto-core library

use std::io;
use std::process::ExitStatus;

use thiserror::Error;

/// The specific way an external command invocation failed.
#[derive(Debug)]
pub enum CommandErrorKind {
    /// The process could not even be spawned (binary missing, permissions, ...).
    Start(io::Error),

    /// The process was spawned but waiting on it failed.
    Wait(io::Error),

    /// The process ran to completion but returned a non-zero exit status.
    Failed(ExitStatus, String),
}

/// An error raised while invoking an external tool (ffmpeg, ffprobe, the
/// VMAF-guided auto-encoder, the media-info probe, ...).
#[derive(Debug)]
pub struct CommandError {
    /// Name of the tool that failed, e.g. "ffprobe".
    pub command: String,
    pub kind: CommandErrorKind,
}

fn format_command_error(err: &CommandError) -> String {
    match &err.kind {
        CommandErrorKind::Start(io_err) => {
            format!("failed to start {}: {io_err}", err.command)
        }
        CommandErrorKind::Wait(io_err) => {
            format!("failed waiting for {}: {io_err}", err.command)
        }
        CommandErrorKind::Failed(status, stderr) => {
            format!(
                "{} exited with {status}: {stderr}",
                err.command,
            )
        }
    }
}

/// Error taxonomy for the chunked encoding pipeline.
///
/// Variants name the *kind* of failure per the project's error design: a
/// `ToolFailed` inside the chunk encoder is absorbed by the retry escalator
/// and only promoted to `EncodeRetriesExhausted` once every tier is spent.
#[derive(Error, Debug)]
pub enum DraptoError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid stream: {0}")]
    InvalidStream(String),

    #[error("insufficient resources: {0}")]
    InsufficientResources(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("{}", format_command_error(.0))]
    ToolFailed(CommandError),

    #[error("segmentation failed: {0}")]
    SegmentationFailed(String),

    #[error("segment {segment} exhausted all retry tiers: {reason}")]
    EncodeRetriesExhausted { segment: String, reason: String },

    #[error("concatenation failed: {0}")]
    ConcatFailed(String),

    #[error("audio encode failed: {0}")]
    AudioEncodeFailed(String),

    #[error("mux failed: {0}")]
    MuxFailed(String),

    #[error("output validation failed: {0}")]
    OutputValidationFailed(String),

    #[error("state I/O error: {0}")]
    StateIOError(String),

    #[error("cancelled")]
    Cancelled,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DraptoError>;

/// Backward-compatible aliases matching the naming the rest of the crate
/// (and its tests) use for the error type and result alias.
pub type CoreError = DraptoError;
pub type CoreResult<T> = Result<T>;

pub fn command_start_error(command: impl Into<String>, error: io::Error) -> DraptoError {
    DraptoError::ToolFailed(CommandError {
        command: command.into(),
        kind: CommandErrorKind::Start(error),
    })
}

pub fn command_wait_error(command: impl Into<String>, error: io::Error) -> DraptoError {
    DraptoError::ToolFailed(CommandError {
        command: command.into(),
        kind: CommandErrorKind::Wait(error),
    })
}

pub fn command_failed_error(
    command: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> DraptoError {
    DraptoError::ToolFailed(CommandError {
        command: command.into(),
        kind: CommandErrorKind::Failed(status, stderr.into()),
    })
}

/// Categorizes an error into one of the three process exit codes the CLI
/// defines: 0 success (not representable here), 1 generic failure, 2
/// invalid arguments/paths.
pub fn exit_code_for(err: &DraptoError) -> i32 {
    match err {
        DraptoError::InvalidInput(_) | DraptoError::InvalidStream(_) => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_invalid_input_is_two() {
        assert_eq!(exit_code_for(&DraptoError::InvalidInput("x".into())), 2);
    }

    #[test]
    fn exit_code_generic_failure_is_one() {
        assert_eq!(exit_code_for(&DraptoError::ConcatFailed("x".into())), 1);
    }

    #[test]
    fn command_error_display_includes_stderr() {
        use std::os::unix::process::ExitStatusExt;
        let err = command_failed_error("ffprobe", ExitStatus::from_raw(256), "boom");
        assert!(err.to_string().contains("boom"));
        assert!(err.to_string().contains("ffprobe"));
    }
}
