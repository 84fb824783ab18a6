// ============================================================================
// drapto-cli/src/error.rs
// ============================================================================
//
// CLI ERROR HANDLING: maps a `DraptoError` from the core pipeline onto the
// process exit code the rest of the crate's error taxonomy defines (§6/§7).
// `anyhow` is used only at this boundary, for the top-level `main` signature
// and its `Context` on I/O-adjacent setup steps; the core library itself
// never depends on it.
//
// AI-ASSISTANT-INFO: CLI exit-code mapping.

use drapto_core::DraptoError;

/// Exit code for a successful run.
pub const EXIT_SUCCESS: i32 = 0;

/// Maps a failed job's error onto the process exit code (§7): 2 for
/// invalid input/stream, 1 for any other failure kind.
pub fn exit_code_for_error(err: &DraptoError) -> i32 {
    drapto_core::exit_code_for(err)
}
