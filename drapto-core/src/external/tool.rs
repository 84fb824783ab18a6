// ============================================================================
// drapto-core/src/external/tool.rs
// ============================================================================
//
// GENERIC EXTERNAL-COMMAND EXECUTION
//
// A small trait-based abstraction over `std::process::Command` so every
// caller that just needs "run this, give me stdout/stderr" (the VMAF-guided
// auto-encoder, the concat demuxer, the media-info probe) can be exercised
// against a fake in tests instead of a real subprocess, the same
// dependency-injection shape the project uses for ffmpeg itself.
//
// AI-ASSISTANT-INFO: CommandRunner trait + production and fake implementations.

use std::process::{Command, Output};

use crate::error::{command_failed_error, command_start_error, command_wait_error, Result};

/// Runs an already-built `Command` and returns its captured output, or a
/// `DraptoError::ToolFailed` naming `tool` on spawn failure, wait failure,
/// or non-zero exit.
pub trait CommandRunner: Send + Sync {
    fn run(&self, tool: &str, cmd: &mut Command) -> Result<Output>;
}

/// Production implementation: spawns a real child process and waits on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

impl CommandRunner for SystemCommandRunner {
    fn run(&self, tool: &str, cmd: &mut Command) -> Result<Output> {
        log::debug!("running {tool}: {cmd:?}");
        let child = cmd.spawn().map_err(|e| command_start_error(tool, e))?;
        let output = child.wait_with_output().map_err(|e| command_wait_error(tool, e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(command_failed_error(tool, output.status, stderr));
        }
        Ok(output)
    }
}

#[cfg(any(test, feature = "test-mocks"))]
pub mod fake {
    use super::*;
    use std::cell::RefCell;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;
    use std::sync::Mutex;

    /// A canned result for one expected invocation, matched by substring
    /// against the command's argument list (mirrors `MockFfmpegSpawner`'s
    /// arg-pattern matching).
    pub struct Expectation {
        pub arg_pattern: String,
        pub result: std::result::Result<(ExitStatus, Vec<u8>, Vec<u8>), String>,
        /// Written to disk only once this expectation is matched, so tests
        /// for tiered retry (§4.5) can simulate a tool producing its output
        /// file on one specific attempt rather than it pre-existing before
        /// the call (which would trip the skip-if-exists idempotence check).
        pub write_file: Option<(std::path::PathBuf, Vec<u8>)>,
    }

    #[derive(Default)]
    pub struct FakeCommandRunner {
        expectations: Mutex<RefCell<Vec<Expectation>>>,
        received: Mutex<RefCell<Vec<Vec<String>>>>,
    }

    impl FakeCommandRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn expect_success(&self, arg_pattern: &str, stdout: &str) {
            self.expectations.lock().unwrap().borrow_mut().push(Expectation {
                arg_pattern: arg_pattern.to_string(),
                result: Ok((ExitStatus::from_raw(0), stdout.as_bytes().to_vec(), Vec::new())),
                write_file: None,
            });
        }

        /// Like `expect_success`, but also writes `contents` to `path` at
        /// match time, simulating a tool that produces an output file.
        pub fn expect_success_writing_file(&self, arg_pattern: &str, path: impl Into<std::path::PathBuf>, contents: &[u8]) {
            self.expectations.lock().unwrap().borrow_mut().push(Expectation {
                arg_pattern: arg_pattern.to_string(),
                result: Ok((ExitStatus::from_raw(0), Vec::new(), Vec::new())),
                write_file: Some((path.into(), contents.to_vec())),
            });
        }

        pub fn expect_failure(&self, arg_pattern: &str, exit_code: i32, stderr: &str) {
            self.expectations.lock().unwrap().borrow_mut().push(Expectation {
                arg_pattern: arg_pattern.to_string(),
                result: Ok((ExitStatus::from_raw(exit_code << 8), Vec::new(), stderr.as_bytes().to_vec())),
                write_file: None,
            });
        }

        pub fn received_calls(&self) -> Vec<Vec<String>> {
            self.received.lock().unwrap().borrow().clone()
        }
    }

    impl CommandRunner for FakeCommandRunner {
        fn run(&self, tool: &str, cmd: &mut Command) -> Result<Output> {
            let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
            self.received.lock().unwrap().borrow_mut().push(args.clone());

            let expectations = self.expectations.lock().unwrap();
            let mut expectations = expectations.borrow_mut();
            let index = expectations
                .iter()
                .position(|exp| args.iter().any(|a| a.contains(&exp.arg_pattern)))
                .unwrap_or_else(|| panic!("FakeCommandRunner: no expectation for {tool} args {args:?}"));
            let expectation = expectations.remove(index);

            match expectation.result {
                Ok((status, stdout, stderr)) => {
                    if !status.success() {
                        return Err(command_failed_error(tool, status, String::from_utf8_lossy(&stderr).into_owned()));
                    }
                    if let Some((path, contents)) = &expectation.write_file {
                        std::fs::write(path, contents).expect("fake runner: failed to write expectation file");
                    }
                    Ok(Output { status, stdout, stderr })
                }
                Err(message) => Err(command_start_error(tool, std::io::Error::other(message))),
            }
        }
    }
}
