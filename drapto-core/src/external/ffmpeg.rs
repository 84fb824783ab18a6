// ============================================================================
// drapto-core/src/external/ffmpeg.rs
// ============================================================================
//
// FFMPEG PROCESS MANAGEMENT
//
// Trait-based wrapper around `ffmpeg-sidecar` so the segmenter, concatenator,
// muxer, and Dolby-Vision single-pass path can all drive ffmpeg through one
// seam, with a production spawner backed by the real sidecar child process
// and a mock spawner for tests. Mirrors the project's
// `FfmpegProcess`/`FfmpegSpawner` trait split.
//
// AI-ASSISTANT-INFO: ffmpeg-sidecar spawn/event/wait abstraction.

use std::process::ExitStatus;

use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;

use crate::error::{command_failed_error, command_start_error, command_wait_error, Result};

/// A running ffmpeg child process.
pub trait FfmpegProcess {
    fn handle_events<F>(&mut self, handler: F) -> Result<()>
    where
        F: FnMut(FfmpegEvent) -> Result<()>;

    fn wait(&mut self) -> Result<ExitStatus>;
}

/// Spawns ffmpeg commands, producing a `FfmpegProcess`.
pub trait FfmpegSpawner {
    type Process: FfmpegProcess;

    fn spawn(&self, cmd: FfmpegCommand) -> Result<Self::Process>;
}

pub struct SidecarProcess {
    child: ffmpeg_sidecar::child::FfmpegChild,
}

impl FfmpegProcess for SidecarProcess {
    fn handle_events<F>(&mut self, mut handler: F) -> Result<()>
    where
        F: FnMut(FfmpegEvent) -> Result<()>,
    {
        let iterator = self.child.iter().map_err(|e| {
            command_failed_error("ffmpeg", ExitStatus::default(), e.to_string())
        })?;
        for event in iterator {
            handler(event)?;
        }
        Ok(())
    }

    fn wait(&mut self) -> Result<ExitStatus> {
        self.child.wait().map_err(|e| command_wait_error("ffmpeg", e))
    }
}

/// Production spawner backed by the real `ffmpeg-sidecar` child process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SidecarFfmpegSpawner;

impl FfmpegSpawner for SidecarFfmpegSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, mut cmd: FfmpegCommand) -> Result<Self::Process> {
        let child = cmd.spawn().map_err(|e| command_start_error("ffmpeg", e))?;
        Ok(SidecarProcess { child })
    }
}

/// Runs `cmd` to completion, discarding progress events, and returns the
/// exit status. Used by stages (concat, mux) that don't need per-frame
/// progress, only success/failure.
pub fn run_to_completion<S: FfmpegSpawner>(spawner: &S, cmd: FfmpegCommand) -> Result<ExitStatus> {
    let mut process = spawner.spawn(cmd)?;
    process.handle_events(|_event| Ok(()))?;
    process.wait()
}

#[cfg(any(test, feature = "test-mocks"))]
pub mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::os::unix::process::ExitStatusExt;
    use std::rc::Rc;

    #[derive(Clone)]
    pub struct MockFfmpegProcess {
        pub events_to_emit: Rc<RefCell<Vec<FfmpegEvent>>>,
        pub exit_status: ExitStatus,
    }

    impl FfmpegProcess for MockFfmpegProcess {
        fn handle_events<F>(&mut self, mut handler: F) -> Result<()>
        where
            F: FnMut(FfmpegEvent) -> Result<()>,
        {
            let events = self.events_to_emit.borrow().clone();
            for event in events {
                handler(event)?;
            }
            Ok(())
        }

        fn wait(&mut self) -> Result<ExitStatus> {
            Ok(self.exit_status)
        }
    }

    struct Expectation {
        arg_pattern: String,
        result: std::result::Result<MockFfmpegProcess, String>,
    }

    #[derive(Default)]
    pub struct MockFfmpegSpawner {
        expectations: RefCell<Vec<Expectation>>,
        received_calls: RefCell<Vec<Vec<String>>>,
    }

    impl MockFfmpegSpawner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_success(&self, arg_pattern: &str, events: Vec<FfmpegEvent>) {
            self.expectations.borrow_mut().push(Expectation {
                arg_pattern: arg_pattern.to_string(),
                result: Ok(MockFfmpegProcess {
                    events_to_emit: Rc::new(RefCell::new(events)),
                    exit_status: ExitStatus::from_raw(0),
                }),
            });
        }

        pub fn add_exit_failure(&self, arg_pattern: &str, events: Vec<FfmpegEvent>, exit_code: i32) {
            self.expectations.borrow_mut().push(Expectation {
                arg_pattern: arg_pattern.to_string(),
                result: Ok(MockFfmpegProcess {
                    events_to_emit: Rc::new(RefCell::new(events)),
                    exit_status: ExitStatus::from_raw(exit_code << 8),
                }),
            });
        }

        pub fn received_calls(&self) -> Vec<Vec<String>> {
            self.received_calls.borrow().clone()
        }
    }

    impl FfmpegSpawner for MockFfmpegSpawner {
        type Process = MockFfmpegProcess;

        fn spawn(&self, cmd: FfmpegCommand) -> Result<Self::Process> {
            let args: Vec<String> = cmd.get_args().map(|s| s.to_string_lossy().into_owned()).collect();
            self.received_calls.borrow_mut().push(args.clone());
            let mut expectations = self.expectations.borrow_mut();
            let index = expectations
                .iter()
                .position(|exp| args.iter().any(|a| a.contains(&exp.arg_pattern)))
                .unwrap_or_else(|| panic!("MockFfmpegSpawner: no expectation for args {args:?}"));
            let expectation = expectations.remove(index);
            expectation
                .result
                .map_err(|msg| command_start_error("ffmpeg", std::io::Error::other(msg)))
        }
    }
}
