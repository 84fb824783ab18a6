// ============================================================================
// drapto-core/src/chunk/pool.rs
// ============================================================================
//
// WORKER POOL (§4.5, §5, §9)
//
// Dispatches segment encodes across a bounded pool of workers with a
// soon-fail policy: once any segment exhausts its retries, newly dequeued
// segments are not started, but segments already in flight are allowed to
// finish and their results recorded. Grounded in
// `encoding/parallel.rs::ParallelEncoder::encode_segments` (rayon-scoped
// thread pool sized to a configurable job count, per-segment try_for_each).
// Per DESIGN.md's open-question resolution, "the parallel dispatcher is
// unavailable" is modeled as `rayon::ThreadPoolBuilder::build()` failing,
// in which case the controller falls back to sequential iteration on the
// calling thread with identical per-segment semantics.
//
// AI-ASSISTANT-INFO: soon-fail dispatch, in-process fallback, no external
// OS-level dispatch helper.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use crate::chunk::encoder::encode_segment;
use crate::config::JobOptions;
use crate::error::Result;
use crate::external::tool::CommandRunner;
use crate::state::Segment;
use crate::types::EncodingContext;

/// Builds the `EncodingContext` for one segment from the job-level context,
/// pointing input/output at the segment's own paths.
pub fn context_for_segment(job_context: &EncodingContext, segment: &Segment) -> EncodingContext {
    EncodingContext {
        input_path: segment.input_path.clone(),
        output_path: segment.output_path.clone(),
        ..job_context.clone()
    }
}

/// Runs the chunk encoder over every segment, honoring the soon-fail policy:
/// once any segment's `encode_segment` call returns an error, workers stop
/// picking up new segments but the ones already running are left to finish.
/// Returns `Err` if any segment ultimately failed, `Ok(())` if all completed.
pub fn run<R>(
    runner: &R,
    segments: &mut [Segment],
    job_context: &EncodingContext,
    options: &JobOptions,
    worker_count: usize,
) -> Result<()>
where
    R: CommandRunner,
{
    let failed = AtomicBool::new(false);

    let pool = rayon::ThreadPoolBuilder::new().num_threads(worker_count.max(1)).build();

    match pool {
        Ok(pool) => {
            info!("dispatching {} segments across {worker_count} workers", segments.len());
            pool.install(|| dispatch(runner, segments, job_context, options, &failed));
        }
        Err(err) => {
            warn!("parallel dispatcher unavailable ({err}), falling back to sequential execution");
            dispatch(runner, segments, job_context, options, &failed);
        }
    }

    if failed.load(Ordering::SeqCst) {
        Err(crate::error::DraptoError::EncodeRetriesExhausted {
            segment: "one or more".into(),
            reason: "at least one segment exhausted all retry tiers".into(),
        })
    } else {
        Ok(())
    }
}

fn dispatch<R>(runner: &R, segments: &mut [Segment], job_context: &EncodingContext, options: &JobOptions, failed: &AtomicBool)
where
    R: CommandRunner,
{
    use rayon::prelude::*;

    segments.par_iter_mut().for_each(|segment| {
        if failed.load(Ordering::SeqCst) {
            // Soon-fail: do not start newly dequeued segments once another
            // has exhausted its retries. Already-running segments reach
            // this closure only once, so this check only ever skips work
            // that hadn't begun yet.
            return;
        }
        let context = context_for_segment(job_context, segment);
        if encode_segment(runner, segment, &context, options).is_err() {
            failed.store(true, Ordering::SeqCst);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::tool::fake::FakeCommandRunner;
    use crate::state::{Progress, SegmentStatus};

    fn sample_segment(dir: &std::path::Path, index: u32) -> Segment {
        Segment {
            index,
            input_path: dir.join(format!("{index:04}.mkv")),
            output_path: dir.join(format!("encoded-{index:04}.mkv")),
            status: SegmentStatus::Pending,
            start_time: index as f64 * 15.0,
            duration: 15.0,
            total_frames: 360,
            progress: Progress::default(),
            strategies_tried: Vec::new(),
            last_strategy: None,
            error: None,
        }
    }

    fn sample_context(dir: &std::path::Path) -> EncodingContext {
        EncodingContext {
            input_path: dir.to_path_buf(),
            output_path: dir.to_path_buf(),
            target_vmaf: 93.0,
            preset: 6,
            svt_params: "tune=0:film-grain=0".into(),
            crop_filter: None,
            hw_accel: None,
            temp_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn all_segments_succeed_sequentially_with_one_worker() {
        let dir = tempfile::tempdir().unwrap();
        let mut segments = vec![sample_segment(dir.path(), 0), sample_segment(dir.path(), 1)];
        for segment in &segments {
            std::fs::write(&segment.input_path, b"x").unwrap();
        }
        let runner = FakeCommandRunner::new();
        for segment in &segments {
            runner.expect_success("auto-encode", "");
            std::fs::write(&segment.output_path, b"encoded").unwrap();
        }
        let context = sample_context(dir.path());
        let options = JobOptions::default();
        run(&runner, &mut segments, &context, &options, 1).unwrap();
        assert!(segments.iter().all(|s| s.status == SegmentStatus::Completed));
    }

    #[test]
    fn a_failed_segment_fails_the_whole_pool() {
        let dir = tempfile::tempdir().unwrap();
        let mut segments = vec![sample_segment(dir.path(), 0)];
        std::fs::write(&segments[0].input_path, b"x").unwrap();
        let runner = FakeCommandRunner::new();
        for _ in 0..3 {
            runner.expect_failure("auto-encode", 1, "vmaf below floor");
        }
        let context = sample_context(dir.path());
        let options = JobOptions::default();
        let err = run(&runner, &mut segments, &context, &options, 1).unwrap_err();
        assert!(matches!(err, crate::error::DraptoError::EncodeRetriesExhausted { .. }));
        assert_eq!(segments[0].status, SegmentStatus::Failed);
    }
}
