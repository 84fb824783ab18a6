// ============================================================================
// drapto-core/src/pipeline.rs
// ============================================================================
//
// ORCHESTRATOR (§5, §2)
//
// Drives one job end to end: probe/classify, crop, quality planning,
// workspace + resource admission, segmentation-or-single-pass, chunk
// dispatch, concat, audio, mux, validation, state persistence, and
// terminal-state notification. Grounded in `encoding/pipeline.rs`'s
// `EncodingPipeline::process_file` staging (numbered stages, one `report`
// per transition), rebuilt around this crate's own stage modules instead of
// the teacher's `detection`/`reporting`/`util::scheduler` set.
//
// AI-ASSISTANT-INFO: top-level stage sequencing, cancellation checks,
// terminal-state bookkeeping.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use log::info;

use crate::config::{effective_worker_count, CoreConfig, JobOptions};
use crate::error::{DraptoError, Result};
use crate::external::ffprobe::FfprobeExecutor;
use crate::external::mediainfo::DolbyVisionProbe;
use crate::external::tool::CommandRunner;
use crate::notifications::{notify_best_effort, NotificationEvent, Notifier};
use crate::resource::{check_admission, projected_chunk_footprint, ResourceMonitor};
use crate::state::{EncodingJob, JobStatus, StateTracker, Strategy};
use crate::workspace::Workspace;
use crate::{audio, chunk, concat, dolby_vision, media, mux, segment, validate};

/// Disk-headroom safety multiplier applied to the projected chunk footprint
/// (§4.13). Not named by the spec's formula; chosen to match the admission
/// check's other constants' order of magnitude.
const DISK_BUFFER_FACTOR: f64 = 1.2;

/// Cooperative cancellation flag shared between a signal handler installed
/// at the CLI boundary and the orchestrator. The orchestrator checks this at
/// each stage boundary rather than killing in-flight child processes
/// mid-stage (§5's "controller waits for children to terminate" is honored
/// at the granularity of whole stages, since this crate's external-tool
/// seam runs tools to completion rather than managing process groups).
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

fn check_cancelled(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        return Err(DraptoError::Cancelled);
    }
    Ok(())
}

/// Everything the orchestrator needs from the outside world, collected so
/// `run_job`'s own parameter list stays short. Each field is generic over a
/// trait so tests can substitute fakes, mirroring the rest of the crate's
/// dependency-injection seams.
pub struct PipelineDeps<'a, R, P, D, N> {
    pub runner: &'a R,
    pub ffprobe: &'a P,
    pub dv_probe: &'a D,
    pub notifier: &'a N,
}

/// Runs one job from `input_path` to `output_path`, returning the final
/// `EncodingJob` record on success (including for a caller that wants the
/// stats) or the first fatal error on failure. On any error the job's state
/// is persisted as `failed` and a `JobFailed` notification is dispatched
/// before the error propagates; the workspace is always torn down.
pub fn run_job<R, P, D, N>(
    deps: &PipelineDeps<R, P, D, N>,
    config: &CoreConfig,
    options: &JobOptions,
    input_path: &Path,
    output_path: &Path,
    cancel: &CancellationToken,
) -> Result<EncodingJob>
where
    R: CommandRunner,
    P: FfprobeExecutor,
    D: DolbyVisionProbe,
    N: Notifier,
{
    if !input_path.exists() {
        return Err(DraptoError::InvalidInput(format!(
            "input does not exist: {}",
            input_path.display()
        )));
    }
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let job_id = input_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "job".into());

    let working_dir = options
        .working_dir
        .clone()
        .or_else(|| output_path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    let workspace = Workspace::create(&working_dir, false)?;
    let tracker = StateTracker::new(workspace.root());

    let mut job = EncodingJob::new(job_id.clone(), input_path.to_path_buf(), output_path.to_path_buf(), Strategy::Chunked);
    job.status = JobStatus::Initializing;
    job.stats.start_time = Some(Utc::now());
    tracker.save_job(&job)?;
    notify_best_effort(deps.notifier, NotificationEvent::JobStarted { job_id: &job_id });

    match run_stages(deps, config, options, input_path, output_path, &workspace, &tracker, &mut job, cancel) {
        Ok(()) => {
            job.status = JobStatus::Completed;
            job.stats.end_time = Some(Utc::now());
            job.stats.output_size = crate::external::file_size(output_path).unwrap_or(0);
            tracker.save_job(&job)?;
            notify_best_effort(
                deps.notifier,
                NotificationEvent::JobCompleted { job_id: &job_id, stats: &job.stats },
            );
            workspace.teardown();
            Ok(job)
        }
        Err(err) => {
            job.status = JobStatus::Failed;
            job.error = Some(err.to_string());
            job.stats.end_time = Some(Utc::now());
            let _ = tracker.save_job(&job);
            notify_best_effort(
                deps.notifier,
                NotificationEvent::JobFailed { job_id: &job_id, error: &err.to_string() },
            );
            workspace.teardown();
            Err(err)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_stages<R, P, D, N>(
    deps: &PipelineDeps<R, P, D, N>,
    config: &CoreConfig,
    options: &JobOptions,
    input_path: &Path,
    output_path: &Path,
    workspace: &Workspace,
    tracker: &StateTracker,
    job: &mut EncodingJob,
    cancel: &CancellationToken,
) -> Result<()>
where
    R: CommandRunner,
    P: FfprobeExecutor,
    D: DolbyVisionProbe,
    N: Notifier,
{
    check_cancelled(cancel)?;

    let input_size = crate::external::file_size(input_path)?;
    job.stats.input_size = input_size;

    info!("checking resource admission");
    let mut monitor = ResourceMonitor::new();
    let snapshot = monitor.snapshot(&workspace.root().to_path_buf(), 0);
    let footprint = projected_chunk_footprint(input_size, options.segment_length_secs, DISK_BUFFER_FACTOR);
    check_admission(&snapshot, config.min_disk_free_gb, footprint, config.max_cpu_percent, config.max_mem_percent)?;

    info!("probing and classifying {}", input_path.display());
    let stream_info = media::probe::analyze(input_path, deps.ffprobe, deps.dv_probe)?;

    job.status = JobStatus::Preparing;
    tracker.save_job(job)?;

    let crop_info = if options.disable_crop {
        None
    } else {
        media::crop::detect_crop(
            deps.runner,
            input_path,
            stream_info.hdr_info.as_ref().map(|h| h.range).unwrap_or(crate::types::DynamicRange::Sdr),
            stream_info.width,
            stream_info.height,
            stream_info.duration_secs,
        )?
    };

    let quality = media::quality::plan(&stream_info, options.preset);

    let strategy = if stream_info.is_dolby_vision || options.disable_chunked {
        Strategy::SinglePass
    } else {
        Strategy::Chunked
    };
    job.strategy = strategy;

    let context = crate::types::EncodingContext {
        input_path: input_path.to_path_buf(),
        output_path: output_path.to_path_buf(),
        target_vmaf: options.target_vmaf,
        preset: quality.preset,
        svt_params: quality.svt_params.clone(),
        crop_filter: crop_info.map(|c| c.filter_string()),
        hw_accel: None,
        temp_dir: workspace.temp_dir(),
    };

    check_cancelled(cancel)?;
    job.status = JobStatus::Encoding;
    tracker.save_job(job)?;

    let video_path = workspace.encoded_dir().join("video.mkv");
    std::fs::create_dir_all(workspace.encoded_dir())?;

    match strategy {
        Strategy::SinglePass => {
            info!("Dolby Vision or single-pass mode: bypassing chunked path");
            dolby_vision::encode_dolby_vision(
                deps.runner,
                &context.input_path,
                &video_path,
                context.preset,
                &context.svt_params,
                context.crop_filter.as_deref(),
                context.hw_accel.as_deref(),
            )?;
            job.stats.segment_count = 1;
        }
        Strategy::Chunked => {
            info!("segmenting into {}-second chunks", options.segment_length_secs);
            let mut segments = segment::segment(deps.runner, deps.ffprobe, input_path, &workspace.segments_dir(), options.segment_length_secs)?;

            for seg in &mut segments {
                seg.output_path = workspace.encoded_dir().join(format!("{:04}.mkv", seg.index));
                job.segments.insert(seg.index, seg.clone());
            }
            job.stats.segment_count = segments.len() as u32;
            tracker.save_job(job)?;

            check_cancelled(cancel)?;
            let worker_count = effective_worker_count(options);
            info!("dispatching {} segments across {worker_count} workers", segments.len());
            let pool_result = chunk::pool::run(deps.runner, &mut segments, &context, options, worker_count);

            for seg in &segments {
                job.segments.insert(seg.index, seg.clone());
            }
            job.recompute_encoded_frames();
            tracker.save_job(job)?;

            pool_result?;

            check_cancelled(cancel)?;
            let encoded_paths: Vec<std::path::PathBuf> = segments.iter().map(|s| s.output_path.clone()).collect();
            info!("concatenating {} encoded segments", encoded_paths.len());
            concat::concat(deps.runner, &workspace.temp_dir(), &encoded_paths, &video_path)?;
        }
    }

    check_cancelled(cancel)?;
    job.status = JobStatus::Finalizing;
    tracker.save_job(job)?;

    info!("encoding audio track");
    let audio_path = audio::encode_audio(deps.runner, deps.ffprobe, input_path, &workspace.audio_dir())?;

    check_cancelled(cancel)?;
    info!("muxing final output");
    mux::mux(deps.runner, &video_path, &audio_path, input_path, output_path)?;

    check_cancelled(cancel)?;
    info!("validating output");
    validate::validate(deps.ffprobe, input_path, output_path, false)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CoreConfigBuilder, JobOptions};
    use crate::external::ffprobe::fake::FakeFfprobeExecutor;
    use crate::external::ffprobe::{ProbeOutput, ProbedFormat, ProbedStream};
    use crate::external::mediainfo::fake::FakeDolbyVisionProbe;
    use crate::external::tool::fake::FakeCommandRunner;
    use crate::notifications::NoopNotifier;

    fn video_stream() -> ProbedStream {
        ProbedStream {
            codec_type: "video".into(),
            codec_name: "h264".into(),
            width: Some(1920),
            height: Some(1080),
            pix_fmt: Some("yuv420p".into()),
            color_transfer: Some("bt709".into()),
            color_primaries: Some("bt709".into()),
            color_space: Some("bt709".into()),
            r_frame_rate: Some("24000/1001".into()),
            channels: None,
            channel_layout: None,
        }
    }

    fn audio_stream(codec: &str, channels: u32) -> ProbedStream {
        ProbedStream { codec_type: "audio".into(), codec_name: codec.into(), channels: Some(channels), ..Default::default() }
    }

    #[test]
    fn run_job_rejects_missing_input() {
        let runner = FakeCommandRunner::new();
        let ffprobe = FakeFfprobeExecutor::new();
        let dv_probe = FakeDolbyVisionProbe { present: false };
        let notifier = NoopNotifier;
        let deps = PipelineDeps { runner: &runner, ffprobe: &ffprobe, dv_probe: &dv_probe, notifier: &notifier };
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfigBuilder::new().build();
        let options = JobOptions::default();
        let err = run_job(
            &deps,
            &config,
            &options,
            &dir.path().join("missing.mkv"),
            &dir.path().join("out.mkv"),
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DraptoError::InvalidInput(_)));
    }

    #[test]
    fn run_job_honors_pre_cancelled_token() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mkv");
        std::fs::write(&input, b"x").unwrap();

        let runner = FakeCommandRunner::new();
        let ffprobe = FakeFfprobeExecutor::new();
        let dv_probe = FakeDolbyVisionProbe { present: false };
        let notifier = NoopNotifier;
        let deps = PipelineDeps { runner: &runner, ffprobe: &ffprobe, dv_probe: &dv_probe, notifier: &notifier };
        let config = CoreConfigBuilder::new().build();
        let options = JobOptions::default();

        let token = CancellationToken::new();
        token.cancel();
        let err = run_job(&deps, &config, &options, &input, &dir.path().join("out.mkv"), &token).unwrap_err();
        assert!(matches!(err, DraptoError::Cancelled));
    }

    #[test]
    fn run_job_single_pass_dolby_vision_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mkv");
        std::fs::write(&input, vec![0u8; 4096]).unwrap();
        let output = dir.path().join("out.mkv");

        let runner = FakeCommandRunner::new();
        let ffprobe = FakeFfprobeExecutor::new();
        ffprobe.expect(
            &input,
            ProbeOutput {
                streams: vec![video_stream(), audio_stream("aac", 2)],
                format: Some(ProbedFormat { duration: Some("600.0".into()) }),
            },
        );
        let dv_probe = FakeDolbyVisionProbe { present: true };
        let notifier = NoopNotifier;
        let deps = PipelineDeps { runner: &runner, ffprobe: &ffprobe, dv_probe: &dv_probe, notifier: &notifier };

        let config = CoreConfigBuilder::new().min_disk_free_gb(0).max_cpu_percent(100.0).max_mem_percent(100.0).build();
        let mut options = JobOptions::default();
        options.disable_crop = true;
        options.working_dir = Some(dir.path().to_path_buf());

        runner.expect_success("video.mkv", "");
        runner.expect_success("audio.mka", "");
        runner.expect_success("out.mkv", "");

        // the fakes don't actually write files, so pre-seed the paths the
        // orchestrator checks for existence/non-emptiness after each stage.
        let work_dir = dir.path().join("work");
        std::fs::create_dir_all(work_dir.join("encoded")).unwrap();
        std::fs::write(work_dir.join("encoded").join("video.mkv"), b"video").unwrap();
        std::fs::create_dir_all(work_dir.join("audio")).unwrap();
        std::fs::write(work_dir.join("audio").join("audio.mka"), b"audio").unwrap();
        ffprobe.expect(
            &work_dir.join("audio").join("audio.mka"),
            ProbeOutput { streams: vec![audio_stream("opus", 2)], format: None },
        );
        std::fs::write(&output, b"final").unwrap();
        ffprobe.expect(
            &output,
            ProbeOutput {
                streams: vec![
                    ProbedStream { codec_type: "video".into(), codec_name: "av1".into(), ..Default::default() },
                    audio_stream("opus", 2),
                ],
                format: Some(ProbedFormat { duration: Some("600.3".into()) }),
            },
        );

        let job = run_job(&deps, &config, &options, &input, &output, &CancellationToken::new()).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.strategy, Strategy::SinglePass);
    }

    #[test]
    fn run_job_chunked_path_fails_when_a_segment_exhausts_all_tiers() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mkv");
        std::fs::write(&input, vec![0u8; 4096]).unwrap();
        let output = dir.path().join("out.mkv");

        let runner = FakeCommandRunner::new();
        let ffprobe = FakeFfprobeExecutor::new();
        ffprobe.expect(
            &input,
            ProbeOutput {
                streams: vec![video_stream(), audio_stream("aac", 2)],
                format: Some(ProbedFormat { duration: Some("45.0".into()) }),
            },
        );
        let dv_probe = FakeDolbyVisionProbe { present: false };
        let notifier = NoopNotifier;
        let deps = PipelineDeps { runner: &runner, ffprobe: &ffprobe, dv_probe: &dv_probe, notifier: &notifier };

        let config = CoreConfigBuilder::new().min_disk_free_gb(0).max_cpu_percent(100.0).max_mem_percent(100.0).build();
        let mut options = JobOptions::default();
        options.disable_crop = true;
        options.segment_length_secs = 15;
        options.workers = Some(1);
        options.working_dir = Some(dir.path().to_path_buf());

        // segmentation: three 15s segments, pre-seeded since the fake runner
        // never writes files itself.
        runner.expect_success("-segment_time", "");
        let segments_dir = dir.path().join("work").join("segments");
        std::fs::create_dir_all(&segments_dir).unwrap();
        for i in 0..3u32 {
            let path = segments_dir.join(format!("{i:04}.mkv"));
            std::fs::write(&path, vec![0u8; 2048]).unwrap();
            ffprobe.expect(
                &path,
                ProbeOutput {
                    streams: vec![video_stream()],
                    format: Some(ProbedFormat { duration: Some("15.0".into()) }),
                },
            );
        }

        let encoded_dir = dir.path().join("work").join("encoded");
        std::fs::create_dir_all(&encoded_dir).unwrap();

        // segment 0: succeeds on tier 1. The output file must not exist
        // until the matching call resolves, or the skip-if-exists check
        // would short-circuit the attempt count to zero.
        let seg0_out = encoded_dir.join("0000.mkv");
        runner.expect_success_writing_file(seg0_out.to_str().unwrap(), &seg0_out, b"encoded");

        // segment 1: fails tier 1, succeeds tier 2.
        let seg1_out = encoded_dir.join("0001.mkv");
        runner.expect_failure(seg1_out.to_str().unwrap(), 1, "vmaf below floor on tier1");
        runner.expect_success_writing_file(seg1_out.to_str().unwrap(), &seg1_out, b"encoded");

        // segment 2: fails all three tiers.
        let seg2_out = encoded_dir.join("0002.mkv");
        for _ in 0..3 {
            runner.expect_failure(seg2_out.to_str().unwrap(), 1, "vmaf below floor");
        }

        let err = run_job(&deps, &config, &options, &input, &output, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, DraptoError::EncodeRetriesExhausted { .. }));

        // re-load the persisted job to inspect per-segment outcomes, since
        // `run_job` only returns the error on failure, not the job record.
        let tracker = StateTracker::new(&dir.path().join("work"));
        let job = tracker.load_job().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.segments.get(&0).unwrap().attempts(), 1);
        assert_eq!(job.segments.get(&1).unwrap().attempts(), 2);
        assert_eq!(job.segments.get(&2).unwrap().attempts(), 3);
        assert!(!output.exists(), "concat/mux must never run once a segment exhausts its tiers");
    }
}
