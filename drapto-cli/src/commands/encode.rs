// ============================================================================
// drapto-cli/src/commands/encode.rs
// ============================================================================
//
// ENCODE COMMAND: builds `CoreConfig`/`JobOptions` from the parsed CLI
// arguments, wires concrete (system) implementations of every trait seam,
// and drives `drapto_core::run_job` to completion while a background thread
// polls the job's on-disk state to keep a progress bar moving.
//
// AI-ASSISTANT-INFO: CLI-to-core wiring for the `encode` subcommand.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use drapto_core::external::ffprobe::SystemFfprobeExecutor;
use drapto_core::external::mediainfo::SystemMediaInfoProbe;
use drapto_core::external::tool::SystemCommandRunner;
use drapto_core::notifications::{NoopNotifier, NtfyNotifier, Notifier};
use drapto_core::{CancellationToken, CoreConfig, CoreConfigBuilder, DraptoError, EncodingJob, JobOptions, PipelineDeps, StateTracker};

use crate::args::EncodeArgs;
use crate::terminal;

/// Runs the `encode` subcommand end to end. Returns the core error on
/// failure so `main` can map it onto the process exit code. The caller
/// installs the signal handler and owns `cancel`, so `main`'s `anyhow`
/// boundary never has to cross into this `DraptoError`-returning function.
pub fn run_encode(args: EncodeArgs, cancel: &CancellationToken) -> Result<EncodingJob, DraptoError> {
    let mut config_builder = CoreConfigBuilder::new()
        .default_preset(args.preset)
        .default_crop_enabled(!args.disable_crop)
        .min_disk_free_gb(args.min_disk_free_gb)
        .max_cpu_percent(args.max_cpu_percent)
        .max_mem_percent(args.max_mem_percent);
    if let Some(topic) = &args.ntfy_topic {
        config_builder = config_builder.ntfy_topic(topic.clone());
    }
    let config = config_builder.build();

    let options = JobOptions {
        target_vmaf: args.target_vmaf,
        preset: args.preset,
        disable_crop: args.disable_crop,
        disable_chunked: args.disable_chunked,
        segment_length_secs: args.segment_length_secs,
        vmaf_sample_count: args.vmaf_sample_count,
        vmaf_sample_length_secs: args.vmaf_sample_length_secs,
        working_dir: args.working_dir.clone(),
        workers: args.workers,
        ntfy_topic: args.ntfy_topic.clone(),
        ..JobOptions::default()
    };

    let runner = SystemCommandRunner;
    let ffprobe = SystemFfprobeExecutor;
    let dv_probe = SystemMediaInfoProbe;

    terminal::print_section("drapto encode");
    terminal::print_file_list("Input", std::slice::from_ref(&args.input));

    let watch_dir = options
        .working_dir
        .clone()
        .or_else(|| args.output.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("work");
    let stop_watch = Arc::new(AtomicBool::new(false));
    let watcher = spawn_progress_watcher(watch_dir, Arc::clone(&stop_watch));

    let start = Instant::now();
    let job = match drapto_core::config::effective_ntfy_topic(&config, &options) {
        Some(topic) => {
            let notifier = NtfyNotifier::new(topic);
            run_with_notifier(&runner, &ffprobe, &dv_probe, &notifier, &config, &options, &args, cancel)
        }
        None => {
            let notifier = NoopNotifier;
            run_with_notifier(&runner, &ffprobe, &dv_probe, &notifier, &config, &options, &args, cancel)
        }
    };

    stop_watch.store(true, Ordering::SeqCst);
    let _ = watcher.join();

    match &job {
        Ok(j) => terminal::print_job_summary(j.stats.input_size, j.stats.output_size, start.elapsed()),
        Err(err) => terminal::print_error("encode failed", &err.to_string(), None),
    }
    job
}

#[allow(clippy::too_many_arguments)]
fn run_with_notifier<N: Notifier>(
    runner: &SystemCommandRunner,
    ffprobe: &SystemFfprobeExecutor,
    dv_probe: &SystemMediaInfoProbe,
    notifier: &N,
    config: &CoreConfig,
    options: &JobOptions,
    args: &EncodeArgs,
    cancel: &CancellationToken,
) -> Result<EncodingJob, DraptoError> {
    let deps = PipelineDeps { runner, ffprobe, dv_probe, notifier };
    drapto_core::run_job(&deps, config, options, &args.input, &args.output, cancel)
}

/// Polls `work_dir/encoding.json` once a second and advances the terminal
/// progress bar from the sum of each segment's reported frame counts. Exits
/// once `stop` is set by the caller after the job finishes.
fn spawn_progress_watcher(work_dir: std::path::PathBuf, stop: Arc<AtomicBool>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let tracker = StateTracker::new(&work_dir);
        while !stop.load(Ordering::SeqCst) {
            if let Ok(job) = tracker.load_job() {
                let total: u64 = job.segments.values().map(|s| s.total_frames).sum();
                if total > 0 {
                    terminal::update_progress_bar(job.stats.encoded_frames, total);
                }
            }
            std::thread::sleep(Duration::from_millis(750));
        }
        terminal::clear_progress_bar();
    })
}
