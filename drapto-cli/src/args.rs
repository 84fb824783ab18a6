//! Command-line argument parsing (§6).
//!
//! Defines the single `encode` subcommand and its flags, plus the global
//! `--verbose`/`--no-color` switches. Each field maps onto either
//! `drapto_core::CoreConfig` (process-wide defaults) or `drapto_core::JobOptions`
//! (per-run overrides) in `commands::encode`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use drapto_core::config::{
    DEFAULT_MAX_CPU_PERCENT, DEFAULT_MAX_MEM_PERCENT, DEFAULT_MIN_DISK_FREE_GB, DEFAULT_PRESET,
    DEFAULT_SEGMENT_LENGTH_SECS, DEFAULT_TARGET_VMAF, DEFAULT_VMAF_SAMPLE_COUNT, DEFAULT_VMAF_SAMPLE_LENGTH_SECS,
};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "drapto - chunked AV1/Opus/Matroska video transcoding pipeline",
    long_about = "Probes, crops, segments, and VMAF-guided-encodes a video into \
                  AV1/Opus/Matroska, with a single-pass bypass for Dolby Vision sources."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug-level logging
    #[arg(short, long, global = true, help = "Enable debug-level logging output")]
    pub verbose: bool,

    /// Disable colored terminal output
    #[arg(long, global = true, help = "Disable ANSI color in terminal output")]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Encode a video file through the full pipeline
    Encode(EncodeArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct EncodeArgs {
    /// Input video file
    pub input: PathBuf,

    /// Output video file
    pub output: PathBuf,

    /// Target VMAF quality for the chunk encoder's retry escalator (0-100)
    #[arg(long, default_value_t = DEFAULT_TARGET_VMAF)]
    pub target_vmaf: f64,

    /// SVT-AV1 preset (0-13, lower is slower/better quality)
    #[arg(long, default_value_t = DEFAULT_PRESET)]
    pub preset: u8,

    /// Disable automatic crop detection
    #[arg(long)]
    pub disable_crop: bool,

    /// Force the single-pass path even for non-Dolby-Vision sources
    #[arg(long)]
    pub disable_chunked: bool,

    /// Segment length in seconds for the chunked path
    #[arg(long, default_value_t = DEFAULT_SEGMENT_LENGTH_SECS)]
    pub segment_length_secs: u32,

    /// Number of VMAF samples taken per chunk encode attempt
    #[arg(long, default_value_t = DEFAULT_VMAF_SAMPLE_COUNT)]
    pub vmaf_sample_count: u32,

    /// Length in seconds of each VMAF sample
    #[arg(long, default_value_t = DEFAULT_VMAF_SAMPLE_LENGTH_SECS)]
    pub vmaf_sample_length_secs: u32,

    /// Scratch directory for the job workspace (default: alongside the output)
    #[arg(long)]
    pub working_dir: Option<PathBuf>,

    /// Number of segments to encode in parallel (default: logical CPU count)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// ntfy.sh topic URL to notify on job start/completion/failure
    #[arg(long)]
    pub ntfy_topic: Option<String>,

    /// Minimum free disk space required at the workspace, in GB
    #[arg(long, default_value_t = DEFAULT_MIN_DISK_FREE_GB)]
    pub min_disk_free_gb: u64,

    /// Abort admission if system CPU load exceeds this percentage
    #[arg(long, default_value_t = DEFAULT_MAX_CPU_PERCENT)]
    pub max_cpu_percent: f32,

    /// Abort admission if system memory usage exceeds this percentage
    #[arg(long, default_value_t = DEFAULT_MAX_MEM_PERCENT)]
    pub max_mem_percent: f32,
}
