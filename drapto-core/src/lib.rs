//! # drapto-core
//!
//! Core library for the chunked AV1/Opus/Matroska transcoding pipeline:
//! probe & classify, crop detection, quality planning, segmentation,
//! VMAF-guided chunk encoding with a tiered retry escalator, concatenation,
//! audio re-encode, muxing, and output validation, tied together by a single
//! job orchestrator with crash-safe state tracking.
//!
//! ## Architecture
//!
//! Every external tool interaction sits behind a trait (`CommandRunner`,
//! `FfprobeExecutor`, `DolbyVisionProbe`, `FfmpegSpawner`) with a production
//! implementation and an in-memory fake for tests, following the library's
//! dependency-injection style throughout.
//!
//! ## Module Structure
//!
//! - `config`: `CoreConfig`/`CoreConfigBuilder` and per-job `JobOptions`.
//! - `error`: `DraptoError` taxonomy and the crate-wide `Result` alias.
//! - `external`: ffmpeg/ffprobe/mediainfo process abstractions.
//! - `types`: stream metadata, HDR/crop/quality records, `EncodingContext`.
//! - `media`: probe & classify, crop detection, quality planning.
//! - `resource`: disk/CPU/memory admission gating.
//! - `workspace`: per-job scratch directory lifecycle.
//! - `segment`, `chunk`, `concat`: the chunked encode path and its retry
//!   escalator and worker pool.
//! - `dolby_vision`: the single-pass bypass for Dolby Vision sources.
//! - `audio`, `mux`, `validate`: the tail of the pipeline shared by both
//!   strategies.
//! - `state`: the crash-safe JSON job/segment/progress store.
//! - `notifications`: ntfy.sh-backed job-state push notifications.
//! - `pipeline`: the orchestrator (`run_job`) tying every stage together.
//!
//! ## AI-ASSISTANT-INFO
//!
//! Core library for chunked AV1 video encoding: probe, crop, plan, segment,
//! encode, concat, mux, validate, with crash-safe state and notifications.

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

/// Configuration structures and defaults used throughout the library.
pub mod config;

/// Custom error types and the crate-wide result alias.
pub mod error;

/// Interactions with external tools: ffmpeg, ffprobe, mediainfo.
pub mod external;

/// Shared data types: stream metadata, HDR/crop/quality records, context.
pub mod types;

/// Probe & classify, crop detection, quality planning.
pub mod media;

/// Disk/CPU/memory admission gating before a job starts.
pub mod resource;

/// Per-job scratch directory lifecycle.
pub mod workspace;

/// Time-based segmentation into fixed-length chunks.
pub mod segment;

/// Per-chunk VMAF-guided encoding: retry escalator, encoder, worker pool.
pub mod chunk;

/// Lossless concatenation of encoded segments.
pub mod concat;

/// Single-pass Dolby Vision encode path (bypasses chunking).
pub mod dolby_vision;

/// Audio track re-encode to Opus.
pub mod audio;

/// Final Matroska mux of encoded video and audio.
pub mod mux;

/// Output validation against the source.
pub mod validate;

/// Crash-safe JSON state tracking for jobs, segments, and progress.
pub mod state;

/// Push notifications on terminal job state, via ntfy.sh.
pub mod notifications;

/// The job orchestrator tying every stage together.
pub mod pipeline;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// ----- Configuration -----
pub use config::{CoreConfig, CoreConfigBuilder, JobOptions, LogLevel};

// ----- Error Handling -----
pub use error::{exit_code_for, CommandError, CommandErrorKind, CoreError, CoreResult, DraptoError, Result};

// ----- Shared Types -----
pub use types::{CropInfo, DynamicRange, EncodingContext, HdrInfo, QualitySettings, VideoStreamInfo};

// ----- External Tool Interactions -----
pub use external::{
    ffmpeg::{FfmpegProcess, FfmpegSpawner, SidecarFfmpegSpawner, SidecarProcess},
    ffprobe::{FfprobeExecutor, SystemFfprobeExecutor},
    mediainfo::{DolbyVisionProbe, SystemMediaInfoProbe},
    tool::{CommandRunner, SystemCommandRunner},
};

// ----- State Tracking -----
pub use state::{EncodingJob, EncodingJobStats, JobStatus, Progress, Segment, SegmentStatus, StateTracker, Strategy};

// ----- Notifications -----
pub use notifications::{NoopNotifier, NotificationError, NotificationEvent, Notifier, NtfyNotifier};

// ----- Orchestrator -----
pub use pipeline::{run_job, CancellationToken, PipelineDeps};
