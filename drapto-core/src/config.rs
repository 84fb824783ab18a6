// ============================================================================
// drapto-core/src/config.rs
// ============================================================================
//
// CONFIGURATION: process-wide defaults (`CoreConfig`) and the per-run
// override set built from CLI flags (`JobOptions`). `JobOptions` is merged
// onto `CoreConfig` exactly once at job start; the result is immutable for
// the run (see `EncodingContext` in `types.rs`).
//
// AI-ASSISTANT-INFO: Configuration structures and constants for the
// drapto-core library.

use std::path::PathBuf;

/// CRF quality for Standard Definition content (width <= 1920).
pub const DEFAULT_CRF_SD: u8 = 25;
/// CRF quality for anything wider than 1920 (HD and UHD share a floor per §3).
pub const DEFAULT_CRF_HD_UHD: u8 = 29;

pub const DEFAULT_MAX_BITRATE_SD: u64 = 4_000_000;
pub const DEFAULT_MAX_BITRATE_HD: u64 = 8_000_000;
pub const DEFAULT_MAX_BITRATE_UHD: u64 = 16_000_000;

pub const DEFAULT_TARGET_VMAF: f64 = 93.0;
pub const DEFAULT_PRESET: u8 = 6;
pub const DEFAULT_SEGMENT_LENGTH_SECS: u32 = 15;
pub const DEFAULT_VMAF_SAMPLE_COUNT: u32 = 3;
pub const DEFAULT_VMAF_SAMPLE_LENGTH_SECS: u32 = 1;
pub const DEFAULT_MIN_DISK_FREE_GB: u64 = 50;
pub const DEFAULT_MAX_CPU_PERCENT: f32 = 85.0;
pub const DEFAULT_MAX_MEM_PERCENT: f32 = 85.0;

/// Process-wide defaults, analogous to the project's `CoreConfig`. Holds the
/// durable settings a deployment sets once; per-run overrides arrive as
/// `JobOptions` and are layered on top (§4.15).
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub default_preset: u8,
    pub quality_sd: u8,
    pub quality_hd_uhd: u8,
    pub default_crop_enabled: bool,
    pub ntfy_topic: Option<String>,
    pub min_disk_free_gb: u64,
    pub max_cpu_percent: f32,
    pub max_mem_percent: f32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            default_preset: DEFAULT_PRESET,
            quality_sd: DEFAULT_CRF_SD,
            quality_hd_uhd: DEFAULT_CRF_HD_UHD,
            default_crop_enabled: true,
            ntfy_topic: None,
            min_disk_free_gb: DEFAULT_MIN_DISK_FREE_GB,
            max_cpu_percent: DEFAULT_MAX_CPU_PERCENT,
            max_mem_percent: DEFAULT_MAX_MEM_PERCENT,
        }
    }
}

/// Builder mirroring the project's `CoreConfigBuilder`: every field starts
/// unset and falls back to `CoreConfig::default()`'s value.
#[derive(Debug, Default)]
pub struct CoreConfigBuilder {
    default_preset: Option<u8>,
    quality_sd: Option<u8>,
    quality_hd_uhd: Option<u8>,
    default_crop_enabled: Option<bool>,
    ntfy_topic: Option<String>,
    min_disk_free_gb: Option<u64>,
    max_cpu_percent: Option<f32>,
    max_mem_percent: Option<f32>,
}

impl CoreConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_preset(mut self, preset: u8) -> Self {
        self.default_preset = Some(preset);
        self
    }

    pub fn quality_sd(mut self, crf: u8) -> Self {
        self.quality_sd = Some(crf);
        self
    }

    pub fn quality_hd_uhd(mut self, crf: u8) -> Self {
        self.quality_hd_uhd = Some(crf);
        self
    }

    pub fn default_crop_enabled(mut self, enabled: bool) -> Self {
        self.default_crop_enabled = Some(enabled);
        self
    }

    pub fn ntfy_topic(mut self, topic: impl Into<String>) -> Self {
        self.ntfy_topic = Some(topic.into());
        self
    }

    pub fn min_disk_free_gb(mut self, gb: u64) -> Self {
        self.min_disk_free_gb = Some(gb);
        self
    }

    pub fn max_cpu_percent(mut self, pct: f32) -> Self {
        self.max_cpu_percent = Some(pct);
        self
    }

    pub fn max_mem_percent(mut self, pct: f32) -> Self {
        self.max_mem_percent = Some(pct);
        self
    }

    pub fn build(self) -> CoreConfig {
        let defaults = CoreConfig::default();
        CoreConfig {
            default_preset: self.default_preset.unwrap_or(defaults.default_preset),
            quality_sd: self.quality_sd.unwrap_or(defaults.quality_sd),
            quality_hd_uhd: self.quality_hd_uhd.unwrap_or(defaults.quality_hd_uhd),
            default_crop_enabled: self.default_crop_enabled.unwrap_or(defaults.default_crop_enabled),
            ntfy_topic: self.ntfy_topic.or(defaults.ntfy_topic),
            min_disk_free_gb: self.min_disk_free_gb.unwrap_or(defaults.min_disk_free_gb),
            max_cpu_percent: self.max_cpu_percent.unwrap_or(defaults.max_cpu_percent),
            max_mem_percent: self.max_mem_percent.unwrap_or(defaults.max_mem_percent),
        }
    }
}

/// Per-run overrides captured from CLI flags (§6). Merged onto `CoreConfig`
/// once at job start; immutable for the run thereafter.
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub target_vmaf: f64,
    pub preset: u8,
    pub disable_crop: bool,
    pub disable_chunked: bool,
    pub segment_length_secs: u32,
    pub vmaf_sample_count: u32,
    pub vmaf_sample_length_secs: u32,
    pub temp_dir: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
    pub workers: Option<usize>,
    pub ntfy_topic: Option<String>,
}

impl Default for JobOptions {
    fn default() -> Self {
        JobOptions {
            target_vmaf: DEFAULT_TARGET_VMAF,
            preset: DEFAULT_PRESET,
            disable_crop: false,
            disable_chunked: false,
            segment_length_secs: DEFAULT_SEGMENT_LENGTH_SECS,
            vmaf_sample_count: DEFAULT_VMAF_SAMPLE_COUNT,
            vmaf_sample_length_secs: DEFAULT_VMAF_SAMPLE_LENGTH_SECS,
            temp_dir: None,
            working_dir: None,
            log_level: LogLevel::Info,
            log_file: None,
            workers: None,
            ntfy_topic: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warning => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

/// Effective worker count: `JobOptions::workers` if set, else logical CPU count.
pub fn effective_worker_count(options: &JobOptions) -> usize {
    options.workers.unwrap_or_else(num_cpus::get)
}

/// Effective ntfy topic: job override wins over the process-wide default.
pub fn effective_ntfy_topic<'a>(config: &'a CoreConfig, options: &'a JobOptions) -> Option<&'a str> {
    options.ntfy_topic.as_deref().or(config.ntfy_topic.as_deref())
}
