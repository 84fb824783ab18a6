// ============================================================================
// drapto-core/src/external/ffprobe.rs
// ============================================================================
//
// FFPROBE INTEGRATION: stream metadata extraction (§4.1).
//
// A small trait over "ask ffprobe about this file" so the probe module can
// be tested without invoking a real binary, mirroring the project's
// `FfprobeExecutor` trait split between a crate-backed production impl and
// an in-memory fake.
//
// AI-ASSISTANT-INFO: ffprobe JSON parsing for stream/format metadata.

use std::path::Path;

use serde::Deserialize;

use crate::error::{DraptoError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbedStream {
    pub codec_type: String,
    #[serde(default)]
    pub codec_name: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub pix_fmt: Option<String>,
    pub color_transfer: Option<String>,
    pub color_primaries: Option<String>,
    pub color_space: Option<String>,
    pub r_frame_rate: Option<String>,
    pub channels: Option<u32>,
    pub channel_layout: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbedFormat {
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeOutput {
    #[serde(default)]
    pub streams: Vec<ProbedStream>,
    pub format: Option<ProbedFormat>,
}

impl ProbeOutput {
    pub fn first_video_stream(&self) -> Option<&ProbedStream> {
        self.streams.iter().find(|s| s.codec_type == "video")
    }

    pub fn first_audio_stream(&self) -> Option<&ProbedStream> {
        self.streams.iter().find(|s| s.codec_type == "audio")
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.format.as_ref()?.duration.as_ref()?.parse().ok()
    }
}

/// Parses a rational "num/den" frame-rate string. `den == 0` yields `0.0`
/// (caller's range check then fails it, §4.1).
pub fn parse_frame_rate(rational: &str) -> f64 {
    let mut parts = rational.splitn(2, '/');
    let num: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0.0);
    let den: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(1.0);
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Derives bit depth from a pixel-format substring match (§4.1).
pub fn bit_depth_from_pixel_format(pix_fmt: &str) -> Result<u8> {
    if pix_fmt.contains("p16") {
        Err(DraptoError::InvalidStream(format!("unsupported 16-bit pixel format: {pix_fmt}")))
    } else if pix_fmt.contains("p12") {
        Ok(12)
    } else if pix_fmt.contains("p10") {
        Ok(10)
    } else {
        Ok(8)
    }
}

/// Trait over ffprobe invocation so the probe module can be exercised
/// against a fake in tests.
pub trait FfprobeExecutor {
    fn probe(&self, input_path: &Path) -> Result<ProbeOutput>;
}

/// Production implementation backed by the `ffprobe` crate plus a direct
/// `-show_chapters` call for chapter passthrough metadata, matching the
/// project's `FFprobe::execute` invocation (`-v quiet -print_format json
/// -show_format -show_streams -show_chapters`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFfprobeExecutor;

impl FfprobeExecutor for SystemFfprobeExecutor {
    fn probe(&self, input_path: &Path) -> Result<ProbeOutput> {
        use std::process::Command;

        let output = Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                "-show_chapters",
            ])
            .arg(input_path)
            .output()
            .map_err(|e| crate::error::command_start_error("ffprobe", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(crate::error::command_failed_error("ffprobe", output.status, stderr));
        }

        serde_json::from_slice(&output.stdout).map_err(DraptoError::Json)
    }
}

#[cfg(any(test, feature = "test-mocks"))]
pub mod fake {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[derive(Default)]
    pub struct FakeFfprobeExecutor {
        results: RefCell<HashMap<PathBuf, ProbeOutput>>,
    }

    impl FakeFfprobeExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn expect(&self, path: &Path, output: ProbeOutput) {
            self.results.borrow_mut().insert(path.to_path_buf(), output);
        }
    }

    impl FfprobeExecutor for FakeFfprobeExecutor {
        fn probe(&self, input_path: &Path) -> Result<ProbeOutput> {
            self.results
                .borrow()
                .get(input_path)
                .cloned()
                .ok_or_else(|| DraptoError::InvalidInput(format!("no fake ffprobe expectation for {}", input_path.display())))
        }
    }
}
