// ============================================================================
// drapto-core/src/types.rs
// ============================================================================
//
// DATA MODEL: Stream metadata, HDR/crop/quality records, and the immutable
// per-run encoding context built from them.
//
// AI-ASSISTANT-INFO: Core data types shared across probe, crop, quality and
// the chunk encoder.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{DraptoError, Result};

/// Classifies the dynamic-range handling of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DynamicRange {
    Sdr,
    Hdr10,
    Hlg,
    Smpte428,
    DolbyVision,
}

/// HDR classification plus the measured or default black level used by crop
/// detection's threshold selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HdrInfo {
    pub range: DynamicRange,
    /// Measured black level, clamped to [16, 256]. `None` until crop
    /// detection runs its black-level probe.
    pub black_level: Option<u16>,
}

impl HdrInfo {
    pub fn sdr() -> Self {
        HdrInfo { range: DynamicRange::Sdr, black_level: None }
    }

    /// Default black level for this classification before any measurement.
    pub fn default_black_level(&self) -> u16 {
        match self.range {
            DynamicRange::Sdr => 16,
            _ => 128,
        }
    }

    /// Clamp a measured black level into the documented range.
    pub fn clamp_measured(level: f64) -> u16 {
        level.round().clamp(16.0, 256.0) as u16
    }
}

/// An optional crop rectangle recommended by the crop analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropInfo {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub enabled: bool,
}

impl CropInfo {
    /// Validates the invariants from §3: even offsets/dimensions, bounds
    /// within the source frame, and aspect-ratio deviation within 1%.
    pub fn validate(&self, source_width: u32, source_height: u32) -> Result<()> {
        if self.x % 2 != 0 || self.y % 2 != 0 || self.width % 2 != 0 || self.height % 2 != 0 {
            return Err(DraptoError::InvalidStream(
                "crop rectangle must have even offsets and dimensions".into(),
            ));
        }
        if self.width > source_width || self.height > source_height {
            return Err(DraptoError::InvalidStream(
                "crop rectangle exceeds source dimensions".into(),
            ));
        }
        // A crop that only trims one axis (letterbox or pillarbox bars) is the
        // common case and is exempt from the aspect check below: removing
        // black bars deliberately changes the display aspect ratio. The
        // aspect check only guards crops that shrink both axes at once,
        // where a parse error (garbage cropdetect output) could otherwise
        // slip through as a plausible-looking rectangle.
        let width_unchanged = self.width == source_width;
        let height_unchanged = self.height == source_height;
        if !width_unchanged && !height_unchanged {
            let source_aspect = source_width as f64 / source_height as f64;
            let crop_aspect = self.width as f64 / self.height as f64;
            if (crop_aspect / source_aspect - 1.0).abs() > 0.01 {
                return Err(DraptoError::InvalidStream(
                    "crop aspect ratio deviates from source by more than 1%".into(),
                ));
            }
        }
        Ok(())
    }

    /// The `crop=w:h:x:y` filter argument ffmpeg expects.
    pub fn filter_string(&self) -> String {
        format!("crop={}:{}:{}:{}", self.width, self.height, self.x, self.y)
    }

    /// Insets below this are considered insignificant and disable cropping.
    pub const INSIGNIFICANT_INSET: u32 = 10;
}

/// CRF/bitrate/preset plan produced by the quality planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySettings {
    pub crf: u8,
    pub preset: u8,
    pub max_bitrate: u64,
    pub buffer_size: u64,
    pub pixel_format: String,
    pub svt_params: String,
}

impl QualitySettings {
    pub const PRESET_MIN: u8 = 0;
    pub const PRESET_MAX: u8 = 13;
    pub const PRESET_DEFAULT: u8 = 6;

    pub fn clamp_preset(preset: u8) -> u8 {
        preset.clamp(Self::PRESET_MIN, Self::PRESET_MAX)
    }
}

/// Stream metadata produced once by the probe, immutable thereafter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoStreamInfo {
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
    pub pixel_format: String,
    pub bit_depth: u8,
    pub color_transfer: Option<String>,
    pub color_primaries: Option<String>,
    pub color_space: Option<String>,
    pub is_hdr: bool,
    pub is_dolby_vision: bool,
    pub hdr_info: Option<HdrInfo>,
    pub crop_info: Option<CropInfo>,
    pub quality_settings: Option<QualitySettings>,
    pub duration_secs: f64,
}

impl VideoStreamInfo {
    pub const WIDTH_MIN: u32 = 16;
    pub const WIDTH_MAX: u32 = 8192;
    pub const FPS_MIN: f64 = 1.0;
    pub const FPS_MAX: f64 = 300.0;

    pub fn validate(&self) -> Result<()> {
        if !(Self::WIDTH_MIN..=Self::WIDTH_MAX).contains(&self.width)
            || !(Self::WIDTH_MIN..=Self::WIDTH_MAX).contains(&self.height)
        {
            return Err(DraptoError::InvalidStream(format!(
                "resolution {}x{} out of range [{}, {}]",
                self.width, self.height, Self::WIDTH_MIN, Self::WIDTH_MAX
            )));
        }
        if !(Self::FPS_MIN..=Self::FPS_MAX).contains(&self.frame_rate) {
            return Err(DraptoError::InvalidStream(format!(
                "frame rate {} out of range [{}, {}]",
                self.frame_rate, Self::FPS_MIN, Self::FPS_MAX
            )));
        }
        if !matches!(self.bit_depth, 8 | 10 | 12) {
            return Err(DraptoError::InvalidStream(format!(
                "unsupported bit depth {}",
                self.bit_depth
            )));
        }
        Ok(())
    }
}

/// Immutable per-run plan the controller builds once and threads through the
/// whole pipeline.
#[derive(Debug, Clone)]
pub struct EncodingContext {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub target_vmaf: f64,
    pub preset: u8,
    pub svt_params: String,
    pub crop_filter: Option<String>,
    pub hw_accel: Option<String>,
    pub temp_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_validate_rejects_odd_offsets() {
        let crop = CropInfo { x: 1, y: 0, width: 100, height: 100, enabled: true };
        assert!(crop.validate(1920, 1080).is_err());
    }

    #[test]
    fn crop_validate_rejects_aspect_drift() {
        let crop = CropInfo { x: 0, y: 0, width: 1920, height: 900, enabled: true };
        assert!(crop.validate(1920, 1080).is_err());
    }

    #[test]
    fn crop_validate_accepts_letterbox_trim() {
        // Width unchanged, only height trimmed -> exempt from the aspect check.
        let crop = CropInfo { x: 0, y: 140, width: 1920, height: 800, enabled: true };
        assert!(crop.validate(1920, 1080).is_ok());
    }

    #[test]
    fn crop_validate_rejects_distorted_both_axis_crop() {
        let crop = CropInfo { x: 0, y: 0, width: 1000, height: 200, enabled: true };
        assert!(crop.validate(1920, 1080).is_err());
    }

    #[test]
    fn quality_preset_clamps() {
        assert_eq!(QualitySettings::clamp_preset(20), QualitySettings::PRESET_MAX);
        assert_eq!(QualitySettings::clamp_preset(0), 0);
    }

    #[test]
    fn stream_info_validates_bit_depth() {
        let mut info = sample_info();
        info.bit_depth = 16;
        assert!(info.validate().is_err());
    }

    #[test]
    fn stream_info_validates_frame_rate_bounds() {
        let mut info = sample_info();
        info.frame_rate = 301.0;
        assert!(info.validate().is_err());
        info.frame_rate = 300.0;
        assert!(info.validate().is_ok());
        info.frame_rate = 1.0;
        assert!(info.validate().is_ok());
    }

    fn sample_info() -> VideoStreamInfo {
        VideoStreamInfo {
            width: 1920,
            height: 1080,
            frame_rate: 23.976,
            pixel_format: "yuv420p".into(),
            bit_depth: 8,
            color_transfer: None,
            color_primaries: None,
            color_space: None,
            is_hdr: false,
            is_dolby_vision: false,
            hdr_info: None,
            crop_info: None,
            quality_settings: None,
            duration_secs: 3600.0,
        }
    }
}
