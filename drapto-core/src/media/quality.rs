// ============================================================================
// drapto-core/src/media/quality.rs
// ============================================================================
//
// QUALITY PLANNER (§4.3)
//
// Pure mapping from `VideoStreamInfo` to `QualitySettings` per §3's rules.
// No I/O. Grounded in `drapto-core/src/config.rs`'s default quality
// constants, generalized to the spec's exact CRF/bitrate table.
//
// AI-ASSISTANT-INFO: deterministic quality planning, no side effects.

use crate::config::{DEFAULT_CRF_HD_UHD, DEFAULT_CRF_SD};
use crate::types::{QualitySettings, VideoStreamInfo};

const SD_MAX_BITRATE: u64 = 4_000_000;
const HD_MAX_BITRATE: u64 = 8_000_000;
const UHD_MAX_BITRATE: u64 = 16_000_000;

/// SVT-AV1 parameter string shared by all resolutions; callers append
/// HDR-specific tokens (§4.10) when needed.
const BASE_SVT_PARAMS: &str = "tune=0:film-grain=0";

/// Plans CRF/bitrate/preset for a given stream (§3, §4.3).
pub fn plan(info: &VideoStreamInfo, preset: u8) -> QualitySettings {
    let is_sd = info.width <= 1920 && info.height <= 1080;
    let crf = if is_sd { DEFAULT_CRF_SD } else { DEFAULT_CRF_HD_UHD };

    // Bitrate tiers are resolution buckets distinct from the two-tier CRF
    // split above: SD (<=720p), HD (<=1080p), UHD (>1080p). Scenario 1
    // (1920x1080) lands in the HD bitrate tier at 8 Mbps even though its
    // CRF (25) comes from the "<=1080p" bucket.
    let base_bitrate = if info.width <= 1280 && info.height <= 720 {
        SD_MAX_BITRATE
    } else if info.width <= 1920 && info.height <= 1080 {
        HD_MAX_BITRATE
    } else {
        UHD_MAX_BITRATE
    };
    let max_bitrate = if info.frame_rate > 30.0 {
        (base_bitrate as f64 * 1.5) as u64
    } else {
        base_bitrate
    };
    let buffer_size = max_bitrate * 2;

    QualitySettings {
        crf,
        preset: QualitySettings::clamp_preset(preset),
        max_bitrate,
        buffer_size,
        pixel_format: info.pixel_format.clone(),
        svt_params: BASE_SVT_PARAMS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(width: u32, height: u32, frame_rate: f64, pixel_format: &str) -> VideoStreamInfo {
        VideoStreamInfo {
            width,
            height,
            frame_rate,
            pixel_format: pixel_format.into(),
            bit_depth: 8,
            color_transfer: None,
            color_primaries: None,
            color_space: None,
            is_hdr: false,
            is_dolby_vision: false,
            hdr_info: None,
            crop_info: None,
            quality_settings: None,
            duration_secs: 0.0,
        }
    }

    #[test]
    fn scenario_1_1080p_sdr_23976() {
        let settings = plan(&info(1920, 1080, 23.976, "yuv420p"), 6);
        assert_eq!(settings.crf, 25);
        assert_eq!(settings.preset, 6);
        assert_eq!(settings.max_bitrate, 8_000_000);
        assert_eq!(settings.buffer_size, 16_000_000);
        assert_eq!(settings.pixel_format, "yuv420p");
    }

    #[test]
    fn scenario_2_uhd_hdr10_24fps() {
        let settings = plan(&info(3840, 2160, 24.0, "yuv420p10le"), 6);
        assert_eq!(settings.crf, 29);
        assert_eq!(settings.max_bitrate, 16_000_000);
        assert_eq!(settings.buffer_size, 32_000_000);
        assert_eq!(settings.pixel_format, "yuv420p10le");
    }

    #[test]
    fn scenario_3_1080p_60fps_high_fps_multiplier() {
        let settings = plan(&info(1920, 1080, 60.0, "yuv420p"), 6);
        assert_eq!(settings.max_bitrate, 12_000_000);
        assert_eq!(settings.buffer_size, 24_000_000);
    }

    #[test]
    fn preset_is_clamped_for_all_call_sites() {
        let settings = plan(&info(1920, 1080, 24.0, "yuv420p"), 99);
        assert_eq!(settings.preset, QualitySettings::PRESET_MAX);
    }
}
