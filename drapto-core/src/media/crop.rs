// ============================================================================
// drapto-core/src/media/crop.rs
// ============================================================================
//
// CROP ANALYZER (§4.2)
//
// Samples frames via the demuxer/encoder's cropdetect filter to recommend an
// optional crop rectangle, with HDR-aware black-level thresholds and
// credits skipping. Grounded in `detection/format.rs`'s
// `determine_crop_threshold`/`run_hdr_blackdetect` (averaging variant,
// DESIGN.md open-question resolution) and
// `processing/detection/crop_analysis.rs` (per-frame alternative, behind
// the `hdr-per-frame-black-level` feature).
//
// AI-ASSISTANT-INFO: black-level threshold selection, credits-skip window,
// crop-tuple tallying with first-seen tie-break.

use std::collections::HashMap;

use regex::Regex;

use crate::error::Result;
use crate::external::tool::CommandRunner;
use crate::types::{CropInfo, DynamicRange};

/// Black-level threshold keyed on dynamic range classification (§4.2).
pub fn black_level_threshold(range: DynamicRange) -> u32 {
    match range {
        DynamicRange::Sdr => 24,
        DynamicRange::Hlg => 56,
        DynamicRange::Hdr10 | DynamicRange::DolbyVision => 64,
        DynamicRange::Smpte428 => 48,
    }
}

/// Credits-skip window (head_secs, tail_secs) chosen by duration (§4.2).
pub fn credits_skip_window(duration_secs: f64) -> (f64, f64) {
    if duration_secs <= 1800.0 {
        (30.0, 60.0)
    } else if duration_secs <= 3600.0 {
        (60.0, 120.0)
    } else {
        (120.0, 180.0)
    }
}

/// Averages measured black levels from blackdetect stderr output, scales by
/// 1.5, and clamps into [16, 256]. This is the default variant (DESIGN.md).
#[cfg(not(feature = "hdr-per-frame-black-level"))]
pub fn measure_hdr_black_level(blackdetect_stderr: &str) -> Option<u16> {
    let regex = Regex::new(r"black_level:\s*([0-9.]+)").unwrap();
    let levels: Vec<f64> = regex
        .captures_iter(blackdetect_stderr)
        .filter_map(|cap| cap.get(1)?.as_str().parse::<f64>().ok())
        .collect();
    if levels.is_empty() {
        return None;
    }
    let average = levels.iter().sum::<f64>() / levels.len() as f64;
    Some(crate::types::HdrInfo::clamp_measured(average * 1.5))
}

/// Per-frame clamp alternative: clamps each measured level individually
/// before taking the max, rather than averaging first. Documented
/// alternative behind `hdr-per-frame-black-level` (DESIGN.md).
#[cfg(feature = "hdr-per-frame-black-level")]
pub fn measure_hdr_black_level(blackdetect_stderr: &str) -> Option<u16> {
    let regex = Regex::new(r"black_level:\s*([0-9.]+)").unwrap();
    regex
        .captures_iter(blackdetect_stderr)
        .filter_map(|cap| cap.get(1)?.as_str().parse::<f64>().ok())
        .map(crate::types::HdrInfo::clamp_measured)
        .max()
}

/// Parses `crop=w:h:x:y` tuples from cropdetect stderr output and returns
/// the most-frequent tuple, ties broken by first-seen order (§4.2, §9).
pub fn most_frequent_crop_tuple(cropdetect_stderr: &str) -> Option<(u32, u32, u32, u32)> {
    let regex = Regex::new(r"crop=(\d+):(\d+):(\d+):(\d+)").unwrap();
    let mut counts: HashMap<(u32, u32, u32, u32), u32> = HashMap::new();
    let mut order: Vec<(u32, u32, u32, u32)> = Vec::new();
    for cap in regex.captures_iter(cropdetect_stderr) {
        let tuple = (
            cap[1].parse().ok()?,
            cap[2].parse().ok()?,
            cap[3].parse().ok()?,
            cap[4].parse().ok()?,
        );
        if !counts.contains_key(&tuple) {
            order.push(tuple);
        }
        *counts.entry(tuple).or_insert(0) += 1;
    }
    // `Iterator::max_by_key` returns the *last* of several equally-maximal
    // elements, so applying it directly to `order` would favor the
    // last-seen tuple among ties, not the first. Scan manually, only
    // replacing the current best on a strictly greater count.
    let mut best: Option<(u32, (u32, u32, u32, u32))> = None;
    for tuple in order {
        let count = counts[&tuple];
        if best.map(|(best_count, _)| count > best_count).unwrap_or(true) {
            best = Some((count, tuple));
        }
    }
    best.map(|(_, tuple)| tuple)
}

/// Builds a validated `CropInfo` from a dominant crop tuple, rejecting
/// insignificant insets (< 10px on both axes) and invalid rectangles.
pub fn build_crop_info(
    tuple: (u32, u32, u32, u32),
    source_width: u32,
    source_height: u32,
) -> Option<CropInfo> {
    let (width, height, x, y) = tuple;
    if x < CropInfo::INSIGNIFICANT_INSET && y < CropInfo::INSIGNIFICANT_INSET {
        return None;
    }
    let crop = CropInfo { x, y, width, height, enabled: true };
    crop.validate(source_width, source_height).ok()?;
    Some(crop)
}

/// Runs cropdetect over sampled frames within the credits-trimmed interior
/// (every 5s) and returns the recommended crop, or `None` if detection is
/// disabled, finds nothing significant, or fails validation.
pub fn detect_crop<R: CommandRunner>(
    runner: &R,
    input_path: &std::path::Path,
    range: DynamicRange,
    source_width: u32,
    source_height: u32,
    duration_secs: f64,
) -> Result<Option<CropInfo>> {
    let threshold = black_level_threshold(range);
    let (head_skip, tail_skip) = credits_skip_window(duration_secs);
    let interior = (duration_secs - head_skip - tail_skip).max(0.0);
    if interior <= 0.0 {
        return Ok(None);
    }

    let filter = format!("cropdetect=limit={threshold}:round=2:reset=1");
    let mut cmd = std::process::Command::new("ffmpeg");
    cmd.args(["-hide_banner", "-ss", &head_skip.to_string()]);
    cmd.args(["-i", &input_path.to_string_lossy()]);
    cmd.args(["-t", &interior.to_string()]);
    cmd.args(["-vf", &filter]);
    cmd.args(["-vsync", "vfr", "-f", "null", "-"]);

    let output = runner.run("ffmpeg (cropdetect)", &mut cmd)?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    let tuple = match most_frequent_crop_tuple(&stderr) {
        Some(t) => t,
        None => return Ok(None),
    };
    Ok(build_crop_info(tuple, source_width, source_height))
}
