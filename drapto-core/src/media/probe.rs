// ============================================================================
// drapto-core/src/media/probe.rs
// ============================================================================
//
// PROBE & CLASSIFY (§4.1)
//
// Reads stream metadata via ffprobe and classifies dynamic range, including
// the Dolby Vision text-marker probe. Grounded in
// `drapto-core/src/media/probe.rs` (`FFprobe::execute`) and
// `detection/format.rs` (HDR classification precedence).
//
// AI-ASSISTANT-INFO: builds a `VideoStreamInfo` from raw probe output.

use std::path::Path;

use crate::error::{DraptoError, Result};
use crate::external::ffprobe::{bit_depth_from_pixel_format, parse_frame_rate, FfprobeExecutor, ProbeOutput};
use crate::external::mediainfo::DolbyVisionProbe;
use crate::types::{DynamicRange, HdrInfo, VideoStreamInfo};

/// Classifies dynamic range from color metadata plus a Dolby Vision probe.
/// Precedence (§4.1): Dolby Vision wins; then HDR10 (smpte2084 + bt2020);
/// then HLG (arib-std-b67/hlg); then SMPTE428; else SDR.
pub fn classify_dynamic_range(
    is_dolby_vision: bool,
    color_transfer: Option<&str>,
    color_primaries: Option<&str>,
) -> DynamicRange {
    if is_dolby_vision {
        return DynamicRange::DolbyVision;
    }
    let transfer = color_transfer.unwrap_or("").to_ascii_lowercase();
    let primaries = color_primaries.unwrap_or("").to_ascii_lowercase();
    if transfer == "smpte2084" && primaries == "bt2020" {
        DynamicRange::Hdr10
    } else if transfer == "arib-std-b67" || transfer == "hlg" {
        DynamicRange::Hlg
    } else if transfer.starts_with("smpte428") {
        DynamicRange::Smpte428
    } else {
        DynamicRange::Sdr
    }
}

/// Probes `path` and builds a validated `VideoStreamInfo` (§4.1).
pub fn analyze<P, D>(path: &Path, ffprobe: &P, dv_probe: &D) -> Result<VideoStreamInfo>
where
    P: FfprobeExecutor,
    D: DolbyVisionProbe,
{
    let probe_output: ProbeOutput = ffprobe.probe(path)?;
    let stream = probe_output
        .first_video_stream()
        .ok_or_else(|| DraptoError::InvalidStream("no video stream found".into()))?;

    let width = stream.width.ok_or_else(|| DraptoError::InvalidStream("missing width".into()))?;
    let height = stream.height.ok_or_else(|| DraptoError::InvalidStream("missing height".into()))?;
    let pixel_format = stream.pix_fmt.clone().unwrap_or_default();
    let bit_depth = bit_depth_from_pixel_format(&pixel_format)?;
    let frame_rate = stream.r_frame_rate.as_deref().map(parse_frame_rate).unwrap_or(0.0);
    let duration_secs = probe_output.duration_secs().unwrap_or(0.0);

    let is_dolby_vision = dv_probe.probe(path);
    let range = classify_dynamic_range(is_dolby_vision, stream.color_transfer.as_deref(), stream.color_primaries.as_deref());
    let is_hdr = !matches!(range, DynamicRange::Sdr);
    let hdr_info = if is_hdr || is_dolby_vision { Some(HdrInfo { range, black_level: None }) } else { None };

    let info = VideoStreamInfo {
        width,
        height,
        frame_rate,
        pixel_format,
        bit_depth,
        color_transfer: stream.color_transfer.clone(),
        color_primaries: stream.color_primaries.clone(),
        color_space: stream.color_space.clone(),
        is_hdr,
        is_dolby_vision,
        hdr_info,
        crop_info: None,
        quality_settings: None,
        duration_secs,
    };
    info.validate()?;
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::ffprobe::fake::FakeFfprobeExecutor;
    use crate::external::ffprobe::{ProbedFormat, ProbedStream};
    use crate::external::mediainfo::fake::FakeDolbyVisionProbe;

    fn sdr_stream() -> ProbedStream {
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

    #[test]
    fn classifies_hdr10() {
        let range = classify_dynamic_range(false, Some("smpte2084"), Some("bt2020"));
        assert_eq!(range, DynamicRange::Hdr10);
    }

    #[test]
    fn classifies_hlg() {
        assert_eq!(classify_dynamic_range(false, Some("arib-std-b67"), None), DynamicRange::Hlg);
    }

    #[test]
    fn dolby_vision_wins_precedence_over_hdr10_metadata() {
        let range = classify_dynamic_range(true, Some("smpte2084"), Some("bt2020"));
        assert_eq!(range, DynamicRange::DolbyVision);
    }

    #[test]
    fn analyze_rejects_stream_with_no_video() {
        let ffprobe = FakeFfprobeExecutor::new();
        let path = Path::new("in.mkv");
        ffprobe.expect(path, ProbeOutput { streams: vec![], format: None });
        let dv = FakeDolbyVisionProbe { present: false };
        assert!(analyze(path, &ffprobe, &dv).is_err());
    }

    #[test]
    fn analyze_builds_sdr_info() {
        let ffprobe = FakeFfprobeExecutor::new();
        let path = Path::new("in.mkv");
        ffprobe.expect(
            path,
            ProbeOutput {
                streams: vec![sdr_stream()],
                format: Some(ProbedFormat { duration: Some("3600.0".into()) }),
            },
        );
        let dv = FakeDolbyVisionProbe { present: false };
        let info = analyze(path, &ffprobe, &dv).unwrap();
        assert_eq!(info.width, 1920);
        assert!(!info.is_hdr);
        assert!((info.frame_rate - 23.976).abs() < 0.001);
    }

    #[test]
    fn analyze_rejects_16_bit_pixel_format() {
        let ffprobe = FakeFfprobeExecutor::new();
        let path = Path::new("in.mkv");
        let mut stream = sdr_stream();
        stream.pix_fmt = Some("yuv420p16le".into());
        ffprobe.expect(
            path,
            ProbeOutput { streams: vec![stream], format: Some(ProbedFormat { duration: Some("10".into()) }) },
        );
        let dv = FakeDolbyVisionProbe { present: false };
        assert!(analyze(path, &ffprobe, &dv).is_err());
    }
}
