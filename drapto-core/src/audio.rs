// ============================================================================
// drapto-core/src/audio.rs
// ============================================================================
//
// AUDIO ENCODER (§4.7)
//
// Probes the first audio stream, picks an Opus bitrate/layout from its
// channel count, and re-encodes it into the workspace. Grounded in
// `encoding/audio.rs`'s `OpusEncoder::build_encode_command`/
// `determine_bitrate`/`validate_encoded_audio`, collapsed from the teacher's
// per-track/global-config-driven table to the spec's fixed channel table.
//
// AI-ASSISTANT-INFO: channel->bitrate/layout table, Opus VBR command
// building, post-encode codec/channel validation.

use std::path::Path;

use crate::error::{DraptoError, Result};
use crate::external::ffprobe::FfprobeExecutor;
use crate::external::tool::CommandRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioLayout {
    pub name: &'static str,
    pub bitrate: &'static str,
}

/// Channel count -> (layout, bitrate) per §4.7's table. Anything other than
/// 1/2/6/8 channels is downmixed to stereo at 128k.
pub fn layout_for_channels(channels: u32) -> AudioLayout {
    match channels {
        1 => AudioLayout { name: "mono", bitrate: "64k" },
        2 => AudioLayout { name: "stereo", bitrate: "128k" },
        6 => AudioLayout { name: "5.1", bitrate: "256k" },
        8 => AudioLayout { name: "7.1", bitrate: "384k" },
        _ => AudioLayout { name: "stereo", bitrate: "128k" },
    }
}

const COMPRESSION_LEVEL: u8 = 10;
const FRAME_DURATION_MS: u32 = 20;

fn build_encode_command(input_path: &Path, output_path: &Path, layout: AudioLayout) -> std::process::Command {
    let mut cmd = std::process::Command::new("ffmpeg");
    cmd.args(["-hide_banner", "-loglevel", "warning"]);
    cmd.arg("-i").arg(input_path);
    cmd.args(["-map", "0:a:0"]);
    cmd.args(["-c:a", "libopus"]);
    cmd.args(["-af", "aformat=channel_layouts=7.1|5.1|stereo|mono"]);
    cmd.args(["-application", "audio"]);
    cmd.args(["-vbr", "on"]);
    cmd.args(["-compression_level", &COMPRESSION_LEVEL.to_string()]);
    cmd.args(["-frame_duration", &FRAME_DURATION_MS.to_string()]);
    cmd.args(["-b:a", layout.bitrate]);
    cmd.args(["-avoid_negative_ts", "make_zero"]);
    cmd.arg("-y").arg(output_path);
    cmd
}

/// Re-probes the encoded output and asserts codec=opus, a channel count
/// consistent with the selected layout, and a matching channel-layout
/// string (§4.7).
fn validate_encoded_audio<P: FfprobeExecutor>(ffprobe: &P, output_path: &Path, layout: AudioLayout) -> Result<()> {
    let probed = ffprobe
        .probe(output_path)
        .map_err(|e| DraptoError::AudioEncodeFailed(format!("failed to probe encoded audio: {e}")))?;
    let stream = probed
        .first_audio_stream()
        .ok_or_else(|| DraptoError::AudioEncodeFailed("no audio stream in encoded output".into()))?;
    if stream.codec_name != "opus" {
        return Err(DraptoError::AudioEncodeFailed(format!(
            "encoded output has wrong codec: {}",
            stream.codec_name
        )));
    }
    let expected_channels = expected_channel_count(layout);
    if let Some(channels) = stream.channels {
        if channels != expected_channels {
            return Err(DraptoError::AudioEncodeFailed(format!(
                "encoded audio has {channels} channels, expected {expected_channels} for layout {}",
                layout.name
            )));
        }
    }
    if let Some(reported_layout) = &stream.channel_layout {
        if reported_layout != layout.name {
            return Err(DraptoError::AudioEncodeFailed(format!(
                "encoded audio has channel layout {reported_layout}, expected {}",
                layout.name
            )));
        }
    }
    Ok(())
}

fn expected_channel_count(layout: AudioLayout) -> u32 {
    match layout.name {
        "mono" => 1,
        "stereo" => 2,
        "5.1" => 6,
        "7.1" => 8,
        _ => 2,
    }
}

/// Encodes the first audio stream of `input_path` into `dir/audio.mka`,
/// returning its path. Fails with `AudioEncodeFailed` on tool or validation
/// error.
pub fn encode_audio<R, P>(runner: &R, ffprobe: &P, input_path: &Path, dir: &Path) -> Result<std::path::PathBuf>
where
    R: CommandRunner,
    P: FfprobeExecutor,
{
    let probed = ffprobe
        .probe(input_path)
        .map_err(|e| DraptoError::AudioEncodeFailed(format!("failed to probe input audio: {e}")))?;
    let stream = probed
        .first_audio_stream()
        .ok_or_else(|| DraptoError::AudioEncodeFailed("input has no audio stream".into()))?;
    let channels = stream.channels.unwrap_or(2);
    let layout = layout_for_channels(channels);

    std::fs::create_dir_all(dir)?;
    let output_path = dir.join("audio.mka");
    let mut cmd = build_encode_command(input_path, &output_path, layout);
    runner
        .run("ffmpeg (audio encode)", &mut cmd)
        .map_err(|e| DraptoError::AudioEncodeFailed(e.to_string()))?;

    validate_encoded_audio(ffprobe, &output_path, layout)?;
    Ok(output_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::ffprobe::fake::FakeFfprobeExecutor;
    use crate::external::ffprobe::{ProbeOutput, ProbedFormat, ProbedStream};
    use crate::external::tool::fake::FakeCommandRunner;

    #[test]
    fn layout_table_matches_spec() {
        assert_eq!(layout_for_channels(1), AudioLayout { name: "mono", bitrate: "64k" });
        assert_eq!(layout_for_channels(2), AudioLayout { name: "stereo", bitrate: "128k" });
        assert_eq!(layout_for_channels(6), AudioLayout { name: "5.1", bitrate: "256k" });
        assert_eq!(layout_for_channels(8), AudioLayout { name: "7.1", bitrate: "384k" });
        assert_eq!(layout_for_channels(3), AudioLayout { name: "stereo", bitrate: "128k" });
    }

    #[test]
    fn encode_audio_selects_51_layout_and_validates() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mkv");
        std::fs::write(&input, b"x").unwrap();

        let runner = FakeCommandRunner::new();
        runner.expect_success("audio.mka", "");

        let ffprobe = FakeFfprobeExecutor::new();
        ffprobe.expect(
            &input,
            ProbeOutput {
                streams: vec![ProbedStream { codec_type: "audio".into(), channels: Some(6), ..Default::default() }],
                format: Some(ProbedFormat { duration: Some("10.0".into()) }),
            },
        );
        let output_path = dir.path().join("audio.mka");
        ffprobe.expect(
            &output_path,
            ProbeOutput {
                streams: vec![ProbedStream {
                    codec_type: "audio".into(),
                    codec_name: "opus".into(),
                    channels: Some(6),
                    channel_layout: Some("5.1".into()),
                    ..Default::default()
                }],
                format: None,
            },
        );

        let result = encode_audio(&runner, &ffprobe, &input, dir.path()).unwrap();
        assert_eq!(result, output_path);
    }

    #[test]
    fn rejects_channel_layout_mismatch_after_encode() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mkv");
        std::fs::write(&input, b"x").unwrap();

        let runner = FakeCommandRunner::new();
        runner.expect_success("audio.mka", "");

        let ffprobe = FakeFfprobeExecutor::new();
        ffprobe.expect(
            &input,
            ProbeOutput {
                streams: vec![ProbedStream { codec_type: "audio".into(), channels: Some(6), ..Default::default() }],
                format: None,
            },
        );
        let output_path = dir.path().join("audio.mka");
        ffprobe.expect(
            &output_path,
            ProbeOutput {
                streams: vec![ProbedStream {
                    codec_type: "audio".into(),
                    codec_name: "opus".into(),
                    channels: Some(6),
                    channel_layout: Some("stereo".into()),
                    ..Default::default()
                }],
                format: None,
            },
        );

        let err = encode_audio(&runner, &ffprobe, &input, dir.path()).unwrap_err();
        assert!(matches!(err, DraptoError::AudioEncodeFailed(_)));
    }

    #[test]
    fn rejects_channel_mismatch_after_encode() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.mkv");
        std::fs::write(&input, b"x").unwrap();

        let runner = FakeCommandRunner::new();
        runner.expect_success("audio.mka", "");

        let ffprobe = FakeFfprobeExecutor::new();
        ffprobe.expect(
            &input,
            ProbeOutput {
                streams: vec![ProbedStream { codec_type: "audio".into(), channels: Some(2), ..Default::default() }],
                format: None,
            },
        );
        let output_path = dir.path().join("audio.mka");
        ffprobe.expect(
            &output_path,
            ProbeOutput {
                streams: vec![ProbedStream { codec_type: "audio".into(), codec_name: "opus".into(), channels: Some(1), ..Default::default() }],
                format: None,
            },
        );

        let err = encode_audio(&runner, &ffprobe, &input, dir.path()).unwrap_err();
        assert!(matches!(err, DraptoError::AudioEncodeFailed(_)));
    }
}
