// ============================================================================
// drapto-core/src/mux.rs
// ============================================================================
//
// MUXER (§4.8)
//
// Combines the encoded video, the encoded audio, and the original input
// (for subtitles/attachments/chapters) into the final Matroska container,
// all streams stream-copied. Grounded in `encoding/muxer.rs`'s
// `Muxer::build_mux_command`, simplified from the teacher's multi-track
// AV-sync-validating mux to the spec's fixed three-input mapping.
//
// AI-ASSISTANT-INFO: `-map` per input index, `-c copy` across the board.

use std::path::Path;

use crate::error::{DraptoError, Result};
use crate::external::tool::CommandRunner;

/// Builds the final mux command: input 0 = encoded video, input 1 = encoded
/// audio, input 2 = original source (subtitles/attachments/chapters only),
/// all streams stream-copied (§4.8).
fn build_mux_command(video_path: &Path, audio_path: &Path, original_input: &Path, output_path: &Path) -> std::process::Command {
    let mut cmd = std::process::Command::new("ffmpeg");
    cmd.args(["-hide_banner", "-loglevel", "warning", "-y"]);
    cmd.arg("-i").arg(video_path);
    cmd.arg("-i").arg(audio_path);
    cmd.arg("-i").arg(original_input);
    cmd.args(["-map", "0:v:0"]);
    cmd.args(["-map", "1:a:0"]);
    cmd.args(["-map", "2:s?"]);
    cmd.args(["-map", "2:t?"]);
    cmd.args(["-map_chapters", "2"]);
    cmd.args(["-c", "copy"]);
    cmd.arg(output_path);
    cmd
}

/// Muxes the three inputs into `output_path`. Fails with `MuxFailed` on tool
/// error or a missing/empty result.
pub fn mux<R: CommandRunner>(
    runner: &R,
    video_path: &Path,
    audio_path: &Path,
    original_input: &Path,
    output_path: &Path,
) -> Result<()> {
    let mut cmd = build_mux_command(video_path, audio_path, original_input, output_path);
    runner.run("ffmpeg (mux)", &mut cmd).map_err(|e| DraptoError::MuxFailed(e.to_string()))?;

    if !output_path.exists() || std::fs::metadata(output_path).map(|m| m.len()).unwrap_or(0) == 0 {
        return Err(DraptoError::MuxFailed(format!("muxed output missing or empty: {}", output_path.display())));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::tool::fake::FakeCommandRunner;

    #[test]
    fn build_mux_command_maps_video_audio_and_passthrough_from_original() {
        let cmd = build_mux_command(Path::new("v.mkv"), Path::new("a.mka"), Path::new("in.mkv"), Path::new("out.mkv"));
        let args: Vec<String> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "0:v:0"));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "1:a:0"));
        assert!(args.windows(2).any(|w| w[0] == "-map_chapters" && w[1] == "2"));
        assert!(args.iter().any(|a| a == "copy"));
    }

    #[test]
    fn fails_when_output_not_produced() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeCommandRunner::new();
        runner.expect_success("out.mkv", "");
        let err = mux(
            &runner,
            &dir.path().join("v.mkv"),
            &dir.path().join("a.mka"),
            &dir.path().join("in.mkv"),
            &dir.path().join("out.mkv"),
        )
        .unwrap_err();
        assert!(matches!(err, DraptoError::MuxFailed(_)));
    }

    #[test]
    fn succeeds_when_output_produced() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeCommandRunner::new();
        runner.expect_success("out.mkv", "");
        let output = dir.path().join("out.mkv");
        std::fs::write(&output, b"final").unwrap();
        mux(&runner, &dir.path().join("v.mkv"), &dir.path().join("a.mka"), &dir.path().join("in.mkv"), &output).unwrap();
    }
}
