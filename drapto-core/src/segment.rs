// ============================================================================
// drapto-core/src/segment.rs
// ============================================================================
//
// SEGMENTER (§4.4)
//
// Cuts the input into fixed-length, time-based chunks without re-encoding,
// preserving GOP boundaries via keyframe reset. Adapted from
// `drapto-core/src/encoding/segmentation.rs::segment_video`'s ffmpeg
// command-building idiom, generalized from scene-based splitting to the
// spec's fixed segment duration (the teacher's scene-boundary detector has
// no counterpart in SPEC_FULL.md).
//
// AI-ASSISTANT-INFO: time-based `-f segment` invocation, `%04d.mkv` naming,
// non-empty-file + prober validation per segment.

use std::path::{Path, PathBuf};

use crate::error::{DraptoError, Result};
use crate::external::ffprobe::FfprobeExecutor;
use crate::external::tool::CommandRunner;
use crate::state::Segment;

const MIN_SEGMENT_FILE_SIZE: u64 = 1024;

/// Builds the `ffmpeg -f segment` invocation used to split `input_path`
/// into `dir/%04d.mkv` chunks of `segment_length_secs`, stream-copying
/// video, dropping audio, and resetting timestamps per segment.
pub fn build_segment_command(input_path: &Path, dir: &Path, segment_length_secs: u32) -> std::process::Command {
    let mut cmd = std::process::Command::new("ffmpeg");
    cmd.args(["-hide_banner", "-loglevel", "warning"]);
    cmd.arg("-i").arg(input_path);
    cmd.args(["-c:v", "copy", "-an", "-sn"]);
    cmd.args(["-map", "0:v:0"]);
    cmd.args(["-f", "segment"]);
    cmd.args(["-segment_time", &segment_length_secs.to_string()]);
    cmd.args(["-reset_timestamps", "1"]);
    cmd.args(["-force_key_frames", &format!("expr:gte(t,n_forced*{segment_length_secs})")]);
    cmd.arg(dir.join("%04d.mkv"));
    cmd
}

/// Segments `input_path` into `dir`, validating the result per §4.4: the
/// segments directory must be non-empty, every file at least 1 KiB, and the
/// prober must succeed on each one. Any failure aborts the whole
/// segmentation; no partial segment set is returned.
pub fn segment<R, P>(
    runner: &R,
    ffprobe: &P,
    input_path: &Path,
    dir: &Path,
    segment_length_secs: u32,
) -> Result<Vec<Segment>>
where
    R: CommandRunner,
    P: FfprobeExecutor,
{
    std::fs::create_dir_all(dir)?;
    let mut cmd = build_segment_command(input_path, dir, segment_length_secs);
    runner.run("ffmpeg (segment)", &mut cmd)?;

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().map(|ext| ext == "mkv").unwrap_or(false))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(DraptoError::SegmentationFailed(format!(
            "segmentation produced no files in {}",
            dir.display()
        )));
    }

    let mut segments = Vec::with_capacity(files.len());
    for (index, path) in files.into_iter().enumerate() {
        let size = std::fs::metadata(&path)?.len();
        if size < MIN_SEGMENT_FILE_SIZE {
            return Err(DraptoError::SegmentationFailed(format!(
                "segment {} is only {size} bytes (minimum {MIN_SEGMENT_FILE_SIZE})",
                path.display()
            )));
        }
        let probed = ffprobe.probe(&path).map_err(|e| {
            DraptoError::SegmentationFailed(format!("prober failed on segment {}: {e}", path.display()))
        })?;
        let duration = probed.duration_secs().unwrap_or(segment_length_secs as f64);
        let total_frames = probed
            .first_video_stream()
            .map(|_| (duration * 24.0).round() as u64)
            .unwrap_or(0);

        segments.push(Segment {
            index: index as u32,
            input_path: path.clone(),
            output_path: path,
            status: crate::state::SegmentStatus::Pending,
            start_time: index as f64 * segment_length_secs as f64,
            duration,
            total_frames,
            progress: Default::default(),
            strategies_tried: Vec::new(),
            last_strategy: None,
            error: None,
        });
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::ffprobe::fake::FakeFfprobeExecutor;
    use crate::external::ffprobe::{ProbeOutput, ProbedFormat, ProbedStream};
    use crate::external::tool::fake::FakeCommandRunner;

    fn touch(path: &Path, size: usize) {
        std::fs::write(path, vec![0u8; size]).unwrap();
    }

    #[test]
    fn segment_rejects_empty_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let runner = FakeCommandRunner::new();
        runner.expect_success("in.mkv", "");
        let ffprobe = FakeFfprobeExecutor::new();
        let result = segment(&runner, &ffprobe, Path::new("in.mkv"), dir.path(), 15);
        assert!(result.is_err());
    }

    #[test]
    fn segment_rejects_undersized_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("0000.mkv"), 10);
        let runner = FakeCommandRunner::new();
        runner.expect_success("in.mkv", "");
        let ffprobe = FakeFfprobeExecutor::new();
        let result = segment(&runner, &ffprobe, Path::new("in.mkv"), dir.path(), 15);
        assert!(result.is_err());
    }

    #[test]
    fn segment_builds_sorted_segment_list_on_success() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("0001.mkv"), 2048);
        touch(&dir.path().join("0000.mkv"), 2048);
        let runner = FakeCommandRunner::new();
        runner.expect_success("in.mkv", "");
        let ffprobe = FakeFfprobeExecutor::new();
        ffprobe.expect(
            &dir.path().join("0000.mkv"),
            ProbeOutput { streams: vec![ProbedStream { codec_type: "video".into(), ..Default::default() }], format: Some(ProbedFormat { duration: Some("15.0".into()) }) },
        );
        ffprobe.expect(
            &dir.path().join("0001.mkv"),
            ProbeOutput { streams: vec![ProbedStream { codec_type: "video".into(), ..Default::default() }], format: Some(ProbedFormat { duration: Some("15.0".into()) }) },
        );
        let segments = segment(&runner, &ffprobe, Path::new("in.mkv"), dir.path(), 15).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].index, 0);
        assert_eq!(segments[1].index, 1);
    }
}
