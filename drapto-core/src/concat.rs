// ============================================================================
// drapto-core/src/concat.rs
// ============================================================================
//
// CONCATENATOR (§4.6)
//
// Joins the encoded segments back into a single intermediate container via
// ffmpeg's concat demuxer, stream-copying everything. Grounded in
// `encoding/merger.rs::SegmentMerger::merge_segments`/`build_concat_command`,
// simplified to the spec's single responsibility: no faststart/duration
// validation here (that belongs to the Output Validator, §4.9).
//
// AI-ASSISTANT-INFO: concat manifest file + `ffmpeg -f concat` stream copy.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{DraptoError, Result};
use crate::external::tool::CommandRunner;

/// Writes the concat manifest listing `segments` in lexicographic order,
/// one `file '...'` line per segment (ffmpeg concat-demuxer syntax).
fn write_manifest(manifest_path: &Path, segments: &[PathBuf]) -> Result<()> {
    let mut file = File::create(manifest_path)?;
    for segment in segments {
        writeln!(file, "file '{}'", segment.to_string_lossy())?;
    }
    file.flush()?;
    Ok(())
}

fn build_concat_command(manifest_path: &Path, output_path: &Path) -> std::process::Command {
    let mut cmd = std::process::Command::new("ffmpeg");
    cmd.args(["-hide_banner", "-loglevel", "warning", "-y"]);
    cmd.args(["-f", "concat", "-safe", "0"]);
    cmd.arg("-i").arg(manifest_path);
    cmd.args(["-c", "copy"]);
    cmd.arg(output_path);
    cmd
}

/// Concatenates `segments` (already in the order they should play) into
/// `output_path`, writing the manifest alongside it in `dir`. Fails with
/// `ConcatFailed` carrying the tool's stderr on any error.
pub fn concat<R: CommandRunner>(runner: &R, dir: &Path, segments: &[PathBuf], output_path: &Path) -> Result<()> {
    if segments.is_empty() {
        return Err(DraptoError::ConcatFailed("no segments to concatenate".into()));
    }

    let mut sorted: Vec<PathBuf> = segments.to_vec();
    sorted.sort();

    let manifest_path = dir.join("concat.txt");
    write_manifest(&manifest_path, &sorted).map_err(|e| DraptoError::ConcatFailed(e.to_string()))?;

    let mut cmd = build_concat_command(&manifest_path, output_path);
    let result = runner.run("ffmpeg (concat)", &mut cmd);
    let _ = std::fs::remove_file(&manifest_path);
    result.map_err(|e| DraptoError::ConcatFailed(e.to_string()))?;

    if !output_path.exists() || std::fs::metadata(output_path).map(|m| m.len()).unwrap_or(0) == 0 {
        return Err(DraptoError::ConcatFailed(format!(
            "concatenated output missing or empty: {}",
            output_path.display()
        )));
    }
    Ok(())
}
