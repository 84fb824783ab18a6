// ============================================================================
// drapto-core/src/state/model.rs
// ============================================================================
//
// Persisted records for the State Tracker (§4.11, §3): `EncodingJob`,
// `Segment`, `Progress`. Enum fields serialize to their lowercase names
// (§6); unknown values on load fall back to `pending`/`failed` per kind.
//
// AI-ASSISTANT-INFO: job/segment/progress data model, serde round-trippable.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Chunked,
    SinglePass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Initializing,
    Preparing,
    Encoding,
    Finalizing,
    Completed,
    Failed,
}

impl Default for JobStatus {
    /// Unknown values on load are treated as `failed` for jobs (§6).
    fn default() -> Self {
        JobStatus::Failed
    }
}

/// `#[serde(default)]` on the containing field only covers an *absent*
/// field; an unrecognized variant string still errors out of a derived
/// `Deserialize`. This hand-written impl instead falls back to
/// `JobStatus::default()` (`Failed`) for any unrecognized value (§6).
impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "pending" => JobStatus::Pending,
            "initializing" => JobStatus::Initializing,
            "preparing" => JobStatus::Preparing,
            "encoding" => JobStatus::Encoding,
            "finalizing" => JobStatus::Finalizing,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::default(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStatus {
    Pending,
    Encoding,
    Completed,
    Failed,
}

impl Default for SegmentStatus {
    /// Unknown values on load are treated as `pending` for segments (§6).
    fn default() -> Self {
        SegmentStatus::Pending
    }
}

/// See `JobStatus`'s hand-written impl above: unrecognized values fall back
/// to `SegmentStatus::default()` (`Pending`) rather than erroring (§6).
impl<'de> Deserialize<'de> for SegmentStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "pending" => SegmentStatus::Pending,
            "encoding" => SegmentStatus::Encoding,
            "completed" => SegmentStatus::Completed,
            "failed" => SegmentStatus::Failed,
            _ => SegmentStatus::default(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Progress {
    pub percent: f64,
    pub current_frame: u64,
    pub total_frames: u64,
    pub fps: f64,
    pub eta_seconds: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Progress {
    /// Recomputes the derived fields from a fresh frame count. Monotonicity
    /// of `current_frame` is not required: retries may reset it (§3).
    pub fn update(&mut self, current_frame: u64, total_frames: u64, fps: f64, now: DateTime<Utc>) {
        self.current_frame = current_frame;
        self.total_frames = total_frames;
        self.fps = fps;
        self.percent = if total_frames == 0 {
            0.0
        } else {
            (current_frame as f64 / total_frames as f64 * 100.0).min(100.0)
        };
        self.eta_seconds = if fps > 0.0 && total_frames > current_frame {
            ((total_frames - current_frame) as f64 / fps) as u64
        } else {
            0
        };
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.updated_at = Some(now);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub index: u32,
    pub input_path: std::path::PathBuf,
    pub output_path: std::path::PathBuf,
    #[serde(default)]
    pub status: SegmentStatus,
    pub start_time: f64,
    pub duration: f64,
    pub total_frames: u64,
    #[serde(default)]
    pub progress: Progress,
    /// Ordered, unique tags of the retry tiers attempted so far.
    #[serde(default)]
    pub strategies_tried: Vec<String>,
    pub last_strategy: Option<String>,
    pub error: Option<String>,
}

impl Segment {
    pub fn attempts(&self) -> usize {
        self.strategies_tried.len()
    }

    /// Records one retry-tier attempt. No-op if the tag was already recorded
    /// (strategies_tried has no duplicates, §8).
    pub fn record_attempt(&mut self, strategy_tag: &str) {
        if !self.strategies_tried.iter().any(|s| s == strategy_tag) {
            self.strategies_tried.push(strategy_tag.to_string());
        }
        self.last_strategy = Some(strategy_tag.to_string());
        self.status = SegmentStatus::Encoding;
    }

    pub fn mark_completed(&mut self) {
        self.status = SegmentStatus::Completed;
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = SegmentStatus::Failed;
        self.error = Some(error.into());
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EncodingJobStats {
    pub input_size: u64,
    pub output_size: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub vmaf_score: Option<f64>,
    pub segment_count: u32,
    pub encoded_frames: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingJob {
    pub id: String,
    pub input_path: std::path::PathBuf,
    pub output_path: std::path::PathBuf,
    pub strategy: Strategy,
    #[serde(default)]
    pub status: JobStatus,
    #[serde(default)]
    pub stats: EncodingJobStats,
    #[serde(default)]
    pub progress: Progress,
    #[serde(default)]
    pub segments: BTreeMap<u32, Segment>,
    pub error: Option<String>,
}

impl Default for EncodingJob {
    /// Used only as the state store's fallback when `encoding.json` is
    /// missing or unreadable (§4.11); a real job is always built via `new`.
    fn default() -> Self {
        EncodingJob {
            id: String::new(),
            input_path: std::path::PathBuf::new(),
            output_path: std::path::PathBuf::new(),
            strategy: Strategy::Chunked,
            status: JobStatus::default(),
            stats: EncodingJobStats::default(),
            progress: Progress::default(),
            segments: BTreeMap::new(),
            error: None,
        }
    }
}

impl EncodingJob {
    pub fn new(id: impl Into<String>, input_path: std::path::PathBuf, output_path: std::path::PathBuf, strategy: Strategy) -> Self {
        EncodingJob {
            id: id.into(),
            input_path,
            output_path,
            strategy,
            status: JobStatus::Pending,
            stats: EncodingJobStats::default(),
            progress: Progress::default(),
            segments: BTreeMap::new(),
            error: None,
        }
    }

    /// Job-level `encoded_frames` is recomputed by summing segment
    /// `current_frame` on each update rather than incremented, so retries
    /// stay consistent (§5).
    pub fn recompute_encoded_frames(&mut self) {
        self.stats.encoded_frames = self.segments.values().map(|s| s.progress.current_frame).sum();
    }

    pub fn any_segment_failed(&self) -> bool {
        self.segments.values().any(|s| s.status == SegmentStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_attempts_matches_strategies_tried_len_no_dupes() {
        let mut seg = sample_segment();
        seg.record_attempt("tier1");
        seg.record_attempt("tier2");
        seg.record_attempt("tier2");
        assert_eq!(seg.attempts(), 2);
        assert_eq!(seg.strategies_tried, vec!["tier1", "tier2"]);
    }

    #[test]
    fn unknown_status_json_falls_back_to_pending_for_segments() {
        let json = r#"{"index":0,"input_path":"a","output_path":"b","status":"bogus","start_time":0.0,"duration":1.0,"total_frames":10}"#;
        let seg: Segment = serde_json::from_str(json).unwrap();
        assert_eq!(seg.status, SegmentStatus::Pending);
    }

    #[test]
    fn unknown_status_json_falls_back_to_failed_for_jobs() {
        let json = r#"{"id":"j","input_path":"a","output_path":"b","strategy":"chunked","status":"bogus"}"#;
        let job: EncodingJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.status, JobStatus::Failed);
    }

    #[test]
    fn job_recompute_encoded_frames_sums_segments() {
        let mut job = EncodingJob::new("job1", "in.mkv".into(), "out.mkv".into(), Strategy::Chunked);
        let mut s0 = sample_segment();
        s0.progress.current_frame = 100;
        let mut s1 = sample_segment();
        s1.index = 1;
        s1.progress.current_frame = 50;
        job.segments.insert(0, s0);
        job.segments.insert(1, s1);
        job.recompute_encoded_frames();
        assert_eq!(job.stats.encoded_frames, 150);
    }

    fn sample_segment() -> Segment {
        Segment {
            index: 0,
            input_path: "in.mkv".into(),
            output_path: "out.mkv".into(),
            status: SegmentStatus::Pending,
            start_time: 0.0,
            duration: 15.0,
            total_frames: 360,
            progress: Progress::default(),
            strategies_tried: Vec::new(),
            last_strategy: None,
            error: None,
        }
    }
}
