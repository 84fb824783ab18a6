// ============================================================================
// drapto-core/src/state/mod.rs
// ============================================================================
//
// STATE TRACKER (§4.11): durable, crash-safe records of jobs, segments, and
// progress, backed by three JSON files per job area.
//
// AI-ASSISTANT-INFO: wires the persisted data model (`model`) to the
// advisory-locked JSON store (`store`).

pub mod model;
pub mod store;

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::Result;
pub use model::{EncodingJob, EncodingJobStats, JobStatus, Progress, Segment, SegmentStatus, Strategy};
use store::Envelope;

/// Filenames for the three state files per job area (§4.11, §6).
pub const SEGMENTS_FILE: &str = "segments.json";
pub const ENCODING_FILE: &str = "encoding.json";
pub const PROGRESS_FILE: &str = "progress.json";

/// Handle onto a job's three state files, rooted at a state directory.
#[derive(Debug, Clone)]
pub struct StateTracker {
    dir: PathBuf,
}

impl StateTracker {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        StateTracker { dir: dir.into() }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    pub fn load_job(&self) -> Result<EncodingJob> {
        let envelope: Envelope<EncodingJob> = store::load_or_init(&self.path(ENCODING_FILE), Utc::now())?;
        Ok(envelope.payload)
    }

    pub fn save_job(&self, job: &EncodingJob) -> Result<()> {
        store::update::<EncodingJob, _>(&self.path(ENCODING_FILE), Utc::now(), |slot| {
            *slot = job.clone();
        })?;
        Ok(())
    }

    pub fn load_progress(&self) -> Result<Progress> {
        let envelope: Envelope<Progress> = store::load_or_init(&self.path(PROGRESS_FILE), Utc::now())?;
        Ok(envelope.payload)
    }

    pub fn save_progress(&self, progress: &Progress) -> Result<()> {
        store::update::<Progress, _>(&self.path(PROGRESS_FILE), Utc::now(), |slot| {
            *slot = progress.clone();
        })?;
        Ok(())
    }

    pub fn segments_path(&self) -> PathBuf {
        self.path(SEGMENTS_FILE)
    }
}
