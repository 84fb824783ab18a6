// ============================================================================
// drapto-core/src/state/store.rs
// ============================================================================
//
// STATE TRACKER: crash-safe JSON persistence for `segments.json`,
// `encoding.json`, `progress.json` (§4.11).
//
// Writes: serialize to a temp file in the same directory, exclusive-lock it,
// fsync, close (dropping the lock), then atomically rename over the target.
// The lock is never held across the rename (§9) -- renames are atomic on
// their own on POSIX filesystems, and holding a lock across a rename just
// invites the lock file and the renamed-over file to disagree about which
// inode is locked.
//
// Reads: open with a shared advisory lock; on a missing or empty file,
// initialize with `T::default()` and persist it. A malformed file on the
// final read retry is replaced with the default (logged at WARN, never a
// panic) per §4.11.
//
// AI-ASSISTANT-INFO: advisory-locked, atomic-rename JSON store used for all
// durable pipeline state.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{DraptoError, Result};

/// Wraps a persisted payload with the `created_at`/`updated_at` envelope
/// every state file carries (§6).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Envelope<T> {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> Envelope<T> {
    pub fn new(payload: T, now: DateTime<Utc>) -> Self {
        Envelope { created_at: now, updated_at: now, payload }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

const MAX_READ_RETRIES: u32 = 3;

/// Reads `path` with a shared lock, deserializing into `Envelope<T>`. Missing
/// or empty files, and files that fail to parse after `MAX_READ_RETRIES`,
/// fall back to `Envelope::new(T::default(), now)` and are written back out.
pub fn load_or_init<T>(path: &Path, now: DateTime<Utc>) -> Result<Envelope<T>>
where
    T: Default + Serialize + DeserializeOwned,
{
    for attempt in 1..=MAX_READ_RETRIES {
        match read_locked::<T>(path) {
            Ok(Some(envelope)) => return Ok(envelope),
            Ok(None) => break,
            Err(err) if attempt < MAX_READ_RETRIES => {
                log::warn!(
                    "state file {} malformed on attempt {}/{}: {err}; retrying",
                    path.display(),
                    attempt,
                    MAX_READ_RETRIES
                );
            }
            Err(err) => {
                log::warn!(
                    "state file {} still malformed after {} attempts ({err}); re-initializing to default",
                    path.display(),
                    MAX_READ_RETRIES
                );
                break;
            }
        }
    }
    let envelope = Envelope::new(T::default(), now);
    save(path, &envelope)?;
    Ok(envelope)
}

fn read_locked<T>(path: &Path) -> Result<Option<Envelope<T>>>
where
    T: DeserializeOwned,
{
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(DraptoError::Io(err)),
    };
    file.lock_shared().map_err(|e| DraptoError::StateIOError(format!("failed to lock {}: {e}", path.display())))?;
    let mut contents = String::new();
    let read_result = file.read_to_string(&mut contents);
    FileExt::unlock(&file).ok();
    read_result.map_err(DraptoError::Io)?;
    if contents.trim().is_empty() {
        return Ok(None);
    }
    let envelope: Envelope<T> = serde_json::from_str(&contents)?;
    Ok(Some(envelope))
}

/// Writes `envelope` to `path` via write-to-temp-in-same-dir, exclusive
/// lock, fsync, atomic rename.
pub fn save<T>(path: &Path, envelope: &Envelope<T>) -> Result<()>
where
    T: Serialize,
{
    let dir = path.parent().ok_or_else(|| {
        DraptoError::StateIOError(format!("state path {} has no parent directory", path.display()))
    })?;
    fs::create_dir_all(dir)?;

    let tmp_path = temp_path_in(dir, path);
    {
        let mut tmp_file = OpenOptions::new().write(true).create(true).truncate(true).open(&tmp_path)?;
        tmp_file
            .lock_exclusive()
            .map_err(|e| DraptoError::StateIOError(format!("failed to lock {}: {e}", tmp_path.display())))?;
        let json = serde_json::to_string_pretty(envelope)?;
        tmp_file.write_all(json.as_bytes())?;
        tmp_file.sync_all()?;
        FileExt::unlock(&tmp_file).ok();
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn temp_path_in(dir: &Path, target: &Path) -> PathBuf {
    let file_name = target.file_name().and_then(|n| n.to_str()).unwrap_or("state");
    dir.join(format!(".{file_name}.tmp"))
}

/// Loads, mutates via `f`, bumps `updated_at`, and persists. The lock is
/// only ever held inside `load_or_init`/`save`, never spanning this whole
/// call, so a crash mid-mutation just leaves the prior durable state intact.
pub fn update<T, F>(path: &Path, now: DateTime<Utc>, f: F) -> Result<Envelope<T>>
where
    T: Default + Serialize + DeserializeOwned,
    F: FnOnce(&mut T),
{
    let mut envelope = load_or_init::<T>(path, now)?;
    f(&mut envelope.payload);
    envelope.touch(now);
    save(path, &envelope)?;
    Ok(envelope)
}
