// ============================================================================
// drapto-core/src/resource.rs
// ============================================================================
//
// RESOURCE MONITOR (§4.13)
//
// Reports CPU%, memory%, disk-free/percent, and gates pipeline admission on
// configured thresholds plus a projected chunk-footprint estimate. Grounded
// in `drapto-core/src/util/scheduler.rs`'s `MemoryAwareScheduler` (sysinfo
// usage pattern); this module fixes the single resource-monitor design §9
// calls for, dropping the scheduler's task-token bookkeeping (that lives in
// `chunk::pool` instead) and its tokio runtime, which this crate has no
// other use for.
//
// AI-ASSISTANT-INFO: admission gating + periodic resource snapshots.

use std::path::Path;

use sysinfo::System;

use crate::error::{DraptoError, Result};

#[derive(Debug, Clone, Copy)]
pub struct ResourceSnapshot {
    pub cpu_percent: f32,
    pub mem_percent: f32,
    pub disk_free_gb: f64,
    pub disk_percent: f32,
    pub active_encoders: u32,
}

pub struct ResourceMonitor {
    system: System,
}

impl ResourceMonitor {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu();
        system.refresh_memory();
        ResourceMonitor { system }
    }

    pub fn snapshot(&mut self, disk_path: &Path, active_encoders: u32) -> ResourceSnapshot {
        self.system.refresh_cpu();
        self.system.refresh_memory();

        let cpu_percent = if self.system.cpus().is_empty() {
            0.0
        } else {
            self.system.cpus().iter().map(|c| c.cpu_usage()).sum::<f32>() / self.system.cpus().len() as f32
        };

        let total_mem = self.system.total_memory().max(1);
        let mem_percent = self.system.used_memory() as f32 / total_mem as f32 * 100.0;

        let (disk_free_gb, disk_percent) = disk_usage_for(disk_path);

        ResourceSnapshot { cpu_percent, mem_percent, disk_free_gb, disk_percent, active_encoders }
    }
}

impl Default for ResourceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Free space / used-percent for the filesystem backing `path`. Uses `fs2`
/// (already pulled in for the state store's advisory locking, DESIGN.md)
/// rather than sysinfo's disk listing, which walks mount points the caller
/// doesn't otherwise need to enumerate.
fn disk_usage_for(path: &Path) -> (f64, f32) {
    let probe_dir = if path.is_dir() { path } else { path.parent().unwrap_or(path) };
    match (fs2::available_space(probe_dir), fs2::total_space(probe_dir)) {
        (Ok(available), Ok(total)) if total > 0 => {
            let free_gb = available as f64 / 1_073_741_824.0;
            let used_percent = (total - available) as f32 / total as f32 * 100.0;
            (free_gb, used_percent)
        }
        _ => (0.0, 100.0),
    }
}

/// Projected extra disk footprint a chunked encode needs on top of the
/// input size, per §4.13's formula.
pub fn projected_chunk_footprint(input_size_bytes: u64, segment_length_secs: u32, buffer_factor: f64) -> f64 {
    let segment_length = segment_length_secs.max(1) as f64;
    input_size_bytes as f64 * (1.0 + 1.0 / segment_length) * buffer_factor
}

/// Admission check run once at pipeline entry (§4.13). Fails with
/// `InsufficientResources` naming the first violated axis.
pub fn check_admission(
    snapshot: &ResourceSnapshot,
    min_disk_free_gb: u64,
    projected_footprint_bytes: f64,
    max_cpu_percent: f32,
    max_mem_percent: f32,
) -> Result<()> {
    let required_gb = min_disk_free_gb as f64 + projected_footprint_bytes / 1_073_741_824.0;
    if snapshot.disk_free_gb < required_gb {
        return Err(DraptoError::InsufficientResources(format!(
            "disk free {:.1} GB below required {:.1} GB",
            snapshot.disk_free_gb, required_gb
        )));
    }
    if snapshot.cpu_percent > max_cpu_percent {
        return Err(DraptoError::InsufficientResources(format!(
            "CPU usage {:.1}% above max {:.1}%",
            snapshot.cpu_percent, max_cpu_percent
        )));
    }
    if snapshot.mem_percent > max_mem_percent {
        return Err(DraptoError::InsufficientResources(format!(
            "memory usage {:.1}% above max {:.1}%",
            snapshot.mem_percent, max_mem_percent
        )));
    }
    Ok(())
}
