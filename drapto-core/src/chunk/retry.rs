// ============================================================================
// drapto-core/src/chunk/retry.rs
// ============================================================================
//
// RETRY ESCALATOR (§4.5)
//
// Three fixed tiers widening the VMAF search space. Grounded in
// `drapto-core/src/encoding/video.rs`'s `AbAv1Encoder::get_retry_params` /
// `build_encode_command`, generalized to the spec's exact per-tier table and
// shared flag set (keyint=10s, harmonic_mean pooling with n_subsample=8).
//
// AI-ASSISTANT-INFO: tier parameter table + ab-av1-style command building.

use std::path::Path;

use crate::config::JobOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    First,
    Second,
    Third,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::First, Tier::Second, Tier::Third];

    /// Tag recorded into `Segment::strategies_tried` (§4.5, §8).
    pub fn tag(self) -> &'static str {
        match self {
            Tier::First => "tier1",
            Tier::Second => "tier2",
            Tier::Third => "tier3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierParams {
    pub sample_count: u32,
    pub sample_duration_secs: u32,
    pub min_vmaf: f64,
}

/// Per-tier parameters from the table in §4.5.
pub fn tier_params(tier: Tier, target_vmaf: f64, options: &JobOptions) -> TierParams {
    match tier {
        Tier::First => TierParams {
            sample_count: options.vmaf_sample_count,
            sample_duration_secs: options.vmaf_sample_length_secs,
            min_vmaf: target_vmaf,
        },
        Tier::Second => TierParams { sample_count: 6, sample_duration_secs: 2, min_vmaf: target_vmaf },
        Tier::Third => TierParams { sample_count: 6, sample_duration_secs: 2, min_vmaf: target_vmaf - 2.0 },
    }
}

const KEYINT_SECS: u32 = 10;
const VMAF_POOL: &str = "harmonic_mean";
const VMAF_N_SUBSAMPLE: u32 = 8;

/// Builds the VMAF-guided auto-encoder invocation for one tier attempt,
/// sharing the flags common to every tier (§4.5).
pub fn build_tier_command(
    input: &Path,
    output: &Path,
    tier: Tier,
    params: TierParams,
    preset: u8,
    svt_params: &str,
    crop_filter: Option<&str>,
) -> std::process::Command {
    let mut cmd = std::process::Command::new("ab-av1");
    cmd.arg("auto-encode");
    cmd.arg("--input").arg(input);
    cmd.arg("--output").arg(output);
    cmd.arg("--encoder").arg("libsvtav1");
    cmd.arg("--min-vmaf").arg(params.min_vmaf.to_string());
    cmd.arg("--preset").arg(preset.to_string());
    cmd.arg("--svt").arg(svt_params);
    cmd.arg("--keyint").arg(format!("{KEYINT_SECS}s"));
    cmd.arg("--samples").arg(params.sample_count.to_string());
    cmd.arg("--sample-duration").arg(format!("{}s", params.sample_duration_secs));
    cmd.arg("--vmaf").arg(format!("n_subsample={VMAF_N_SUBSAMPLE}:pool={VMAF_POOL}"));
    if let Some(filter) = crop_filter {
        cmd.arg("--vfilter").arg(filter);
    }
    let _ = tier;
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_params_match_spec_table() {
        let mut options = JobOptions::default();
        options.vmaf_sample_count = 3;
        options.vmaf_sample_length_secs = 1;
        let tier1 = tier_params(Tier::First, 93.0, &options);
        assert_eq!(tier1, TierParams { sample_count: 3, sample_duration_secs: 1, min_vmaf: 93.0 });
        let tier2 = tier_params(Tier::Second, 93.0, &options);
        assert_eq!(tier2, TierParams { sample_count: 6, sample_duration_secs: 2, min_vmaf: 93.0 });
        let tier3 = tier_params(Tier::Third, 93.0, &options);
        assert_eq!(tier3, TierParams { sample_count: 6, sample_duration_secs: 2, min_vmaf: 91.0 });
    }

    #[test]
    fn tier_tags_are_stable_and_unique() {
        let tags: Vec<_> = Tier::ALL.iter().map(|t| t.tag()).collect();
        assert_eq!(tags, vec!["tier1", "tier2", "tier3"]);
    }
}
