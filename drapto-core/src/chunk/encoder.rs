// ============================================================================
// drapto-core/src/chunk/encoder.rs
// ============================================================================
//
// CHUNK ENCODER (§4.5)
//
// Drives one segment through the retry escalator, recording every attempt in
// its `Segment` state. Grounded in `encoding/video.rs`'s
// `AbAv1Encoder::encode_segment`/`handle_segment_retry` (tier escalation on
// failure) and `parse_vmaf_scores` (VMAF regex, reused here only to confirm
// success rather than feed back into planning, since the auto-encoder tool
// itself enforces the VMAF floor).
//
// AI-ASSISTANT-INFO: per-segment tier loop + idempotent skip-if-exists.

use std::path::Path;

use log::{info, warn};

use crate::chunk::retry::{build_tier_command, tier_params, Tier};
use crate::config::JobOptions;
use crate::error::{DraptoError, Result};
use crate::external::tool::CommandRunner;
use crate::state::{Segment, SegmentStatus};
use crate::types::EncodingContext;

/// A tier "succeeds" iff the auto-encoder exits 0 AND the expected output
/// file exists non-empty (§4.5).
fn output_is_valid(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}

/// Encodes one segment, escalating through the three retry tiers until one
/// succeeds or all are exhausted. Idempotent: if `segment.output_path`
/// already exists non-empty, the segment is treated as already complete and
/// no tool is invoked (§4.5's skip condition).
pub fn encode_segment<R: CommandRunner>(
    runner: &R,
    segment: &mut Segment,
    context: &EncodingContext,
    options: &JobOptions,
) -> Result<()> {
    if output_is_valid(&segment.output_path) {
        info!("segment {} already encoded, skipping", segment.index);
        segment.mark_completed();
        return Ok(());
    }

    for tier in Tier::ALL {
        segment.record_attempt(tier.tag());
        let params = tier_params(tier, context.target_vmaf, options);
        let mut cmd = build_tier_command(
            &segment.input_path,
            &segment.output_path,
            tier,
            params,
            context.preset,
            &context.svt_params,
            context.crop_filter.as_deref(),
        );

        match runner.run("ab-av1 (auto-encode)", &mut cmd) {
            Ok(_) if output_is_valid(&segment.output_path) => {
                info!(
                    "segment {} encoded on {} (min-vmaf {:.1})",
                    segment.index,
                    tier.tag(),
                    params.min_vmaf
                );
                segment.mark_completed();
                return Ok(());
            }
            Ok(_) => {
                warn!(
                    "segment {} {} reported success but produced no usable output",
                    segment.index,
                    tier.tag()
                );
            }
            Err(err) => {
                warn!("segment {} {} failed: {err}", segment.index, tier.tag());
            }
        }
    }

    let reason = format!("exhausted all {} retry tiers", Tier::ALL.len());
    segment.mark_failed(reason.clone());
    Err(DraptoError::EncodeRetriesExhausted {
        segment: segment.index.to_string(),
        reason,
    })
}
