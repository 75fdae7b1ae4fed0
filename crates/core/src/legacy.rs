//! Per-block exponential moving average retarget
//!
//! The target moves every block toward the spacing goal. Before
//! `qip9_height` the blend is linear in the observed spacing; from
//! `qip9_height` on it is `target * exp(2 * (actual - T) / ((interval + 1) * T))`
//! with both terms scaled down by the stake-timestamp granularity.

use tracing::debug;

use crate::arith::{U256, compact_from_target, mul_exp, target_from_compact};
use crate::block::{BlockRecord, ProofKind};
use crate::params::ConsensusParams;

/// Next compact target after `last`, given the time of the block before it.
pub fn calculate_next_work(
    last: &BlockRecord,
    first_block_time: i64,
    params: &ConsensusParams,
    kind: ProofKind,
) -> u32 {
    if params.no_retargeting(kind) {
        return last.bits;
    }

    let height = last.height.saturating_add(1);
    let spacing = params.target_spacing(height);
    let interval = params.difficulty_adjustment_interval(height);
    let limit = params.proof_limit_at(kind, height);
    let mut actual = last.time.saturating_sub(first_block_time);
    let mut target = target_from_compact(last.bits);

    if height < params.qip9_height {
        if actual < 0 {
            actual = spacing;
        }
        actual = actual.min(spacing * 10);
        target = blend_linear(target, actual, spacing, interval);
    } else {
        if actual < 0 {
            actual = spacing;
        }
        actual = actual.min(spacing * 20);
        let granularity = params.stake_timestamp_mask(height) as i64 + 1;
        target = mul_exp(
            target,
            2 * (actual - spacing) / granularity,
            (interval + 1) * spacing / granularity,
        );
    }

    debug!(height, %kind, actual, "EMA retarget");
    clamp_to_limit(target, limit)
}

/// Single EMA step between two consecutive same-kind blocks.
///
/// This is the rule a hybrid chain uses while its stake side is still too
/// young for LWMA: interval 1, negative spacing counted as one second,
/// spacing capped at ten target spacings.
pub fn ema_step(prev: &BlockRecord, prev_prev: &BlockRecord, spacing: i64, limit: U256) -> u32 {
    let mut actual = prev.time.saturating_sub(prev_prev.time);
    if actual < 0 {
        actual = 1;
    }
    actual = actual.min(spacing * 10);

    let target = blend_linear(target_from_compact(prev.bits), actual, spacing, 1);
    clamp_to_limit(target, limit)
}

/// `target * ((interval - 1) * T + 2 * actual) / ((interval + 1) * T)`
fn blend_linear(target: U256, actual: i64, spacing: i64, interval: i64) -> U256 {
    let numerator = ((interval - 1) * spacing + 2 * actual).max(0) as u64;
    let denominator = ((interval + 1) * spacing).max(1) as u64;
    target.saturating_mul(U256::from(numerator)) / U256::from(denominator)
}

fn clamp_to_limit(target: U256, limit: U256) -> u32 {
    if target.is_zero() || target > limit {
        compact_from_target(&limit)
    } else {
        compact_from_target(&target)
    }
}
