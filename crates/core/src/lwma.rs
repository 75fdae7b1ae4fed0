//! LWMA difficulty retarget over the last N blocks of one proof kind
//!
//! Solve times are weighted 1..=N from oldest to newest, so the target reacts
//! quickly to recent hashrate changes while older history still damps
//! oscillation.
//!
//! ```text
//! k          = N * (N + 1) * T / 2
//! avgTarget  = sum(target_i / N / k)
//! nextTarget = avgTarget * sum(i * solvetime_i)
//! ```
//!
//! The division by `k` happens per term. Applying it once at the end would
//! overflow the 256-bit accumulator on a young chain whose targets sit near
//! the limit, and the order of operations decides the exact bits every node
//! must agree on.

use tracing::{debug, warn};

use crate::arith::{U256, compact_from_target, target_from_compact};
use crate::block::{BlockRecord, ProofKind};
use crate::chain::ChainReader;
use crate::legacy::ema_step;
use crate::params::ConsensusParams;
use crate::window::{ProofWindow, count_stake_blocks, last_block_of_kind, sample_window};

/// Solve times above `MAX_SOLVETIME_FACTOR * T` count as exactly that.
pub const MAX_SOLVETIME_FACTOR: i64 = 6;

/// Required compact bits for the block after `last`, using LWMA.
///
/// `last` is normally the most recent block of `kind`.
pub fn next_work_lwma<C: ChainReader + ?Sized>(
    chain: &C,
    last: &BlockRecord,
    params: &ConsensusParams,
    kind: ProofKind,
) -> u32 {
    if params.no_retargeting(kind) {
        return last_block_of_kind(chain, last, kind).bits;
    }

    let spacing = params.pow_target_spacing;
    let window_size = params.lwma_averaging_window;
    let limit = params.proof_limit(kind);

    // A new chain gives away its first N + 1 blocks at the limit.
    if (last.height as i64) < window_size + 1 {
        return compact_from_target(&limit);
    }

    let window = sample_window(chain, last, (window_size + 1) as usize, kind);
    let full = window.len() as i64 > window_size;

    // Until the stake side has N + 1 blocks of history it retargets with a
    // single EMA step between its two most recent blocks.
    if kind == ProofKind::Stake && !full {
        let stake_blocks = count_stake_blocks(chain, last, 0) as i64;
        if stake_blocks <= window_size + 1 {
            debug!(stake_blocks, "PoS bootstrap, EMA retarget");
            return stake_bootstrap(chain, last, spacing, limit);
        }
    }

    if !full {
        warn!(
            %kind,
            height = last.height,
            samples = window.len(),
            "Short retarget window, using proof limit"
        );
        return compact_from_target(&limit);
    }

    match weighted_target(chain, last, &window, spacing, window_size) {
        Some(next) if !next.is_zero() && next <= limit => compact_from_target(&next),
        _ => compact_from_target(&limit),
    }
}

/// `avgTarget * sumWeightedSolvetimes` over a full window
fn weighted_target<C: ChainReader + ?Sized>(
    chain: &C,
    last: &BlockRecord,
    window: &ProofWindow,
    spacing: i64,
    window_size: i64,
) -> Option<U256> {
    let k = window_size * (window_size + 1) * spacing / 2;
    let n_div = U256::from(window_size as u64);
    let k_div = U256::from(k.max(1) as u64);

    let oldest = chain.ancestor(last, window.height(window_size as usize + 1)?)?;
    let mut previous_timestamp = oldest.time;

    let mut avg_target = U256::zero();
    let mut sum_weighted_solvetimes: i64 = 0;
    let mut weight: i64 = 0;

    for index in (1..=window_size as usize).rev() {
        let block = chain.ancestor(last, window.height(index)?)?;

        // Strictly increasing timestamps: never a negative or zero solve time.
        let this_timestamp = if block.time > previous_timestamp {
            block.time
        } else {
            previous_timestamp.saturating_add(1)
        };
        let solvetime =
            (MAX_SOLVETIME_FACTOR * spacing).min(this_timestamp.saturating_sub(previous_timestamp));
        previous_timestamp = this_timestamp;

        weight += 1;
        sum_weighted_solvetimes += solvetime * weight;

        avg_target += target_from_compact(block.bits) / n_div / k_div;
    }

    Some(avg_target.saturating_mul(U256::from(sum_weighted_solvetimes as u64)))
}

fn stake_bootstrap<C: ChainReader + ?Sized>(
    chain: &C,
    last: &BlockRecord,
    spacing: i64,
    limit: U256,
) -> u32 {
    let prev = last_block_of_kind(chain, last, ProofKind::Stake);
    let Some(before) = chain.predecessor(prev) else {
        return compact_from_target(&limit);
    };
    let prev_prev = last_block_of_kind(chain, before, ProofKind::Stake);
    if prev_prev.is_genesis() {
        return compact_from_target(&limit);
    }
    ema_step(prev, prev_prev, spacing, limit)
}
