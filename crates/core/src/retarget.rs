//! Required work for the next block
//!
//! Entry point for block-template construction and block validation. Applies
//! the genesis, first-block and minimum-difficulty rules, then hands over to
//! the configured [`RetargetAlgorithm`].

use tracing::debug;

use crate::arith::compact_from_target;
use crate::block::{BlockRecord, ProofKind};
use crate::chain::ChainReader;
use crate::legacy::calculate_next_work;
use crate::lwma::next_work_lwma;
use crate::params::{ConsensusParams, RetargetAlgorithm};
use crate::window::last_block_of_kind;

/// Compact bits a block of `kind` on top of `last` must carry.
///
/// `block_time` is the new block's timestamp; it only matters on networks
/// that allow minimum-difficulty blocks.
pub fn next_work_required<C: ChainReader + ?Sized>(
    chain: &C,
    last: Option<&BlockRecord>,
    block_time: i64,
    params: &ConsensusParams,
    kind: ProofKind,
) -> u32 {
    let height = last.map_or(0, |b| b.height.saturating_add(1));
    let limit_bits = compact_from_target(&params.proof_limit_at(kind, height));

    let Some(last) = last else {
        return limit_bits;
    };

    // First and second block of this kind
    let prev = last_block_of_kind(chain, last, kind);
    let Some(before) = chain.predecessor(prev) else {
        return limit_bits;
    };
    let prev_prev = last_block_of_kind(chain, before, kind);
    if prev_prev.is_genesis() {
        return limit_bits;
    }

    if params.pow_allow_min_difficulty_blocks {
        return min_difficulty_rule(chain, last, block_time, height, limit_bits, params);
    }

    debug!(
        height,
        %kind,
        algorithm = ?params.retarget_algorithm,
        "Computing next work"
    );
    match params.retarget_algorithm {
        RetargetAlgorithm::Lwma => next_work_lwma(chain, prev, params, kind),
        RetargetAlgorithm::LegacyEma => calculate_next_work(prev, prev_prev.time, params, kind),
    }
}

/// Test networks: a block arriving more than two spacings after the tip may
/// use the limit; otherwise it inherits the bits of the last block that was
/// not itself a minimum-difficulty exception.
fn min_difficulty_rule<C: ChainReader + ?Sized>(
    chain: &C,
    last: &BlockRecord,
    block_time: i64,
    height: u32,
    limit_bits: u32,
    params: &ConsensusParams,
) -> u32 {
    if block_time > last.time.saturating_add(params.target_spacing(height) * 2) {
        return limit_bits;
    }

    let mut cursor = last;
    while let Some(prev) = chain.predecessor(cursor) {
        let interval = params.difficulty_adjustment_interval(cursor.height).max(1);
        if cursor.height as i64 % interval == 0 || cursor.bits != limit_bits {
            break;
        }
        cursor = prev;
    }
    cursor.bits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arith::target_from_compact;
    use crate::block::{BlockHash, BlockHeader};
    use crate::chain::ChainStore;

    const BITS: u32 = 0x1c00ffff;

    fn store_with(blocks: &[(ProofKind, i64, u32)]) -> ChainStore {
        let store = ChainStore::new(BlockHeader {
            hash: BlockHash([0xaa; 32]),
            proof: ProofKind::Work,
            time: 0,
            bits: BITS,
        });
        for (i, (proof, time, bits)) in blocks.iter().enumerate() {
            let mut hash = [0u8; 32];
            hash[..4].copy_from_slice(&(i as u32 + 1).to_le_bytes());
            store
                .push(BlockHeader {
                    hash: BlockHash(hash),
                    proof: *proof,
                    time: *time,
                    bits: *bits,
                })
                .unwrap();
        }
        store
    }

    fn lwma_params() -> ConsensusParams {
        ConsensusParams {
            lwma_averaging_window: 3,
            pow_target_spacing: 150,
            ..ConsensusParams::main()
        }
    }

    #[test]
    fn test_no_previous_block_gives_limit() {
        let params = lwma_params();
        let store = store_with(&[]);
        let view = store.read();
        assert_eq!(
            next_work_required(&view, None, 0, &params, ProofKind::Work),
            compact_from_target(&params.pow_limit)
        );
    }

    #[test]
    fn test_first_and_second_block_of_kind_give_limit() {
        let params = lwma_params();
        let store = store_with(&[(ProofKind::Work, 150, BITS)]);
        let view = store.read();
        assert_eq!(
            next_work_required(&view, Some(view.tip()), 300, &params, ProofKind::Work),
            compact_from_target(&params.pow_limit)
        );
    }

    #[test]
    fn test_dispatches_on_algorithm() {
        let blocks: Vec<_> = (1..=10)
            .map(|i| (ProofKind::Work, i * 100, BITS))
            .collect();
        let store = store_with(&blocks);
        let view = store.read();
        let tip = view.tip();

        let lwma = lwma_params();
        assert_eq!(
            next_work_required(&view, Some(tip), 1_100, &lwma, ProofKind::Work),
            next_work_lwma(&view, tip, &lwma, ProofKind::Work)
        );

        let legacy = ConsensusParams {
            retarget_algorithm: RetargetAlgorithm::LegacyEma,
            ..lwma_params()
        };
        let prev_prev = view.predecessor(tip).unwrap();
        assert_eq!(
            next_work_required(&view, Some(tip), 1_100, &legacy, ProofKind::Work),
            calculate_next_work(tip, prev_prev.time, &legacy, ProofKind::Work)
        );
        // 100s blocks against a 150s goal
        assert!(
            target_from_compact(next_work_required(&view, Some(tip), 1_100, &lwma, ProofKind::Work))
                < target_from_compact(BITS)
        );
    }

    #[test]
    fn test_min_difficulty_rule_on_test_networks() {
        let params = ConsensusParams {
            pow_allow_min_difficulty_blocks: true,
            ..lwma_params()
        };
        let limit_bits = compact_from_target(&params.pow_limit);
        // Block 3 was a minimum-difficulty exception on top of block 2
        let store = store_with(&[
            (ProofKind::Work, 150, BITS),
            (ProofKind::Work, 300, BITS),
            (ProofKind::Work, 1_000, limit_bits),
        ]);
        let view = store.read();
        let tip = view.tip();

        // Late block may use the limit
        assert_eq!(
            next_work_required(&view, Some(tip), 1_000 + 301, &params, ProofKind::Work),
            limit_bits
        );
        // On-time block inherits the last real difficulty
        assert_eq!(
            next_work_required(&view, Some(tip), 1_000 + 150, &params, ProofKind::Work),
            BITS
        );
    }

    #[test]
    fn test_min_difficulty_rule_with_extreme_tip_time() {
        let params = ConsensusParams {
            pow_allow_min_difficulty_blocks: true,
            ..lwma_params()
        };
        let limit_bits = compact_from_target(&params.pow_limit);
        let store = store_with(&[
            (ProofKind::Work, 150, BITS),
            (ProofKind::Work, 300, BITS),
            (ProofKind::Work, i64::MAX, limit_bits),
        ]);
        let view = store.read();

        // The lateness bound saturates instead of wrapping past i64::MAX
        assert_eq!(
            next_work_required(&view, Some(view.tip()), i64::MAX, &params, ProofKind::Work),
            BITS
        );
    }
}
