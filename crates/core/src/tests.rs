//! Scenarios spanning the chain store, the retarget engines and the PoW path

use crate::engine::stub::{StubLibrary, count};
use crate::{
    BlockHash, BlockHeader, ChainReader, ChainStore, ConsensusParams, PowChecker, ProofKind,
    RetargetAlgorithm, SeedCachePolicy, U256, calculate_next_work, compact_from_target,
    next_work_lwma, next_work_required, target_from_compact,
};

const BITS: u32 = 0x1c00ffff;

fn block_hash(tag: u8, n: u32) -> BlockHash {
    let mut bytes = [0u8; 32];
    bytes[0] = tag;
    bytes[1..5].copy_from_slice(&n.to_le_bytes());
    BlockHash(bytes)
}

/// Genesis, one anchor block at time 1000, then one block per solve time.
fn chain_with_solvetimes(kind: ProofKind, solvetimes: &[i64]) -> ChainStore {
    let store = ChainStore::new(BlockHeader {
        hash: block_hash(0xff, 0),
        proof: ProofKind::Work,
        time: 0,
        bits: BITS,
    });
    let mut time = 1_000;
    store
        .push(BlockHeader {
            hash: block_hash(0, 1),
            proof: kind,
            time,
            bits: BITS,
        })
        .unwrap();
    for (i, solvetime) in solvetimes.iter().enumerate() {
        time += solvetime;
        store
            .push(BlockHeader {
                hash: block_hash(0, i as u32 + 2),
                proof: kind,
                time,
                bits: BITS,
            })
            .unwrap();
    }
    store
}

fn lwma_params() -> ConsensusParams {
    ConsensusParams {
        lwma_averaging_window: 5,
        pow_target_spacing: 150,
        ..ConsensusParams::main()
    }
}

fn lwma_bits(solvetimes: &[i64]) -> u32 {
    let store = chain_with_solvetimes(ProofKind::Work, solvetimes);
    let view = store.read();
    next_work_lwma(&view, view.tip(), &lwma_params(), ProofKind::Work)
}

#[test]
fn test_lwma_golden_value() {
    // Weighted sum 1*100 + 2*100 + 3*100 + 4*100 + 5*500 = 3500 against the
    // uniform 2250: the slow newest block dominates and the target eases.
    let bits = lwma_bits(&[100, 100, 100, 100, 500]);
    assert_eq!(bits, 0x1c018e37);

    let control = lwma_bits(&[150; 5]);
    assert_eq!(control, 0x1c00fffe);
    assert!(target_from_compact(bits) > target_from_compact(control));
}

#[test]
fn test_lwma_all_fast_blocks_harden() {
    let fast = lwma_bits(&[100; 5]);
    assert!(target_from_compact(fast) < target_from_compact(BITS));
}

#[test]
fn test_lwma_recent_solvetimes_weigh_more() {
    let older_slow = lwma_bits(&[500, 500, 100, 100, 100]);
    let newer_slow = lwma_bits(&[100, 100, 100, 500, 500]);
    assert_eq!(older_slow, 0x1c013331);
    assert_eq!(newer_slow, 0x1c024441);
    assert!(target_from_compact(newer_slow) > target_from_compact(older_slow));
}

#[test]
fn test_retarget_is_deterministic() {
    let store = chain_with_solvetimes(ProofKind::Work, &[120, 90, 400, 30, 150, 151, 149]);
    let view = store.read();
    let tip = view.tip();
    let lwma = lwma_params();
    let legacy = ConsensusParams {
        retarget_algorithm: RetargetAlgorithm::LegacyEma,
        ..lwma_params()
    };

    let first = next_work_required(&view, Some(tip), tip.time + 150, &lwma, ProofKind::Work);
    let prev_time = view.predecessor(tip).unwrap().time;
    let legacy_first = calculate_next_work(tip, prev_time, &legacy, ProofKind::Work);
    for _ in 0..10 {
        assert_eq!(
            next_work_required(&view, Some(tip), tip.time + 150, &lwma, ProofKind::Work),
            first
        );
        assert_eq!(calculate_next_work(tip, prev_time, &legacy, ProofKind::Work), legacy_first);
    }
}

#[test]
fn test_bootstrap_bound_for_young_chains() {
    let params = lwma_params();
    let limit_bits = compact_from_target(&params.pow_limit);
    for len in 0..5 {
        let store = chain_with_solvetimes(ProofKind::Work, &vec![10; len]);
        let view = store.read();
        assert!(view.tip().height < 6);
        assert_eq!(next_work_lwma(&view, view.tip(), &params, ProofKind::Work), limit_bits);
    }
}

#[test]
fn test_clamping_to_limit() {
    // Targets already at the limit with slow blocks push past it
    let params = lwma_params();
    let limit_bits = compact_from_target(&params.pow_limit);
    let store = ChainStore::new(BlockHeader {
        hash: block_hash(0xff, 0),
        proof: ProofKind::Work,
        time: 0,
        bits: limit_bits,
    });
    for h in 1..=8u32 {
        store
            .push(BlockHeader {
                hash: block_hash(0, h),
                proof: ProofKind::Work,
                time: h as i64 * 900,
                bits: limit_bits,
            })
            .unwrap();
    }
    let view = store.read();
    assert_eq!(
        next_work_lwma(&view, view.tip(), &params, ProofKind::Work),
        limit_bits
    );
}

#[test]
fn test_zero_target_clamps_to_limit() {
    // Target 1 truncates to zero in both engines
    const TINY: u32 = 0x03000001;
    let store = ChainStore::new(BlockHeader {
        hash: block_hash(0xff, 0),
        proof: ProofKind::Work,
        time: 0,
        bits: TINY,
    });
    for h in 1..=8u32 {
        store
            .push(BlockHeader {
                hash: block_hash(0, h),
                proof: ProofKind::Work,
                time: h as i64 * 150,
                bits: TINY,
            })
            .unwrap();
    }
    let view = store.read();
    let tip = view.tip();

    let lwma = lwma_params();
    assert_eq!(
        next_work_required(&view, Some(tip), 1_350, &lwma, ProofKind::Work),
        compact_from_target(&lwma.pow_limit)
    );

    // Linear blend: 1 * (5 * 150 + 2) / (7 * 150) truncates to zero
    let legacy = ConsensusParams {
        retarget_algorithm: RetargetAlgorithm::LegacyEma,
        qip9_height: u32::MAX,
        ..lwma_params()
    };
    assert_eq!(
        calculate_next_work(tip, tip.time - 1, &legacy, ProofKind::Work),
        compact_from_target(&legacy.pow_limit)
    );
}

#[test]
fn test_hybrid_chain_retargets_each_kind_separately() {
    let params = lwma_params();
    let store = ChainStore::new(BlockHeader {
        hash: block_hash(0xff, 0),
        proof: ProofKind::Work,
        time: 0,
        bits: BITS,
    });
    // Two PoW blocks for every PoS block, one block per 100s
    for h in 1..=30u32 {
        let proof = if h.is_multiple_of(3) { ProofKind::Stake } else { ProofKind::Work };
        store
            .push(BlockHeader {
                hash: block_hash(0, h),
                proof,
                time: h as i64 * 100,
                bits: BITS,
            })
            .unwrap();
    }
    let view = store.read();
    let tip = view.tip();
    let pow = next_work_required(&view, Some(tip), tip.time + 150, &params, ProofKind::Work);
    let pos = next_work_required(&view, Some(tip), tip.time + 150, &params, ProofKind::Stake);
    // PoW sees 150s average spacing, PoS 300s
    assert!(target_from_compact(pos) > target_from_compact(pow));
}

#[test]
fn test_seed_rotation_through_checker() {
    let params = ConsensusParams {
        rx2_seed_height: 1000,
        rx2_seed_interval: 100,
        ..ConsensusParams::regtest()
    };
    let store = ChainStore::new(BlockHeader {
        hash: block_hash(0xff, 0),
        proof: ProofKind::Work,
        time: 0,
        bits: 0x207fffff,
    });
    for h in 1..=1300u32 {
        store
            .push(BlockHeader {
                hash: block_hash(0, h),
                proof: ProofKind::Work,
                time: h as i64 * 150,
                bits: 0x207fffff,
            })
            .unwrap();
    }

    let library = StubLibrary::default();
    let counters = library.counters.clone();
    let checker = PowChecker::new(params, SeedCachePolicy::default(), library);
    let view = store.read();

    let seeds: Vec<BlockHash> = [1050, 1150, 1250]
        .iter()
        .map(|h| checker.pow_hash(&view, *h, b"header").unwrap().0)
        .collect();
    assert_eq!(seeds[0], block_hash(0xff, 0));
    assert_eq!(seeds[1], block_hash(0, 100));
    assert_eq!(seeds[2], block_hash(0, 200));
    assert_eq!(count(&counters.caches), 3);

    // Same window, same context
    let (again, _) = checker.pow_hash(&view, 1250, b"header").unwrap();
    assert_eq!(again, seeds[2]);
    assert_eq!(count(&counters.caches), 3);
}

#[test]
fn test_reorg_changes_retarget_inputs() {
    let params = lwma_params();
    let store = chain_with_solvetimes(ProofKind::Work, &[150; 10]);
    let before = {
        let view = store.read();
        next_work_lwma(&view, view.tip(), &params, ProofKind::Work)
    };

    // Longer branch from height 5 with fast blocks
    let mut parent = block_hash(0, 5);
    let mut time = store.read().at_height(5).unwrap().time;
    for h in 6..=13u32 {
        time += 60;
        store
            .insert(
                &parent,
                BlockHeader {
                    hash: block_hash(9, h),
                    proof: ProofKind::Work,
                    time,
                    bits: BITS,
                },
            )
            .unwrap();
        parent = block_hash(9, h);
    }
    let reorg = store.activate(&parent).unwrap();
    assert_eq!(reorg.disconnected, 6);
    assert_eq!(reorg.connected, 8);

    let view = store.read();
    let after = next_work_lwma(&view, view.tip(), &params, ProofKind::Work);
    assert!(target_from_compact(after) < target_from_compact(before));
}

#[test]
fn test_limit_constants_encode_canonically() {
    let params = ConsensusParams::main();
    assert_eq!(compact_from_target(&params.pow_limit), 0x1f00ffff);
    assert_eq!(compact_from_target(&params.pos_limit), 0x1d00ffff);
    assert_eq!(
        target_from_compact(0x1d00ffff),
        U256::from(0xffffu64) << 208usize
    );
}
