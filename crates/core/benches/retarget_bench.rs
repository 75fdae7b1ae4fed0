//! Benchmarks for retargeting and the seeded hash path

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rx2_core::{
    BlockHash, BlockHeader, ChainReader, ChainStore, ConsensusParams, HashEngine, ProofKind,
    UHashLibrary, next_work_lwma, next_work_required,
};

fn build_chain(len: u32) -> ChainStore {
    let store = ChainStore::new(BlockHeader {
        hash: BlockHash([0xff; 32]),
        proof: ProofKind::Work,
        time: 0,
        bits: 0x1c00ffff,
    });
    for h in 1..=len {
        let mut hash = [0u8; 32];
        hash[..4].copy_from_slice(&h.to_le_bytes());
        let proof = if h.is_multiple_of(2) { ProofKind::Stake } else { ProofKind::Work };
        store
            .push(BlockHeader {
                hash: BlockHash(hash),
                proof,
                time: h as i64 * 75 + (h % 7) as i64 * 11,
                bits: 0x1c00ffff,
            })
            .unwrap();
    }
    store
}

fn bench_lwma(c: &mut Criterion) {
    let params = ConsensusParams::main();
    let store = build_chain(2_000);
    let view = store.read();
    let tip = view.tip();

    c.bench_function("lwma_pow_window_120", |b| {
        b.iter(|| next_work_lwma(&view, black_box(tip), &params, ProofKind::Work))
    });
    c.bench_function("next_work_required_pos", |b| {
        b.iter(|| next_work_required(&view, Some(black_box(tip)), tip.time + 150, &params, ProofKind::Stake))
    });
}

fn bench_hash_engine(c: &mut Criterion) {
    let engine = HashEngine::new(UHashLibrary);
    let seed = BlockHash([7; 32]);
    let header = [0x5au8; 80];

    c.bench_function("engine_hash", |b| {
        b.iter(|| engine.hash(black_box(&header), &seed).unwrap())
    });
    c.bench_function("engine_hash_memoized", |b| {
        b.iter(|| engine.hash_memoized(black_box(&header), &seed).unwrap())
    });
}

criterion_group!(benches, bench_lwma, bench_hash_engine);
criterion_main!(benches);
