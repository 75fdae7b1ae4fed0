//! Proof-of-work target check

use crate::arith::decode_compact;
use crate::block::BlockHash;
use crate::params::ConsensusParams;

/// Whether `hash` satisfies the compact target `bits`.
///
/// Malformed bits (negative, zero, overflowing, or easier than the PoW
/// limit) are a rejection, not an error. The PoW limit bounds every block
/// regardless of proof kind.
pub fn check_proof_of_work(hash: &BlockHash, bits: u32, params: &ConsensusParams) -> bool {
    let decoded = decode_compact(bits);
    if !decoded.is_valid() || decoded.target > params.pow_limit {
        return false;
    }
    hash.to_u256() <= decoded.target
}
