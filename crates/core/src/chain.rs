//! Arena chain store and the read capability the consensus code walks
//!
//! Every block record lives in one `Vec`, addressed by [`BlockId`];
//! predecessor links are ids, never pointers. The active chain is a
//! height-indexed vector of ids. All state sits behind a single `RwLock`:
//! [`ChainStore::read`] hands out a [`ChainView`] guard, and holding it is
//! what entitles code to walk the chain. Block connect/disconnect takes the
//! write side, so a traversal always sees one consistent chain state.

use std::collections::HashMap;

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::info;

use crate::block::{BlockHash, BlockHeader, BlockId, BlockRecord};
use crate::error::ChainError;

/// Read-only access to the chain, valid only while the chain lock is held
pub trait ChainReader {
    fn record(&self, id: BlockId) -> &BlockRecord;

    /// Block at `height` on the active branch
    fn at_height(&self, height: u32) -> Option<&BlockRecord>;

    fn tip(&self) -> &BlockRecord;

    fn genesis(&self) -> &BlockRecord;

    fn find(&self, hash: &BlockHash) -> Option<&BlockRecord>;

    fn predecessor(&self, block: &BlockRecord) -> Option<&BlockRecord> {
        block.prev.map(|id| self.record(id))
    }

    /// Ancestor of `block` at `height` on `block`'s own branch
    fn ancestor<'a>(&'a self, block: &'a BlockRecord, height: u32) -> Option<&'a BlockRecord> {
        if height > block.height {
            return None;
        }
        let mut cursor = block;
        while cursor.height > height {
            cursor = self.predecessor(cursor)?;
        }
        Some(cursor)
    }
}

/// Outcome of switching the active tip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reorg {
    pub disconnected: u32,
    pub connected: u32,
}

#[derive(Debug)]
pub struct ChainState {
    blocks: Vec<BlockRecord>,
    by_hash: HashMap<BlockHash, BlockId>,
    active: Vec<BlockId>,
}

impl ChainState {
    fn new(genesis: BlockHeader) -> Self {
        let id = BlockId(0);
        let record = BlockRecord {
            id,
            height: 0,
            prev: None,
            hash: genesis.hash,
            proof: genesis.proof,
            time: genesis.time,
            bits: genesis.bits,
        };
        let mut by_hash = HashMap::new();
        by_hash.insert(record.hash, id);
        Self {
            blocks: vec![record],
            by_hash,
            active: vec![id],
        }
    }

    fn insert(&mut self, parent: &BlockHash, header: BlockHeader) -> Result<BlockId, ChainError> {
        if self.by_hash.contains_key(&header.hash) {
            return Err(ChainError::Duplicate(header.hash));
        }
        let parent_id = *self
            .by_hash
            .get(parent)
            .ok_or(ChainError::UnknownParent(*parent))?;
        let height = self.blocks[parent_id.0]
            .height
            .checked_add(1)
            .ok_or(ChainError::HeightOverflow)?;

        let id = BlockId(self.blocks.len());
        self.blocks.push(BlockRecord {
            id,
            height,
            prev: Some(parent_id),
            hash: header.hash,
            proof: header.proof,
            time: header.time,
            bits: header.bits,
        });
        self.by_hash.insert(header.hash, id);
        Ok(id)
    }

    fn is_active(&self, block: &BlockRecord) -> bool {
        self.active.get(block.height as usize) == Some(&block.id)
    }

    fn activate(&mut self, id: BlockId) -> Reorg {
        // Collect the new branch back to the fork point with the active chain.
        let mut branch = Vec::new();
        let mut cursor = &self.blocks[id.0];
        while !self.is_active(cursor) {
            branch.push(cursor.id);
            // Genesis is always active, so the walk terminates.
            let Some(prev) = cursor.prev else { break };
            cursor = &self.blocks[prev.0];
        }

        let fork_height = cursor.height as usize;
        let disconnected = (self.active.len() - 1 - fork_height) as u32;
        self.active.truncate(fork_height + 1);
        let connected = branch.len() as u32;
        self.active.extend(branch.into_iter().rev());

        Reorg {
            disconnected,
            connected,
        }
    }
}

impl ChainReader for ChainState {
    fn record(&self, id: BlockId) -> &BlockRecord {
        &self.blocks[id.0]
    }

    fn at_height(&self, height: u32) -> Option<&BlockRecord> {
        self.active
            .get(height as usize)
            .map(|id| &self.blocks[id.0])
    }

    fn tip(&self) -> &BlockRecord {
        let id = self.active[self.active.len() - 1];
        &self.blocks[id.0]
    }

    fn genesis(&self) -> &BlockRecord {
        &self.blocks[self.active[0].0]
    }

    fn find(&self, hash: &BlockHash) -> Option<&BlockRecord> {
        self.by_hash.get(hash).map(|id| &self.blocks[id.0])
    }

    fn ancestor<'a>(&'a self, block: &'a BlockRecord, height: u32) -> Option<&'a BlockRecord> {
        if height > block.height {
            return None;
        }
        if self.is_active(block) {
            return self.at_height(height);
        }
        let mut cursor = block;
        while cursor.height > height {
            cursor = self.predecessor(cursor)?;
        }
        Some(cursor)
    }
}

/// Shared chain store
#[derive(Debug)]
pub struct ChainStore {
    state: RwLock<ChainState>,
}

impl ChainStore {
    pub fn new(genesis: BlockHeader) -> Self {
        Self {
            state: RwLock::new(ChainState::new(genesis)),
        }
    }

    /// Take the shared chain lock for a traversal.
    pub fn read(&self) -> ChainView<'_> {
        ChainView {
            guard: self.state.read(),
        }
    }

    /// Store a block under `parent` without touching the active chain.
    pub fn insert(&self, parent: &BlockHash, header: BlockHeader) -> Result<BlockId, ChainError> {
        self.state.write().insert(parent, header)
    }

    /// Append a block on top of the active tip.
    pub fn push(&self, header: BlockHeader) -> Result<BlockId, ChainError> {
        let mut state = self.state.write();
        let parent = state.tip().hash;
        let id = state.insert(&parent, header)?;
        state.activate(id);
        Ok(id)
    }

    /// Make the branch ending at `hash` the active chain.
    pub fn activate(&self, hash: &BlockHash) -> Result<Reorg, ChainError> {
        let mut state = self.state.write();
        let id = state
            .find(hash)
            .map(|b| b.id)
            .ok_or(ChainError::UnknownBlock(*hash))?;
        let reorg = state.activate(id);
        if reorg.disconnected > 0 {
            info!(
                disconnected = reorg.disconnected,
                connected = reorg.connected,
                tip = %hash,
                "Chain reorganized"
            );
        }
        Ok(reorg)
    }
}

/// Read guard over the chain store; the chain-consistency lock capability
pub struct ChainView<'a> {
    guard: RwLockReadGuard<'a, ChainState>,
}

impl ChainReader for ChainView<'_> {
    fn record(&self, id: BlockId) -> &BlockRecord {
        self.guard.record(id)
    }

    fn at_height(&self, height: u32) -> Option<&BlockRecord> {
        self.guard.at_height(height)
    }

    fn tip(&self) -> &BlockRecord {
        self.guard.tip()
    }

    fn genesis(&self) -> &BlockRecord {
        self.guard.genesis()
    }

    fn find(&self, hash: &BlockHash) -> Option<&BlockRecord> {
        self.guard.find(hash)
    }

    fn ancestor<'a>(&'a self, block: &'a BlockRecord, height: u32) -> Option<&'a BlockRecord> {
        self.guard.ancestor(block, height)
    }
}
