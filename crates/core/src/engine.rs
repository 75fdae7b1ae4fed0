//! Seeded hash context
//!
//! A memory-hard hash needs an expensive cache derived from a seed and a VM
//! bound to that cache. [`HashEngine`] owns exactly one `(seed, cache, vm)`
//! context behind a mutex, builds it on first use and rebuilds it when the
//! requested seed changes. Callers that want parallel hashing run one engine
//! per worker thread.
//!
//! ```text
//! Uninitialized --hash(seed)--> Ready(seed)
//! Ready(seed)   --hash(seed)--> Ready(seed)          (memo hit possible)
//! Ready(seed)   --hash(new)---> Ready(new)           (teardown, rebuild)
//! ```

use parking_lot::Mutex;
use tracing::{error, info};

use crate::block::BlockHash;
use crate::error::{EngineError, HashLibraryError};

/// The memory-hard hash primitive as the engine consumes it
pub trait HashLibrary {
    type Flags: Copy + Send;
    type Cache: Send;
    type Vm: Send;

    fn flags(&self) -> Self::Flags;

    fn allocate_cache(&self, flags: Self::Flags) -> Result<Self::Cache, HashLibraryError>;

    fn init_cache(&self, cache: &mut Self::Cache, seed: &[u8]) -> Result<(), HashLibraryError>;

    fn create_vm(&self, flags: Self::Flags, cache: &Self::Cache) -> Result<Self::Vm, HashLibraryError>;

    fn destroy_vm(&self, vm: Self::Vm) {
        drop(vm);
    }

    fn release_cache(&self, cache: Self::Cache) {
        drop(cache);
    }

    fn compute_hash(&self, vm: &mut Self::Vm, data: &[u8]) -> Result<[u8; 32], HashLibraryError>;
}

/// Seed material handed to the hash library: display-order hex of the seed
/// hash, 64 lowercase ASCII characters.
pub fn seed_key(seed: &BlockHash) -> Vec<u8> {
    seed.to_hex().into_bytes()
}

struct HashContext<L: HashLibrary> {
    seed: BlockHash,
    cache: L::Cache,
    vm: L::Vm,
    memo: Option<(Vec<u8>, [u8; 32])>,
}

/// Process-wide hash context, serialized by one lock
pub struct HashEngine<L: HashLibrary> {
    library: L,
    context: Mutex<Option<HashContext<L>>>,
}

impl<L: HashLibrary> HashEngine<L> {
    pub fn new(library: L) -> Self {
        Self {
            library,
            context: Mutex::new(None),
        }
    }

    /// Seed of the live context, if one has been built.
    pub fn current_seed(&self) -> Option<BlockHash> {
        self.context.lock().as_ref().map(|ctx| ctx.seed)
    }

    /// Hash `data` under `seed`.
    pub fn hash(&self, data: &[u8], seed: &BlockHash) -> Result<[u8; 32], EngineError> {
        let mut guard = self.context.lock();
        let ctx = self.ready(&mut guard, seed)?;
        let out = self.library.compute_hash(&mut ctx.vm, data)?;
        ctx.memo = None;
        Ok(out)
    }

    /// Hash `data` under `seed`, answering from the one-entry memo when the
    /// input is byte-identical to the previous memoized call.
    pub fn hash_memoized(&self, data: &[u8], seed: &BlockHash) -> Result<[u8; 32], EngineError> {
        let mut guard = self.context.lock();
        let ctx = self.ready(&mut guard, seed)?;

        if let Some((input, output)) = &ctx.memo
            && input.as_slice() == data
        {
            return Ok(*output);
        }

        let out = self.library.compute_hash(&mut ctx.vm, data)?;
        ctx.memo = Some((data.to_vec(), out));
        Ok(out)
    }

    /// Context for `seed`, built or rotated as needed.
    fn ready<'a>(
        &self,
        slot: &'a mut Option<HashContext<L>>,
        seed: &BlockHash,
    ) -> Result<&'a mut HashContext<L>, EngineError> {
        let stale = slot.as_ref().is_some_and(|ctx| ctx.seed != *seed);
        if stale && let Some(old) = slot.take() {
            info!(old = %old.seed, new = %seed, "Rotating hash context");
            self.teardown(old);
        }

        if slot.is_none() {
            let ctx = self.build(seed).map_err(|source| {
                error!(seed = %seed, error = %source, "Hash context allocation failed");
                EngineError::Context {
                    seed: *seed,
                    source,
                }
            })?;
            info!(seed = %seed, "Hash context ready");
            *slot = Some(ctx);
        }

        slot.as_mut().ok_or_else(|| EngineError::Context {
            seed: *seed,
            source: HashLibraryError::CacheAllocation("context missing after build".into()),
        })
    }

    fn build(&self, seed: &BlockHash) -> Result<HashContext<L>, HashLibraryError> {
        let flags = self.library.flags();
        let mut cache = self.library.allocate_cache(flags)?;
        if let Err(e) = self.library.init_cache(&mut cache, &seed_key(seed)) {
            self.library.release_cache(cache);
            return Err(e);
        }
        let vm = match self.library.create_vm(flags, &cache) {
            Ok(vm) => vm,
            Err(e) => {
                self.library.release_cache(cache);
                return Err(e);
            }
        };
        Ok(HashContext {
            seed: *seed,
            cache,
            vm,
            memo: None,
        })
    }

    fn teardown(&self, ctx: HashContext<L>) {
        self.library.destroy_vm(ctx.vm);
        self.library.release_cache(ctx.cache);
    }
}

impl<L: HashLibrary> Drop for HashEngine<L> {
    fn drop(&mut self) {
        if let Some(ctx) = self.context.get_mut().take() {
            self.teardown(ctx);
        }
    }
}
