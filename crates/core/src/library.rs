//! Hash library backends for [`HashEngine`](crate::engine::HashEngine)

use uhash_core::UniversalHash;

use crate::engine::HashLibrary;
use crate::error::HashLibraryError;

/// UniversalHash backend
///
/// The cache is a 32-byte key derived from the seed with BLAKE3; the VM is a
/// reusable [`UniversalHash`] instance (2MB of scratchpads) that hashes
/// `key || data`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UHashLibrary;

/// Seed-derived key
pub struct UHashCache {
    key: Option<[u8; 32]>,
}

pub struct UHashVm {
    key: [u8; 32],
    hasher: UniversalHash,
    input: Vec<u8>,
}

impl HashLibrary for UHashLibrary {
    type Flags = ();
    type Cache = UHashCache;
    type Vm = UHashVm;

    fn flags(&self) -> Self::Flags {}

    fn allocate_cache(&self, _flags: ()) -> Result<UHashCache, HashLibraryError> {
        Ok(UHashCache { key: None })
    }

    fn init_cache(&self, cache: &mut UHashCache, seed: &[u8]) -> Result<(), HashLibraryError> {
        if seed.is_empty() {
            return Err(HashLibraryError::CacheInit("empty seed".into()));
        }
        cache.key = Some(*blake3::hash(seed).as_bytes());
        Ok(())
    }

    fn create_vm(&self, _flags: (), cache: &UHashCache) -> Result<UHashVm, HashLibraryError> {
        let key = cache
            .key
            .ok_or_else(|| HashLibraryError::VmCreation("cache not initialised".into()))?;
        Ok(UHashVm {
            key,
            hasher: UniversalHash::new(),
            input: Vec::with_capacity(32 + 256),
        })
    }

    fn compute_hash(&self, vm: &mut UHashVm, data: &[u8]) -> Result<[u8; 32], HashLibraryError> {
        vm.input.clear();
        vm.input.extend_from_slice(&vm.key);
        vm.input.extend_from_slice(data);
        Ok(vm.hasher.hash(&vm.input))
    }
}

#[cfg(feature = "randomx")]
pub use self::randomx::RandomXLibrary;

#[cfg(feature = "randomx")]
mod randomx {
    //! RandomX backend over `randomx-rs`

    use randomx_rs::{RandomXCache, RandomXFlag, RandomXVM};

    use crate::engine::HashLibrary;
    use crate::error::HashLibraryError;

    #[derive(Debug, Clone, Copy, Default)]
    pub struct RandomXLibrary;

    /// `randomx-rs` allocates and initialises a cache in one call, so the
    /// slot stays empty until the seed is known.
    pub struct RandomXCacheSlot(Option<RandomXCache>);

    impl HashLibrary for RandomXLibrary {
        type Flags = RandomXFlag;
        type Cache = RandomXCacheSlot;
        type Vm = RandomXVM;

        fn flags(&self) -> RandomXFlag {
            RandomXFlag::get_recommended_flags()
        }

        fn allocate_cache(&self, _flags: RandomXFlag) -> Result<RandomXCacheSlot, HashLibraryError> {
            Ok(RandomXCacheSlot(None))
        }

        fn init_cache(&self, cache: &mut RandomXCacheSlot, seed: &[u8]) -> Result<(), HashLibraryError> {
            let flags = self.flags();
            let built = RandomXCache::new(flags, seed)
                .map_err(|e| HashLibraryError::CacheAllocation(e.to_string()))?;
            cache.0 = Some(built);
            Ok(())
        }

        fn create_vm(&self, flags: RandomXFlag, cache: &RandomXCacheSlot) -> Result<RandomXVM, HashLibraryError> {
            let cache = cache
                .0
                .clone()
                .ok_or_else(|| HashLibraryError::VmCreation("cache not initialised".into()))?;
            RandomXVM::new(flags, Some(cache), None).map_err(|e| HashLibraryError::VmCreation(e.to_string()))
        }

        fn compute_hash(&self, vm: &mut RandomXVM, data: &[u8]) -> Result<[u8; 32], HashLibraryError> {
            let out = vm
                .calculate_hash(data)
                .map_err(|e| HashLibraryError::Compute(e.to_string()))?;
            out.as_slice()
                .try_into()
                .map_err(|_| HashLibraryError::Compute(format!("unexpected hash length {}", out.len())))
        }
    }
}
