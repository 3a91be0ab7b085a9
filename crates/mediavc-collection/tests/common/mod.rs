use mediavc_core::{Block, BlockStore, Link, MemoryBlockStore, StoreError};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Memory store that starts rejecting writes once its budget runs out.
#[derive(Debug)]
pub struct FailingBlockStore {
    inner: MemoryBlockStore,
    writes_left: AtomicUsize,
}

impl FailingBlockStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryBlockStore::new(),
            writes_left: AtomicUsize::new(usize::MAX),
        }
    }

    /// Allow `writes` more puts, then fail.
    pub fn fail_after(&self, writes: usize) {
        self.writes_left.store(writes, Ordering::SeqCst);
    }

    pub fn heal(&self) {
        self.fail_after(usize::MAX);
    }
}

impl BlockStore for FailingBlockStore {
    fn put(&self, block: Block) -> Result<(), StoreError> {
        let left = self.writes_left.load(Ordering::SeqCst);
        if left == 0 {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.writes_left.store(left - 1, Ordering::SeqCst);
        self.inner.put(block)
    }

    fn get(&self, cid: &Link) -> Result<Vec<u8>, StoreError> {
        self.inner.get(cid)
    }

    fn has(&self, cid: &Link) -> Result<bool, StoreError> {
        self.inner.has(cid)
    }

    fn size(&self) -> Result<usize, StoreError> {
        self.inner.size()
    }
}
