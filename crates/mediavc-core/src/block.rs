//! Block stores.
//!
//! The engine only needs `put`/`get`/`has`/`size`; anything that can provide
//! those (memory, SQLite, a remote cache) can back a collection.

use crate::link::{Block, Link};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Shared handle to a block store.
pub type SharedBlockStore = Arc<dyn BlockStore>;

/// Content-addressed block storage.
pub trait BlockStore: Send + Sync {
    /// Store a block. Storing an existing block is a no-op.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn put(&self, block: Block) -> Result<(), StoreError>;

    /// Fetch a block's bytes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the block is absent.
    fn get(&self, cid: &Link) -> Result<Vec<u8>, StoreError>;

    /// Check whether a block is present.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn has(&self, cid: &Link) -> Result<bool, StoreError>;

    /// Number of distinct blocks held.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn size(&self) -> Result<usize, StoreError>;
}

/// In-memory block store.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<Link, Vec<u8>>>,
}

impl MemoryBlockStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store behind a shared handle.
    #[must_use]
    pub fn shared() -> SharedBlockStore {
        Arc::new(Self::new())
    }

    /// Copy every block into `target`, returning how many were copied.
    ///
    /// # Errors
    ///
    /// Returns error if the target rejects a block.
    pub fn push_into(&self, target: &dyn BlockStore) -> Result<usize, StoreError> {
        let blocks = self.blocks.read().map_err(|_| StoreError::Poisoned)?;
        for (cid, bytes) in blocks.iter() {
            target.put(Block {
                cid: *cid,
                bytes: bytes.clone(),
            })?;
        }
        tracing::debug!(blocks = blocks.len(), "Merged scratch block store");
        Ok(blocks.len())
    }
}

impl BlockStore for MemoryBlockStore {
    fn put(&self, block: Block) -> Result<(), StoreError> {
        let mut blocks = self.blocks.write().map_err(|_| StoreError::Poisoned)?;
        blocks.entry(block.cid).or_insert(block.bytes);
        Ok(())
    }

    fn get(&self, cid: &Link) -> Result<Vec<u8>, StoreError> {
        let blocks = self.blocks.read().map_err(|_| StoreError::Poisoned)?;
        blocks.get(cid).cloned().ok_or(StoreError::NotFound(*cid))
    }

    fn has(&self, cid: &Link) -> Result<bool, StoreError> {
        let blocks = self.blocks.read().map_err(|_| StoreError::Poisoned)?;
        Ok(blocks.contains_key(cid))
    }

    fn size(&self) -> Result<usize, StoreError> {
        let blocks = self.blocks.read().map_err(|_| StoreError::Poisoned)?;
        Ok(blocks.len())
    }
}

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Block not present
    #[error("block not found: {0}")]
    NotFound(Link),

    /// Version root not part of this store's lineage
    #[error("unknown version: {0}")]
    UnknownVersion(Link),

    /// Store was opened at a single version and has no lineage
    #[error("version store is detached at a single version")]
    Detached,

    /// Range outside the list
    #[error("index out of range: {index} (length {len})")]
    OutOfRange {
        /// Requested index
        index: usize,
        /// List length
        len: usize,
    },

    /// Transaction used before `start`
    #[error("transaction not started")]
    NotStarted,

    /// Node encoding failed
    #[error("encoding failed: {0}")]
    Encode(String),

    /// Node decoding failed
    #[error("decoding failed: {0}")]
    Decode(String),

    /// Backend failure
    #[error("backend error: {0}")]
    Backend(String),

    /// Lock poisoned by a panicking writer
    #[error("block store lock poisoned")]
    Poisoned,
}
