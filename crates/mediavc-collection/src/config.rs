//! Shared storage configuration for collections.

use mediavc_core::{
    Chunker, FixedSizeChunker, GraphStore, MemoryBlockStore, SharedBlockStore, VersionStore,
    DEFAULT_CHUNK_SIZE,
};
use std::sync::Arc;

/// Block store and chunking shared by a family of collections.
///
/// Cloning is cheap; clones share the same block store.
#[derive(Clone)]
pub struct CollectionConfig {
    blocks: SharedBlockStore,
    chunker: Arc<dyn Chunker>,
}

impl CollectionConfig {
    /// Use `blocks` with the default chunk size.
    #[must_use]
    pub fn new(blocks: SharedBlockStore) -> Self {
        Self::with_chunk_size(blocks, DEFAULT_CHUNK_SIZE)
    }

    /// Use `blocks` with fixed-size chunks of `chunk_size` bytes.
    #[must_use]
    pub fn with_chunk_size(blocks: SharedBlockStore, chunk_size: usize) -> Self {
        Self {
            blocks,
            chunker: Arc::new(FixedSizeChunker::new(chunk_size)),
        }
    }

    /// Fresh in-memory block store with the default chunk size.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryBlockStore::shared())
    }

    /// Shared block store.
    #[must_use]
    pub fn block_store(&self) -> &SharedBlockStore {
        &self.blocks
    }

    /// Chunk size in bytes.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunker.chunk_size()
    }

    /// A graph store over the shared block store.
    #[must_use]
    pub fn graph_store(&self) -> GraphStore {
        GraphStore::new(self.blocks.clone(), self.chunker.clone())
    }

    /// A fresh, empty version store over the shared block store.
    #[must_use]
    pub fn version_store(&self) -> VersionStore {
        VersionStore::new(self.blocks.clone())
    }
}

impl std::fmt::Debug for CollectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionConfig")
            .field("chunk_size", &self.chunk_size())
            .finish_non_exhaustive()
    }
}
