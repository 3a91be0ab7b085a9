//! Graph store: values on top of a block store, chunked when large.

use crate::block::{BlockStore, SharedBlockStore, StoreError};
use crate::chunk::Chunker;
use crate::link::Link;
use crate::node::GraphNode;
use std::sync::Arc;

/// Reads and writes graph nodes and chunked values.
#[derive(Clone)]
pub struct GraphStore {
    blocks: SharedBlockStore,
    chunker: Arc<dyn Chunker>,
}

impl GraphStore {
    /// Create a graph store over `blocks`.
    #[must_use]
    pub fn new(blocks: SharedBlockStore, chunker: Arc<dyn Chunker>) -> Self {
        Self { blocks, chunker }
    }

    /// Underlying block store.
    #[must_use]
    pub fn block_store(&self) -> &SharedBlockStore {
        &self.blocks
    }

    /// Underlying block store as a trait object.
    #[must_use]
    pub fn blocks(&self) -> &dyn BlockStore {
        &*self.blocks
    }

    /// Nominal chunk size of the configured chunker.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunker.chunk_size()
    }

    /// Write a node, returning its link.
    ///
    /// # Errors
    ///
    /// Returns error if encoding or the block store fails.
    pub fn put_node(&self, node: &GraphNode) -> Result<Link, StoreError> {
        let block = node.to_block()?;
        let cid = block.cid;
        self.blocks.put(block)?;
        Ok(cid)
    }

    /// Read a node.
    ///
    /// # Errors
    ///
    /// Returns error if the block is missing or not a node.
    pub fn get_node(&self, link: &Link) -> Result<GraphNode, StoreError> {
        GraphNode::from_bytes(&self.blocks.get(link)?)
    }

    /// Write a value, splitting it into chunks if it exceeds one chunk.
    ///
    /// # Errors
    ///
    /// Returns error if the block store fails.
    pub fn put_value(&self, bytes: &[u8]) -> Result<Link, StoreError> {
        let boundaries = self.chunker.chunk(bytes);
        if boundaries.len() <= 1 {
            return self.put_node(&GraphNode::Value(bytes.to_vec()));
        }

        let mut start = 0;
        let mut chunks = Vec::with_capacity(boundaries.len());
        for end in boundaries {
            chunks.push(self.put_node(&GraphNode::Value(bytes[start..end].to_vec()))?);
            start = end;
        }
        tracing::trace!(len = bytes.len(), chunks = chunks.len(), "Chunked value");
        self.put_node(&GraphNode::Chunks(chunks))
    }

    /// Read a value written by [`put_value`](Self::put_value).
    ///
    /// # Errors
    ///
    /// Returns error if a block is missing or the link is not a value.
    pub fn get_value(&self, link: &Link) -> Result<Vec<u8>, StoreError> {
        match self.get_node(link)? {
            GraphNode::Value(bytes) => Ok(bytes),
            GraphNode::Chunks(chunks) => {
                let mut out = Vec::new();
                for chunk in &chunks {
                    match self.get_node(chunk)? {
                        GraphNode::Value(bytes) => out.extend_from_slice(&bytes),
                        other => return Err(unexpected("value", &other)),
                    }
                }
                Ok(out)
            }
            other => Err(unexpected("value", &other)),
        }
    }
}

pub(crate) fn unexpected(expected: &str, found: &GraphNode) -> StoreError {
    StoreError::Decode(format!("expected {expected} node, found {}", found.kind()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemoryBlockStore;
    use crate::chunk::FixedSizeChunker;

    fn store(chunk: usize) -> GraphStore {
        GraphStore::new(MemoryBlockStore::shared(), Arc::new(FixedSizeChunker::new(chunk)))
    }

    #[test]
    fn small_value_is_one_block() {
        let graph = store(16);
        let link = graph.put_value(b"short").unwrap();
        assert_eq!(graph.get_value(&link).unwrap(), b"short");
        assert_eq!(graph.block_store().size().unwrap(), 1);
    }

    #[test]
    fn large_value_is_chunked() {
        let graph = store(4);
        let data: Vec<u8> = (0..10).collect();
        let link = graph.put_value(&data).unwrap();
        assert!(matches!(graph.get_node(&link).unwrap(), GraphNode::Chunks(c) if c.len() == 3));
        assert_eq!(graph.get_value(&link).unwrap(), data);
        // three chunks plus the chunk index
        assert_eq!(graph.block_store().size().unwrap(), 4);
    }

    #[test]
    fn repeated_chunks_dedupe() {
        let graph = store(4);
        let link = graph.put_value(&[7u8; 16]).unwrap();
        assert_eq!(graph.get_value(&link).unwrap(), vec![7u8; 16]);
        assert_eq!(graph.block_store().size().unwrap(), 2);
    }

    #[test]
    fn list_is_not_a_value() {
        let graph = store(4);
        let link = graph.put_node(&GraphNode::List(Vec::new())).unwrap();
        assert!(matches!(graph.get_value(&link), Err(StoreError::Decode(_))));
    }
}
