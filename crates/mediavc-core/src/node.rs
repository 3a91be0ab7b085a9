//! Graph nodes: the block-level encoding of values, lists and version indexes.

use crate::block::StoreError;
use crate::link::{Block, Link};
use crate::version::VersionIndex;
use serde::{Deserialize, Serialize};

/// A node stored as a single CBOR block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphNode {
    /// A value small enough to fit in one block, or one chunk of a larger one
    Value(#[serde(with = "crate::raw_bytes")] Vec<u8>),
    /// A value split into chunk blocks, in order
    Chunks(Vec<Link>),
    /// An ordered list of item links; its cid is a version root
    List(Vec<Link>),
    /// A version index; its cid is the store root
    Index(VersionIndex),
}

impl GraphNode {
    /// Links this node refers to directly.
    #[must_use]
    pub fn links(&self) -> Vec<Link> {
        match self {
            GraphNode::Value(_) => Vec::new(),
            GraphNode::Chunks(links) | GraphNode::List(links) => links.clone(),
            GraphNode::Index(index) => index.versions.iter().map(|v| v.root).collect(),
        }
    }

    /// Short name of the variant, for errors and logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            GraphNode::Value(_) => "value",
            GraphNode::Chunks(_) => "chunks",
            GraphNode::List(_) => "list",
            GraphNode::Index(_) => "index",
        }
    }

    /// Encode into a block.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_block(&self) -> Result<Block, StoreError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes).map_err(|e| StoreError::Encode(e.to_string()))?;
        Ok(Block::new(bytes))
    }

    /// Decode from block bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a graph node.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        ciborium::from_reader(bytes).map_err(|e| StoreError::Decode(e.to_string()))
    }
}
