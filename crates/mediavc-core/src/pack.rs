//! Bundles: self-contained block sets for moving versions between stores.
//!
//! Three shapes are supported:
//! - a single version (the list at one root and everything it reaches),
//! - a complete store (the index plus every version it lists),
//! - a single index (just the index node, enough to read the lineage).
//!
//! Restoring always verifies each block's cid against its bytes.

use crate::block::{BlockStore, StoreError};
use crate::link::{Block, Link};
use crate::node::GraphNode;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// A block carried inside a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleBlock {
    /// Claimed identifier
    pub cid: Link,
    /// Block payload
    #[serde(with = "crate::raw_bytes")]
    pub bytes: Vec<u8>,
}

/// Bundle envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bundle {
    /// One version, detached from its lineage
    Version {
        /// List root
        root: Link,
        /// Closure of `root`
        blocks: Vec<BundleBlock>,
    },
    /// A whole store
    Complete {
        /// Index root
        store_root: Link,
        /// Version roots, head first
        version_roots: Vec<Link>,
        /// Closure of `store_root`
        blocks: Vec<BundleBlock>,
    },
    /// Only the index node of a store
    Index {
        /// Index root
        store_root: Link,
        /// Head served alongside the index
        head: Link,
        /// The index block
        blocks: Vec<BundleBlock>,
    },
}

impl Bundle {
    /// Variant name.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Bundle::Version { .. } => "version",
            Bundle::Complete { .. } => "complete",
            Bundle::Index { .. } => "index",
        }
    }

    /// Serialize to CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_cbor(&self) -> Result<Vec<u8>, BundleError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| BundleError::Serialize(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize from CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, BundleError> {
        ciborium::from_reader(bytes).map_err(|e| BundleError::Deserialize(e.to_string()))
    }
}

/// Result of restoring a complete bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredComplete {
    /// Index root
    pub store_root: Link,
    /// Version roots, head first
    pub version_roots: Vec<Link>,
}

/// Result of restoring a single-index bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoredIndex {
    /// Index root
    pub store_root: Link,
    /// Head the packer served
    pub head: Link,
}

/// Pack the version at `root`.
///
/// # Errors
///
/// Returns error if a reachable block is missing.
pub fn pack_version(root: &Link, store: &dyn BlockStore) -> Result<Block, BundleError> {
    let blocks = closure(*root, store)?;
    tracing::debug!(root = %root, blocks = blocks.len(), "Packed version bundle");
    seal(&Bundle::Version {
        root: *root,
        blocks,
    })
}

/// Pack the whole store at `store_root`, listing `head` first when given.
///
/// # Errors
///
/// Returns error if a reachable block is missing or `head` is not a version
/// of the store.
pub fn pack_complete(
    store_root: &Link,
    head: Option<&Link>,
    store: &dyn BlockStore,
) -> Result<Block, BundleError> {
    let mut version_roots: Vec<Link> = match GraphNode::from_bytes(&store.get(store_root)?)? {
        GraphNode::Index(index) => index.versions.iter().rev().map(|v| v.root).collect(),
        other => return Err(BundleError::NotAnIndex(other.kind())),
    };
    if let Some(head) = head {
        let pos = version_roots
            .iter()
            .position(|root| root == head)
            .ok_or(StoreError::UnknownVersion(*head))?;
        let head = version_roots.remove(pos);
        version_roots.insert(0, head);
    }

    let blocks = closure(*store_root, store)?;
    tracing::debug!(
        store_root = %store_root,
        versions = version_roots.len(),
        blocks = blocks.len(),
        "Packed complete bundle"
    );
    seal(&Bundle::Complete {
        store_root: *store_root,
        version_roots,
        blocks,
    })
}

/// Pack only the index node at `store_root`, naming `head` as the served head.
///
/// # Errors
///
/// Returns error if the index block is missing or `head` is not a version of
/// the store.
pub fn pack_index(
    store_root: &Link,
    head: &Link,
    store: &dyn BlockStore,
) -> Result<Block, BundleError> {
    let bytes = store.get(store_root)?;
    match GraphNode::from_bytes(&bytes)? {
        GraphNode::Index(index) if index.versions.iter().any(|v| v.root == *head) => {}
        GraphNode::Index(_) => return Err(StoreError::UnknownVersion(*head).into()),
        other => return Err(BundleError::NotAnIndex(other.kind())),
    }
    seal(&Bundle::Index {
        store_root: *store_root,
        head: *head,
        blocks: vec![BundleBlock {
            cid: *store_root,
            bytes,
        }],
    })
}

/// Restore a version bundle, returning its root.
///
/// # Errors
///
/// Returns error if the bundle is malformed, of another kind, or corrupt.
pub fn restore_version(bytes: &[u8], store: &dyn BlockStore) -> Result<Link, BundleError> {
    match Bundle::from_cbor(bytes)? {
        Bundle::Version { root, blocks } => {
            write_blocks(blocks, store)?;
            ensure_present(&root, store)?;
            Ok(root)
        }
        other => Err(BundleError::WrongKind {
            expected: "version",
            found: other.kind(),
        }),
    }
}

/// Restore a complete bundle.
///
/// # Errors
///
/// Returns error if the bundle is malformed, of another kind, or corrupt.
pub fn restore_complete(
    bytes: &[u8],
    store: &dyn BlockStore,
) -> Result<RestoredComplete, BundleError> {
    match Bundle::from_cbor(bytes)? {
        Bundle::Complete {
            store_root,
            version_roots,
            blocks,
        } => {
            write_blocks(blocks, store)?;
            ensure_present(&store_root, store)?;
            Ok(RestoredComplete {
                store_root,
                version_roots,
            })
        }
        other => Err(BundleError::WrongKind {
            expected: "complete",
            found: other.kind(),
        }),
    }
}

/// Restore a single-index bundle, returning the store root and served head.
///
/// # Errors
///
/// Returns error if the bundle is malformed, of another kind, or corrupt.
pub fn restore_single_index(
    bytes: &[u8],
    store: &dyn BlockStore,
) -> Result<RestoredIndex, BundleError> {
    match Bundle::from_cbor(bytes)? {
        Bundle::Index {
            store_root,
            head,
            blocks,
        } => {
            write_blocks(blocks, store)?;
            ensure_present(&store_root, store)?;
            Ok(RestoredIndex { store_root, head })
        }
        other => Err(BundleError::WrongKind {
            expected: "index",
            found: other.kind(),
        }),
    }
}

fn seal(bundle: &Bundle) -> Result<Block, BundleError> {
    Ok(Block::new(bundle.to_cbor()?))
}

fn closure(root: Link, store: &dyn BlockStore) -> Result<Vec<BundleBlock>, BundleError> {
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([root]);
    let mut blocks = Vec::new();
    while let Some(cid) = queue.pop_front() {
        if !seen.insert(cid) {
            continue;
        }
        let bytes = store.get(&cid)?;
        queue.extend(GraphNode::from_bytes(&bytes)?.links());
        blocks.push(BundleBlock { cid, bytes });
    }
    Ok(blocks)
}

fn write_blocks(blocks: Vec<BundleBlock>, store: &dyn BlockStore) -> Result<(), BundleError> {
    for block in &blocks {
        if Link::digest(&block.bytes) != block.cid {
            return Err(BundleError::Corrupt(block.cid));
        }
    }
    let count = blocks.len();
    for block in blocks {
        store.put(Block {
            cid: block.cid,
            bytes: block.bytes,
        })?;
    }
    tracing::debug!(blocks = count, "Restored bundle blocks");
    Ok(())
}

fn ensure_present(root: &Link, store: &dyn BlockStore) -> Result<(), BundleError> {
    if store.has(root)? {
        Ok(())
    } else {
        Err(BundleError::MissingRoot(*root))
    }
}

/// Bundle errors.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// Serialization failed
    #[error("serialization failed: {0}")]
    Serialize(String),

    /// Deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialize(String),

    /// Bundle variant did not match the restore call
    #[error("expected {expected} bundle, found {found}")]
    WrongKind {
        /// Expected variant
        expected: &'static str,
        /// Actual variant
        found: &'static str,
    },

    /// A block's bytes do not hash to its cid
    #[error("corrupt block in bundle: {0}")]
    Corrupt(Link),

    /// Declared root was not delivered
    #[error("bundle root not present: {0}")]
    MissingRoot(Link),

    /// Store root does not point at an index node
    #[error("store root is a {0} node, not an index")]
    NotAnIndex(&'static str),

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemoryBlockStore;
    use crate::chunk::FixedSizeChunker;
    use crate::graph::GraphStore;
    use crate::list::{CommitOptions, RecordList};
    use crate::version::VersionStore;
    use std::sync::Arc;

    fn committed_store(batches: &[&[&[u8]]]) -> (Arc<MemoryBlockStore>, VersionStore) {
        let blocks = Arc::new(MemoryBlockStore::new());
        let graph = GraphStore::new(blocks.clone(), Arc::new(FixedSizeChunker::new(8)));
        let mut versions = VersionStore::new(blocks.clone());
        for batch in batches {
            let mut tx = RecordList::new(&versions, &graph).tx();
            tx.start().unwrap();
            for record in *batch {
                tx.push(record).unwrap();
            }
            tx.commit(&mut versions, &CommitOptions::default()).unwrap();
        }
        (blocks, versions)
    }

    #[test]
    fn version_bundle_restores_into_empty_store() {
        let (blocks, versions) = committed_store(&[&[b"a long record over a chunk", b"b"]]);
        let root = versions.current_root().unwrap();
        let bundle = pack_version(&root, &*blocks).unwrap();

        let target = MemoryBlockStore::new();
        assert_eq!(restore_version(&bundle.bytes, &target).unwrap(), root);
        // index node is not part of a single version
        assert_eq!(target.size().unwrap(), blocks.size().unwrap() - 1);
    }

    #[test]
    fn complete_bundle_lists_head_first() {
        let (blocks, versions) = committed_store(&[&[b"a"], &[b"b"], &[b"c"]]);
        let store_root = versions.version_store_root().unwrap();
        let log = versions.log();

        let bundle = pack_complete(&store_root, Some(&log[1].root), &*blocks).unwrap();
        let target = MemoryBlockStore::new();
        let restored = restore_complete(&bundle.bytes, &target).unwrap();

        assert_eq!(restored.store_root, store_root);
        assert_eq!(restored.version_roots, vec![log[1].root, log[0].root, log[2].root]);
        assert_eq!(target.size().unwrap(), blocks.size().unwrap() - 2);
    }

    #[test]
    fn index_bundle_carries_one_block_and_the_served_head() {
        let (blocks, versions) = committed_store(&[&[b"a"], &[b"b"]]);
        let store_root = versions.version_store_root().unwrap();
        let older = versions.log()[1].root;
        let bundle = pack_index(&store_root, &older, &*blocks).unwrap();

        let target = MemoryBlockStore::new();
        let restored = restore_single_index(&bundle.bytes, &target).unwrap();
        assert_eq!(restored.store_root, store_root);
        assert_eq!(restored.head, older);
        assert_eq!(target.size().unwrap(), 1);
    }

    #[test]
    fn index_bundle_rejects_foreign_head() {
        let (blocks, versions) = committed_store(&[&[b"a"]]);
        let store_root = versions.version_store_root().unwrap();
        let err = pack_index(&store_root, &Link::digest(b"elsewhere"), &*blocks).unwrap_err();
        assert!(matches!(err, BundleError::Store(StoreError::UnknownVersion(_))));
    }

    #[test]
    fn wrong_kind_is_rejected() {
        let (blocks, versions) = committed_store(&[&[b"a"]]);
        let bundle = pack_version(&versions.current_root().unwrap(), &*blocks).unwrap();
        let err = restore_complete(&bundle.bytes, &MemoryBlockStore::new()).unwrap_err();
        assert!(matches!(err, BundleError::WrongKind { expected: "complete", found: "version" }));
    }

    #[test]
    fn tampered_block_is_rejected() {
        let (blocks, versions) = committed_store(&[&[b"a"]]);
        let bundle = pack_version(&versions.current_root().unwrap(), &*blocks).unwrap();
        let mut decoded = Bundle::from_cbor(&bundle.bytes).unwrap();
        if let Bundle::Version { blocks, .. } = &mut decoded {
            blocks[0].bytes.push(1);
        }
        let target = MemoryBlockStore::new();
        assert!(matches!(
            restore_version(&decoded.to_cbor().unwrap(), &target),
            Err(BundleError::Corrupt(_))
        ));
        assert_eq!(target.size().unwrap(), 0);
    }
}
