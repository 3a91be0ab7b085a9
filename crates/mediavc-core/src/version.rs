//! Version store: the lineage of list roots for one record list.
//!
//! A store is identified by a generated id. Each commit appends a [`Version`]
//! to the index and rewrites the index node, so the store root (the cid of
//! the index node) changes on every commit while the id stays stable.

use crate::block::{SharedBlockStore, StoreError};
use crate::graph::unexpected;
use crate::link::Link;
use crate::node::GraphNode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata recorded with a version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDetails {
    /// Free-form commit comment
    pub comment: Option<String>,
    /// Commit tags
    pub tags: Vec<String>,
    /// Commit time (Unix milliseconds)
    pub timestamp: i64,
    /// Base64 Ed25519 signature over the root bytes
    pub signature: Option<String>,
}

/// One entry of a store's lineage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// List root of this version
    pub root: Link,
    /// Head the version was committed on top of
    pub parent: Option<Link>,
    /// Second parent of a merge
    pub merge_parent: Option<Link>,
    /// Commit metadata
    pub details: VersionDetails,
}

/// Persisted lineage of a version store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionIndex {
    /// Stable store identifier
    pub id: String,
    /// Versions in commit order (oldest first)
    pub versions: Vec<Version>,
}

/// Everything needed to move another store to a given head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSnapshot {
    /// Root of the index node
    pub store_root: Link,
    /// The index itself
    pub index: VersionIndex,
    /// Version at the head
    pub head: Version,
}

/// Tracks the lineage and current head of one record list.
#[derive(Clone)]
pub struct VersionStore {
    blocks: SharedBlockStore,
    id: String,
    versions: Vec<Version>,
    store_root: Option<Link>,
    current_root: Option<Link>,
    detached: bool,
}

impl VersionStore {
    /// Create a fresh store with a generated id and nothing persisted.
    #[must_use]
    pub fn new(blocks: SharedBlockStore) -> Self {
        Self {
            blocks,
            id: Uuid::new_v4().to_string(),
            versions: Vec::new(),
            store_root: None,
            current_root: None,
            detached: false,
        }
    }

    /// Open a persisted store at `store_root`.
    ///
    /// The head is `version_root` when given, otherwise the latest version.
    ///
    /// # Errors
    ///
    /// Returns error if the index cannot be read or `version_root` is not
    /// part of the lineage.
    pub fn open(
        blocks: SharedBlockStore,
        store_root: Link,
        version_root: Option<Link>,
    ) -> Result<Self, StoreError> {
        let index = match GraphNode::from_bytes(&blocks.get(&store_root)?)? {
            GraphNode::Index(index) => index,
            other => return Err(unexpected("index", &other)),
        };
        let current_root = match version_root {
            Some(root) if index.versions.iter().any(|v| v.root == root) => Some(root),
            Some(root) => return Err(StoreError::UnknownVersion(root)),
            None => index.versions.last().map(|v| v.root),
        };
        tracing::debug!(
            store_id = %index.id,
            store_root = %store_root,
            versions = index.versions.len(),
            "Opened version store"
        );
        Ok(Self {
            blocks,
            id: index.id,
            versions: index.versions,
            store_root: Some(store_root),
            current_root,
            detached: false,
        })
    }

    /// Open a store positioned at a single version with no lineage.
    #[must_use]
    pub fn detached(blocks: SharedBlockStore, version_root: Link) -> Self {
        Self {
            current_root: Some(version_root),
            detached: true,
            ..Self::new(blocks)
        }
    }

    /// Stable store identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Root of the persisted index, if anything was committed.
    #[must_use]
    pub fn version_store_root(&self) -> Option<Link> {
        self.store_root
    }

    /// List root at the head.
    #[must_use]
    pub fn current_root(&self) -> Option<Link> {
        self.current_root
    }

    /// Whether the store has no lineage.
    #[must_use]
    pub fn is_detached(&self) -> bool {
        self.detached
    }

    /// Block store the index lives in.
    #[must_use]
    pub fn block_store(&self) -> &SharedBlockStore {
        &self.blocks
    }

    /// Move the head to an earlier (or later) version of this lineage.
    ///
    /// # Errors
    ///
    /// Returns error if `root` is not in the lineage.
    pub fn checkout(&mut self, root: Link) -> Result<(), StoreError> {
        if self.detached {
            return if self.current_root == Some(root) {
                Ok(())
            } else {
                Err(StoreError::Detached)
            };
        }
        if !self.includes_version(&root) {
            return Err(StoreError::UnknownVersion(root));
        }
        tracing::debug!(store_id = %self.id, root = %root, "Checked out version");
        self.current_root = Some(root);
        Ok(())
    }

    /// Whether `root` belongs to this store's lineage.
    #[must_use]
    pub fn includes_version(&self, root: &Link) -> bool {
        if self.detached {
            return self.current_root.as_ref() == Some(root);
        }
        self.versions.iter().any(|v| &v.root == root)
    }

    /// Versions, newest first.
    #[must_use]
    pub fn log(&self) -> Vec<Version> {
        self.versions.iter().rev().cloned().collect()
    }

    /// Version record at the head.
    #[must_use]
    pub fn current_version(&self) -> Option<&Version> {
        let root = self.current_root?;
        self.versions.iter().rev().find(|v| v.root == root)
    }

    /// Snapshot of the head, or `None` when nothing is committed (or detached).
    #[must_use]
    pub fn version_get(&self) -> Option<VersionSnapshot> {
        let store_root = self.store_root?;
        let head = self.current_version()?.clone();
        Some(VersionSnapshot {
            store_root,
            index: VersionIndex {
                id: self.id.clone(),
                versions: self.versions.clone(),
            },
            head,
        })
    }

    /// Adopt another store's lineage and head. Blocks must already be present.
    pub fn version_set(&mut self, snapshot: VersionSnapshot) {
        tracing::debug!(
            store_id = %snapshot.index.id,
            head = %snapshot.head.root,
            "Adopted version snapshot"
        );
        self.id = snapshot.index.id;
        self.versions = snapshot.index.versions;
        self.store_root = Some(snapshot.store_root);
        self.current_root = Some(snapshot.head.root);
        self.detached = false;
    }

    /// Append a version on top of the head and persist the index.
    pub(crate) fn append(
        &mut self,
        root: Link,
        details: VersionDetails,
    ) -> Result<Version, StoreError> {
        let version = Version {
            root,
            parent: self.current_root,
            merge_parent: None,
            details,
        };
        let mut versions = self.versions.clone();
        versions.push(version.clone());

        let block = GraphNode::Index(VersionIndex {
            id: self.id.clone(),
            versions: versions.clone(),
        })
        .to_block()?;
        let store_root = block.cid;
        self.blocks.put(block)?;

        self.versions = versions;
        self.store_root = Some(store_root);
        self.current_root = Some(root);
        self.detached = false;
        Ok(version)
    }
}

impl std::fmt::Debug for VersionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionStore")
            .field("id", &self.id)
            .field("versions", &self.versions.len())
            .field("store_root", &self.store_root)
            .field("current_root", &self.current_root)
            .field("detached", &self.detached)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemoryBlockStore;

    fn details(comment: &str) -> VersionDetails {
        VersionDetails {
            comment: Some(comment.to_string()),
            ..VersionDetails::default()
        }
    }

    #[test]
    fn fresh_store_is_empty() {
        let store = VersionStore::new(MemoryBlockStore::shared());
        assert!(store.current_root().is_none());
        assert!(store.version_store_root().is_none());
        assert!(store.log().is_empty());
        assert!(store.version_get().is_none());
    }

    #[test]
    fn append_chains_parents() {
        let mut store = VersionStore::new(MemoryBlockStore::shared());
        let a = Link::digest(b"a");
        let b = Link::digest(b"b");
        let first = store.append(a, details("one")).unwrap();
        let second = store.append(b, details("two")).unwrap();

        assert_eq!(first.parent, None);
        assert_eq!(second.parent, Some(a));
        let log = store.log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].root, b);
        assert_eq!(store.current_root(), Some(b));
    }

    #[test]
    fn reopen_keeps_id_and_lineage() {
        let blocks = MemoryBlockStore::shared();
        let mut store = VersionStore::new(blocks.clone());
        let a = Link::digest(b"a");
        let b = Link::digest(b"b");
        store.append(a, details("one")).unwrap();
        store.append(b, details("two")).unwrap();
        let root = store.version_store_root().unwrap();

        let latest = VersionStore::open(blocks.clone(), root, None).unwrap();
        assert_eq!(latest.id(), store.id());
        assert_eq!(latest.current_root(), Some(b));

        let older = VersionStore::open(blocks.clone(), root, Some(a)).unwrap();
        assert_eq!(older.current_root(), Some(a));

        let stranger = Link::digest(b"z");
        assert!(matches!(
            VersionStore::open(blocks, root, Some(stranger)),
            Err(StoreError::UnknownVersion(_))
        ));
    }

    #[test]
    fn checkout_stays_in_lineage() {
        let mut store = VersionStore::new(MemoryBlockStore::shared());
        let a = Link::digest(b"a");
        store.append(a, details("one")).unwrap();
        store.append(Link::digest(b"b"), details("two")).unwrap();

        store.checkout(a).unwrap();
        assert_eq!(store.current_root(), Some(a));
        assert!(store.checkout(Link::digest(b"zz")).is_err());
    }

    #[test]
    fn detached_store_knows_only_its_head() {
        let head = Link::digest(b"head");
        let mut store = VersionStore::detached(MemoryBlockStore::shared(), head);
        assert!(store.is_detached());
        assert!(store.includes_version(&head));
        assert!(store.version_get().is_none());
        store.checkout(head).unwrap();
        assert!(matches!(store.checkout(Link::digest(b"x")), Err(StoreError::Detached)));
    }

    #[test]
    fn version_set_adopts_head() {
        let blocks = MemoryBlockStore::shared();
        let mut remote = VersionStore::new(blocks.clone());
        remote.append(Link::digest(b"r"), details("remote")).unwrap();

        let mut local = VersionStore::new(blocks);
        local.version_set(remote.version_get().unwrap());
        assert_eq!(local.id(), remote.id());
        assert_eq!(local.current_root(), remote.current_root());
        assert_eq!(local.version_store_root(), remote.version_store_root());
    }
}
