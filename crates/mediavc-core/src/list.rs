//! Record lists and transactional append.
//!
//! A record list is the `List` node at a version store's head. Records are
//! opaque encoded bytes; a transaction buffers pushes and produces exactly one
//! new version on commit.

use crate::block::StoreError;
use crate::graph::{unexpected, GraphStore};
use crate::link::Link;
use crate::node::GraphNode;
use crate::sign::{encode_signature, Signer};
use crate::version::{Version, VersionDetails, VersionStore};

/// Options recorded with a commit.
#[derive(Default, Clone)]
pub struct CommitOptions<'a> {
    /// Free-form comment
    pub comment: Option<String>,
    /// Tags
    pub tags: Vec<String>,
    /// Signs the new root when present
    pub signer: Option<&'a dyn Signer>,
}

impl<'a> CommitOptions<'a> {
    /// Options carrying only a comment.
    #[must_use]
    pub fn comment(comment: impl Into<String>) -> Self {
        Self {
            comment: Some(comment.into()),
            ..Self::default()
        }
    }

    /// Replace the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Sign the committed root.
    #[must_use]
    pub fn with_signer(mut self, signer: &'a dyn Signer) -> Self {
        self.signer = Some(signer);
        self
    }
}

/// Read access to the list at a version store's head.
pub struct RecordList<'a> {
    versions: &'a VersionStore,
    graph: &'a GraphStore,
}

impl<'a> RecordList<'a> {
    /// View the list at `versions`' head.
    #[must_use]
    pub fn new(versions: &'a VersionStore, graph: &'a GraphStore) -> Self {
        Self { versions, graph }
    }

    /// Number of records.
    ///
    /// # Errors
    ///
    /// Returns error if the list node cannot be read.
    pub fn length(&self) -> Result<usize, StoreError> {
        Ok(load_items(self.graph, self.versions.current_root())?.len())
    }

    /// Record at `index`.
    ///
    /// # Errors
    ///
    /// Returns error if `index` is out of range or a block is missing.
    pub fn get(&self, index: usize) -> Result<Vec<u8>, StoreError> {
        let items = load_items(self.graph, self.versions.current_root())?;
        let link = items.get(index).ok_or(StoreError::OutOfRange {
            index,
            len: items.len(),
        })?;
        self.graph.get_value(link)
    }

    /// `count` records starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns error if the range exceeds the list or a block is missing.
    pub fn range(&self, start: usize, count: usize) -> Result<Vec<Vec<u8>>, StoreError> {
        let items = load_items(self.graph, self.versions.current_root())?;
        let end = start.saturating_add(count);
        let slice = items.get(start..end).ok_or(StoreError::OutOfRange {
            index: end,
            len: items.len(),
        })?;
        slice.iter().map(|link| self.graph.get_value(link)).collect()
    }

    /// Begin a transaction based on the current head.
    #[must_use]
    pub fn tx(&self) -> Transaction {
        Transaction {
            graph: self.graph.clone(),
            base: self.versions.current_root(),
            items: None,
            pushed: 0,
        }
    }
}

/// Buffered append against a record list.
pub struct Transaction {
    graph: GraphStore,
    base: Option<Link>,
    items: Option<Vec<Link>>,
    pushed: usize,
}

impl Transaction {
    /// Load the base list.
    ///
    /// # Errors
    ///
    /// Returns error if the base list cannot be read.
    pub fn start(&mut self) -> Result<(), StoreError> {
        self.items = Some(load_items(&self.graph, self.base)?);
        Ok(())
    }

    /// Append one encoded record.
    ///
    /// # Errors
    ///
    /// Returns error if the transaction was not started or the write fails.
    pub fn push(&mut self, record: &[u8]) -> Result<(), StoreError> {
        let items = self.items.as_mut().ok_or(StoreError::NotStarted)?;
        items.push(self.graph.put_value(record)?);
        self.pushed += 1;
        Ok(())
    }

    /// Records pushed so far.
    #[must_use]
    pub fn pushed(&self) -> usize {
        self.pushed
    }

    /// Write the new list and append one version to `versions`.
    ///
    /// # Errors
    ///
    /// Returns error if the transaction was not started or a write fails.
    pub fn commit(
        self,
        versions: &mut VersionStore,
        options: &CommitOptions<'_>,
    ) -> Result<Version, StoreError> {
        let items = self.items.ok_or(StoreError::NotStarted)?;
        let len = items.len();
        let root = self.graph.put_node(&GraphNode::List(items))?;
        let details = VersionDetails {
            comment: options.comment.clone(),
            tags: options.tags.clone(),
            timestamp: chrono::Utc::now().timestamp_millis(),
            signature: options
                .signer
                .map(|signer| encode_signature(&signer.sign_root(&root))),
        };
        let version = versions.append(root, details)?;
        tracing::info!(
            store_id = %versions.id(),
            root = %root,
            records = self.pushed,
            len,
            "Committed version"
        );
        Ok(version)
    }
}

fn load_items(graph: &GraphStore, root: Option<Link>) -> Result<Vec<Link>, StoreError> {
    let Some(root) = root else {
        return Ok(Vec::new());
    };
    match graph.get_node(&root)? {
        GraphNode::List(items) => Ok(items),
        other => Err(unexpected("list", &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::MemoryBlockStore;
    use crate::chunk::FixedSizeChunker;
    use crate::sign::{verify_version, Ed25519Signer};
    use std::sync::Arc;

    fn stores() -> (VersionStore, GraphStore) {
        let blocks = MemoryBlockStore::shared();
        let graph = GraphStore::new(blocks.clone(), Arc::new(FixedSizeChunker::new(64)));
        (VersionStore::new(blocks), graph)
    }

    fn commit(versions: &mut VersionStore, graph: &GraphStore, records: &[&[u8]]) -> Version {
        let mut tx = RecordList::new(versions, graph).tx();
        tx.start().unwrap();
        for record in records {
            tx.push(record).unwrap();
        }
        tx.commit(versions, &CommitOptions::comment("test")).unwrap()
    }

    #[test]
    fn commits_append_to_the_list() {
        let (mut versions, graph) = stores();
        let first = commit(&mut versions, &graph, &[b"zero", b"one"]);
        let second = commit(&mut versions, &graph, &[b"two"]);

        assert_eq!(second.parent, Some(first.root));
        let list = RecordList::new(&versions, &graph);
        assert_eq!(list.length().unwrap(), 3);
        assert_eq!(list.get(2).unwrap(), b"two");
        assert_eq!(list.range(1, 2).unwrap(), vec![b"one".to_vec(), b"two".to_vec()]);
        assert!(matches!(list.range(2, 5), Err(StoreError::OutOfRange { .. })));
    }

    #[test]
    fn push_before_start_fails() {
        let (versions, graph) = stores();
        let mut tx = RecordList::new(&versions, &graph).tx();
        assert!(matches!(tx.push(b"x"), Err(StoreError::NotStarted)));
    }

    #[test]
    fn comment_and_tags_are_recorded() {
        let (mut versions, graph) = stores();
        let mut tx = RecordList::new(&versions, &graph).tx();
        tx.start().unwrap();
        tx.push(b"x").unwrap();
        let options = CommitOptions::comment("first").with_tags(["a", "b"]);
        let version = tx.commit(&mut versions, &options).unwrap();

        assert_eq!(version.details.comment.as_deref(), Some("first"));
        assert_eq!(version.details.tags, vec!["a".to_string(), "b".to_string()]);
        assert!(version.details.timestamp > 0);
        assert!(version.details.signature.is_none());
    }

    #[test]
    fn signed_commit_verifies() {
        let (mut versions, graph) = stores();
        let signer = Ed25519Signer::generate();
        let mut tx = RecordList::new(&versions, &graph).tx();
        tx.start().unwrap();
        tx.push(b"x").unwrap();
        let version = tx
            .commit(&mut versions, &CommitOptions::default().with_signer(&signer))
            .unwrap();

        assert!(verify_version(&signer.verifying_key(), &version));
        assert!(!verify_version(&Ed25519Signer::generate().verifying_key(), &version));
    }
}
