//! The versioned collection engine shared by collections and registries.
//!
//! An engine keeps two in-memory buffers next to a persisted record list:
//! - `added`: records staged by [`ContentAddressable::add`], written by the
//!   next commit and then dropped
//! - `loaded`: the last page read by `load`, each entry wrapped in
//!   [`Versioned`]; replaced wholesale on every load and cleared on checkout
//!
//! Neither buffer is ever partially updated by a commit.

use crate::config::CollectionConfig;
use crate::error::CollectionError;
use ed25519_dalek::VerifyingKey;
use mediavc_core::pack::{pack_complete, pack_version};
use mediavc_core::{
    verify_version, Block, CommitOptions, GraphStore, Link, RecordList, Version, VersionStore,
};

/// A loaded record together with the head it was loaded at.
///
/// Leaf collections leave `version` empty; registries record the nested
/// collection's head so later commits can tell whether it changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<E> {
    /// The record
    pub model: E,
    /// Head recorded at load or at the last registry commit
    pub version: Option<String>,
}

/// Roots after a commit (unchanged when nothing was committed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    /// Stable id of the version store
    pub version_store_id: String,
    /// Root of the version index
    pub version_store_root: Option<Link>,
    /// Head list root
    pub current_root: Option<Link>,
}

/// Page of a persisted list to load.
///
/// `start_index` defaults to 0 and `item_count` to the whole list. A count
/// running past the end is clamped to the rest of the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadRange {
    /// First record to load
    pub start_index: Option<usize>,
    /// Number of records to load
    pub item_count: Option<usize>,
}

impl LoadRange {
    /// The whole list.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// `item_count` records from `start_index`.
    #[must_use]
    pub fn new(start_index: usize, item_count: usize) -> Self {
        Self {
            start_index: Some(start_index),
            item_count: Some(item_count),
        }
    }

    /// Everything from `start_index` on.
    #[must_use]
    pub fn from_index(start_index: usize) -> Self {
        Self {
            start_index: Some(start_index),
            item_count: None,
        }
    }
}

/// Buffers plus the stores backing one record list.
#[derive(Clone)]
pub struct Engine<E> {
    pub(crate) versions: VersionStore,
    pub(crate) graph: GraphStore,
    pub(crate) config: CollectionConfig,
    pub(crate) loaded: Vec<Versioned<E>>,
    pub(crate) added: Vec<E>,
}

impl<E> Engine<E> {
    /// Create an engine over existing stores.
    #[must_use]
    pub fn new(versions: VersionStore, graph: GraphStore, config: CollectionConfig) -> Self {
        Self {
            versions,
            graph,
            config,
            loaded: Vec::new(),
            added: Vec::new(),
        }
    }

    /// Version store backing the list.
    #[must_use]
    pub fn version_store(&self) -> &VersionStore {
        &self.versions
    }

    /// Graph store backing the list.
    #[must_use]
    pub fn graph_store(&self) -> &GraphStore {
        &self.graph
    }

    /// Shared configuration.
    #[must_use]
    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    pub(crate) fn summary(&self) -> CommitSummary {
        CommitSummary {
            version_store_id: self.versions.id().to_string(),
            version_store_root: self.versions.version_store_root(),
            current_root: self.versions.current_root(),
        }
    }

    /// Empty the staged buffer, handing its records to the caller.
    pub(crate) fn take_added(&mut self) -> Vec<E> {
        std::mem::take(&mut self.added)
    }

    /// Append already-encoded records as one version. No records, no version.
    pub(crate) fn commit_encoded(
        &mut self,
        records: &[Vec<u8>],
        options: &CommitOptions<'_>,
    ) -> Result<CommitSummary, CollectionError> {
        if records.is_empty() {
            tracing::debug!(store_id = %self.versions.id(), "Nothing staged, skipping commit");
            return Ok(self.summary());
        }

        let mut tx = RecordList::new(&self.versions, &self.graph).tx();
        tx.start()?;
        for record in records {
            tx.push(record)?;
        }
        tx.commit(&mut self.versions, options)?;
        Ok(self.summary())
    }

    /// Read a page of encoded records from the persisted list.
    pub(crate) fn read_range(&self, range: LoadRange) -> Result<Vec<Vec<u8>>, CollectionError> {
        if self.versions.current_root().is_none() {
            return Ok(Vec::new());
        }
        let list = RecordList::new(&self.versions, &self.graph);
        let len = list.length()?;
        let start = range.start_index.unwrap_or(0);
        if len == 0 && start == 0 {
            return Ok(Vec::new());
        }
        if start >= len {
            return Err(CollectionError::InvalidStartIndex { start, len });
        }
        let count = match range.item_count {
            Some(count) if count <= len - start => count,
            _ => len - start,
        };
        tracing::debug!(store_id = %self.versions.id(), start, count, len, "Loading page");
        Ok(list.range(start, count)?)
    }
}

impl<E> std::fmt::Debug for Engine<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("versions", &self.versions)
            .field("loaded", &self.loaded.len())
            .field("added", &self.added.len())
            .finish_non_exhaustive()
    }
}

/// The surface every content-addressed collection shares.
///
/// Implementors only provide access to their [`Engine`]; everything else is
/// defined here once.
pub trait ContentAddressable {
    /// Record type held by the collection.
    type Item;

    /// Shared engine state.
    fn engine(&self) -> &Engine<Self::Item>;

    /// Shared engine state, mutably.
    fn engine_mut(&mut self) -> &mut Engine<Self::Item>;

    /// Stage a record for the next commit. No validation, no I/O.
    fn add(&mut self, item: Self::Item) {
        let engine = self.engine_mut();
        engine.added.push(item);
        tracing::trace!(store_id = %engine.versions.id(), staged = engine.added.len(), "Staged record");
    }

    /// Loaded record at `index`.
    fn get_by_index_loaded(&self, index: usize) -> Option<&Self::Item> {
        self.engine().loaded.get(index).map(|entry| &entry.model)
    }

    /// Staged record at `index`.
    fn get_by_index_added(&self, index: usize) -> Option<&Self::Item> {
        self.engine().added.get(index)
    }

    /// Loaded record at `index`, mutably.
    fn get_by_index_loaded_mut(&mut self, index: usize) -> Option<&mut Self::Item> {
        self.engine_mut()
            .loaded
            .get_mut(index)
            .map(|entry| &mut entry.model)
    }

    /// Staged record at `index`, mutably.
    fn get_by_index_added_mut(&mut self, index: usize) -> Option<&mut Self::Item> {
        self.engine_mut().added.get_mut(index)
    }

    /// Number of loaded records.
    fn loaded_size(&self) -> usize {
        self.engine().loaded.len()
    }

    /// Number of staged records.
    fn added_size(&self) -> usize {
        self.engine().added.len()
    }

    /// Loaded records in list order.
    fn values_loaded(&self) -> Vec<&Self::Item> {
        self.engine().loaded.iter().map(|entry| &entry.model).collect()
    }

    /// Staged records in insertion order.
    fn values_added(&self) -> &[Self::Item] {
        &self.engine().added
    }

    /// Loaded entries with their version tags.
    fn entries_loaded(&self) -> &[Versioned<Self::Item>] {
        &self.engine().loaded
    }

    /// Visit loaded records with their buffer index.
    fn for_each_loaded<F>(&self, mut f: F)
    where
        F: FnMut(&Self::Item, usize),
        Self: Sized,
    {
        for (i, entry) in self.engine().loaded.iter().enumerate() {
            f(&entry.model, i);
        }
    }

    /// Visit staged records with their buffer index.
    fn for_each_added<F>(&self, mut f: F)
    where
        F: FnMut(&Self::Item, usize),
        Self: Sized,
    {
        for (i, item) in self.engine().added.iter().enumerate() {
            f(item, i);
        }
    }

    /// Length of the persisted list at the head (0 before the first commit).
    ///
    /// # Errors
    ///
    /// Returns error if the list node cannot be read.
    fn persisted_size(&self) -> Result<usize, CollectionError> {
        let engine = self.engine();
        Ok(RecordList::new(&engine.versions, &engine.graph).length()?)
    }

    /// Stable id of the version store.
    fn version_store_id(&self) -> &str {
        self.engine().versions.id()
    }

    /// Root of the version index.
    fn version_store_root(&self) -> Option<Link> {
        self.engine().versions.version_store_root()
    }

    /// Head list root.
    fn current_root(&self) -> Option<Link> {
        self.engine().versions.current_root()
    }

    /// Versions, newest first.
    fn log(&self) -> Vec<Version> {
        self.engine().versions.log()
    }

    /// Move the head to `root` and drop the loaded page. Staged records are
    /// kept and will be committed on top of the checked-out version.
    ///
    /// # Errors
    ///
    /// Returns error if `root` is not part of the lineage.
    fn checkout(&mut self, root: Link) -> Result<&mut Self, CollectionError> {
        let engine = self.engine_mut();
        engine.versions.checkout(root)?;
        engine.loaded.clear();
        if !engine.added.is_empty() {
            tracing::debug!(
                store_id = %engine.versions.id(),
                staged = engine.added.len(),
                root = %root,
                "Staged records carried across checkout"
            );
        }
        Ok(self)
    }

    /// Check the head version's signature against `public_key`.
    ///
    /// Any failure (unsigned, undecodable, wrong key, nothing committed) is
    /// `false`.
    fn verify(&self, public_key: &VerifyingKey) -> bool {
        self.engine()
            .versions
            .current_version()
            .is_some_and(|version| verify_version(public_key, version))
    }

    /// Bundle holding exactly the head version.
    ///
    /// # Errors
    ///
    /// Returns error if nothing is committed or a block is missing.
    fn export_current_version(&self) -> Result<Block, CollectionError> {
        let engine = self.engine();
        let root = engine
            .versions
            .current_root()
            .ok_or(CollectionError::NothingCommitted)?;
        Ok(pack_version(&root, engine.graph.blocks())?)
    }

    /// Bundle holding the whole lineage, head first.
    ///
    /// # Errors
    ///
    /// Returns error if there is no store root or a block is missing.
    fn export_complete(&self) -> Result<Block, CollectionError> {
        let engine = self.engine();
        let store_root = match engine.versions.version_store_root() {
            Some(root) => root,
            None if engine.versions.is_detached() => return Err(CollectionError::Detached),
            None => return Err(CollectionError::NothingCommitted),
        };
        let head = engine.versions.current_root();
        Ok(pack_complete(&store_root, head.as_ref(), engine.graph.blocks())?)
    }
}
