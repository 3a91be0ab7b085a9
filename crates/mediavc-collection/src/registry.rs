//! Named collection registries.
//!
//! A registry is itself a versioned collection whose records are pointers
//! `{name, version_store_root, current_root}` to nested collections. A
//! commit only writes pointers for collections that are newly staged or that
//! were loaded and have since moved their head; untouched nested collections
//! are never re-persisted.

use crate::collection::Collection;
use crate::config::CollectionConfig;
use crate::engine::{CommitSummary, ContentAddressable, Engine, LoadRange, Versioned};
use crate::error::CollectionError;
use crate::sync::{fetch_remote_head, PullOutcome};
use mediavc_core::{CommitOptions, GraphStore, Link, VersionStore};
use mediavc_proto::{CollectionPointer, MediaNode, PushResponse, Record};
use mediavc_relay::{RelayClientBasic, RelayTransport};

/// A registry of media collections.
pub type MediaRegistry = Registry<MediaNode>;

/// A collection paired with the name it is registered under.
#[derive(Debug, Clone)]
pub struct NamedCollection<R> {
    name: String,
    collection: Collection<R>,
}

impl<R: Record> NamedCollection<R> {
    /// Pair `collection` with `name`.
    #[must_use]
    pub fn new(name: impl Into<String>, collection: Collection<R>) -> Self {
        Self {
            name: name.into(),
            collection,
        }
    }

    /// Registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped collection.
    #[must_use]
    pub fn collection(&self) -> &Collection<R> {
        &self.collection
    }

    /// The wrapped collection, mutably.
    pub fn collection_mut(&mut self) -> &mut Collection<R> {
        &mut self.collection
    }

    /// Unwrap the collection.
    #[must_use]
    pub fn into_inner(self) -> Collection<R> {
        self.collection
    }

    /// See [`Collection::commit`].
    ///
    /// # Errors
    ///
    /// Returns error if a record cannot be encoded or a write fails.
    pub fn commit(&mut self, options: &CommitOptions<'_>) -> Result<CommitSummary, CollectionError> {
        self.collection.commit(options)
    }

    /// See [`Collection::load`].
    ///
    /// # Errors
    ///
    /// Returns error if the start index is outside the list or a record
    /// cannot be decoded.
    pub fn load(&mut self, range: LoadRange) -> Result<Vec<&R>, CollectionError> {
        self.collection.load(range)
    }

    /// See [`Collection::push`].
    ///
    /// # Errors
    ///
    /// Returns error if nothing is committed or the relay fails.
    pub async fn push<T: RelayTransport>(&self, relay: &T) -> Result<PushResponse, CollectionError> {
        self.collection.push(relay).await
    }

    /// See [`Collection::pull`].
    ///
    /// # Errors
    ///
    /// Returns error if the relay fails or the pulled bundle is corrupt.
    pub async fn pull<T: RelayTransport>(&mut self, relay: &T) -> Result<PullOutcome, CollectionError> {
        self.collection.pull(relay).await
    }

    fn pointer(&self) -> Option<CollectionPointer> {
        let current_root = self.current_root()?;
        let Some(store_root) = self.version_store_root() else {
            tracing::warn!(name = %self.name, "Detached collection has no store root, not registering");
            return None;
        };
        Some(CollectionPointer {
            name: self.name.clone(),
            version_store_root: store_root.to_string(),
            current_root: current_root.to_string(),
        })
    }
}

impl<R> ContentAddressable for NamedCollection<R> {
    type Item = R;

    fn engine(&self) -> &Engine<R> {
        self.collection.engine()
    }

    fn engine_mut(&mut self) -> &mut Engine<R> {
        self.collection.engine_mut()
    }
}

/// A versioned collection of named collection pointers.
#[derive(Debug, Clone)]
pub struct Registry<R> {
    engine: Engine<NamedCollection<R>>,
}

impl<R: Record> Registry<R> {
    /// Create a registry over existing stores.
    #[must_use]
    pub fn new(versions: VersionStore, graph: GraphStore, config: CollectionConfig) -> Self {
        Self {
            engine: Engine::new(versions, graph, config),
        }
    }

    /// Create an empty registry with a fresh version store.
    #[must_use]
    pub fn create(config: &CollectionConfig) -> Self {
        Self::new(config.version_store(), config.graph_store(), config.clone())
    }

    /// Stage `collection` under `name`.
    pub fn add_collection(&mut self, name: impl Into<String>, collection: Collection<R>) {
        self.add(NamedCollection::new(name, collection));
    }

    /// Staged collections named `name`, most recent last.
    #[must_use]
    pub fn get_by_name_added(&self, name: &str) -> Vec<&NamedCollection<R>> {
        self.engine.added.iter().filter(|c| c.name == name).collect()
    }

    /// Loaded collections named `name`, most recent last.
    #[must_use]
    pub fn get_by_name_loaded(&self, name: &str) -> Vec<&NamedCollection<R>> {
        self.engine
            .loaded
            .iter()
            .map(|entry| &entry.model)
            .filter(|c| c.name == name)
            .collect()
    }

    pub(crate) fn last_added_position(&self, name: &str) -> Option<usize> {
        self.engine.added.iter().rposition(|c| c.name == name)
    }

    pub(crate) fn last_loaded_position(&self, name: &str) -> Option<usize> {
        self.engine.loaded.iter().rposition(|entry| entry.model.name == name)
    }

    /// Commit every changed or newly staged collection.
    ///
    /// # Errors
    ///
    /// Returns error if a pointer cannot be encoded or a write fails.
    pub fn commit(&mut self, options: &CommitOptions<'_>) -> Result<CommitSummary, CollectionError> {
        self.commit_collection(None, options)
    }

    /// Persist pointers for staged collections and for loaded collections
    /// whose head moved since load, optionally only those named
    /// `collection_name`. Produces at most one registry version.
    ///
    /// Staged collections with another name stay staged; matching ones are
    /// dropped from the buffer whether or not the commit succeeds.
    ///
    /// # Errors
    ///
    /// Returns error if a pointer cannot be encoded or a write fails.
    pub fn commit_collection(
        &mut self,
        collection_name: Option<&str>,
        options: &CommitOptions<'_>,
    ) -> Result<CommitSummary, CollectionError> {
        let selected = |name: &str| collection_name.map_or(true, |wanted| wanted == name);

        let (staged, pending): (Vec<_>, Vec<_>) = self
            .engine
            .take_added()
            .into_iter()
            .partition(|c| selected(&c.name));
        self.engine.added = pending;

        let mut pointers: Vec<CollectionPointer> =
            staged.iter().filter_map(NamedCollection::pointer).collect();
        let added = pointers.len();

        for entry in &self.engine.loaded {
            if !selected(&entry.model.name) {
                continue;
            }
            let Some(current) = entry.model.current_root() else {
                continue;
            };
            if entry.version.as_deref() != Some(current.to_string().as_str()) {
                pointers.extend(entry.model.pointer());
            }
        }
        let changed = pointers.len() - added;

        let records = pointers
            .iter()
            .map(CollectionPointer::encode)
            .collect::<Result<Vec<_>, _>>()?;
        let summary = self.engine.commit_encoded(&records, options)?;
        for entry in &mut self.engine.loaded {
            if selected(&entry.model.name) {
                entry.version = entry.model.current_root().map(|root| root.to_string());
            }
        }
        tracing::info!(
            store_id = %summary.version_store_id,
            filter = collection_name.unwrap_or("*"),
            added,
            changed,
            "Committed registry"
        );
        Ok(summary)
    }

    /// Load a page of pointers, reopening each nested collection at its
    /// recorded head.
    ///
    /// # Errors
    ///
    /// Returns error if the start index is outside the list, a pointer cannot
    /// be decoded, or a nested collection cannot be opened.
    pub fn load(&mut self, range: LoadRange) -> Result<Vec<&NamedCollection<R>>, CollectionError> {
        self.engine.loaded.clear();
        let config = self.engine.config.clone();
        let mut loaded = Vec::new();
        for bytes in self.engine.read_range(range)? {
            let pointer = CollectionPointer::decode(&bytes)?;
            let store_root: Link = pointer.version_store_root.parse()?;
            let current_root: Link = pointer.current_root.parse()?;
            let versions = VersionStore::open(
                config.block_store().clone(),
                store_root,
                Some(current_root),
            )?;
            let collection = Collection::new(versions, config.graph_store(), config.clone());
            loaded.push(Versioned {
                model: NamedCollection::new(pointer.name, collection),
                version: Some(pointer.current_root),
            });
        }
        self.engine.loaded = loaded;
        Ok(self.values_loaded())
    }

    /// Whether the relay serves a head for `name` that none of the loaded
    /// collections with that name already contain.
    ///
    /// Any failure along the way is logged and reported as `false`.
    pub async fn are_remote_updates_for_loaded_collection<T: RelayTransport>(
        &self,
        name: &str,
        relay: &T,
    ) -> bool {
        let locals = self.get_by_name_loaded(name);
        let Some(first) = locals.first() else {
            tracing::debug!(name, "No loaded collection to compare against");
            return false;
        };

        let remote_head =
            match fetch_remote_head(relay, self.engine.config.chunk_size(), first.version_store_id())
                .await
            {
                Ok(Some(head)) => head,
                Ok(None) => return false,
                Err(err) => {
                    tracing::warn!(name, error = %err, "Remote update check failed");
                    return false;
                }
            };

        let known = locals
            .iter()
            .any(|c| c.engine().versions.includes_version(&remote_head));
        tracing::debug!(name, remote_head = %remote_head, known, "Checked for remote updates");
        !known
    }

    /// Upload the registry lineage to a relay.
    ///
    /// # Errors
    ///
    /// Returns error if nothing is committed or the relay fails.
    pub async fn push<T: RelayTransport>(&self, relay: &T) -> Result<PushResponse, CollectionError> {
        self.engine.push_to(relay).await
    }

    /// Fast-forward the registry head to the relay's head.
    ///
    /// # Errors
    ///
    /// Returns error if the relay fails or the pulled bundle is corrupt.
    pub async fn pull<T: RelayTransport>(&mut self, relay: &T) -> Result<PullOutcome, CollectionError> {
        self.engine.pull_from(relay).await
    }
}

impl<R> ContentAddressable for Registry<R> {
    type Item = NamedCollection<R>;

    fn engine(&self) -> &Engine<NamedCollection<R>> {
        &self.engine
    }

    fn engine_mut(&mut self) -> &mut Engine<NamedCollection<R>> {
        &mut self.engine
    }
}

/// Fetch a registry by store id from a relay.
///
/// # Errors
///
/// Returns error if the relay fails or the bundle is corrupt.
pub async fn pull_registry<R: Record, T: RelayTransport>(
    relay: &T,
    store_id: &str,
    config: &CollectionConfig,
) -> Result<Option<Registry<R>>, CollectionError> {
    let graph = config.graph_store();
    let pulled = RelayClientBasic::new(relay, &graph).pull(store_id, None).await?;
    Ok(pulled.map(|pulled| Registry::new(pulled.version_store, pulled.graph_store, config.clone())))
}

/// Open a persisted registry at its store root, head at the latest version.
///
/// # Errors
///
/// Returns error if the index cannot be read.
pub fn retrieve_registry<R: Record>(
    store_root: Link,
    config: &CollectionConfig,
) -> Result<Registry<R>, CollectionError> {
    let versions = VersionStore::open(config.block_store().clone(), store_root, None)?;
    Ok(Registry::new(versions, config.graph_store(), config.clone()))
}
