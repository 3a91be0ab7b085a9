//! Leaf collections of records.

use crate::config::CollectionConfig;
use crate::engine::{CommitSummary, ContentAddressable, Engine, LoadRange, Versioned};
use crate::error::CollectionError;
use crate::sync::PullOutcome;
use mediavc_core::{CommitOptions, GraphStore, Link, VersionStore};
use mediavc_proto::{MediaNode, PushResponse, Record};
use mediavc_relay::{RelayClientBasic, RelayTransport};

/// A collection of media records.
pub type MediaCollection = Collection<MediaNode>;

/// A versioned, append-only list of records.
///
/// Clones share the block store but have independent buffers and heads.
#[derive(Debug, Clone)]
pub struct Collection<R> {
    engine: Engine<R>,
}

impl<R: Record> Collection<R> {
    /// Create a collection over existing stores.
    #[must_use]
    pub fn new(versions: VersionStore, graph: GraphStore, config: CollectionConfig) -> Self {
        Self {
            engine: Engine::new(versions, graph, config),
        }
    }

    /// Create an empty collection with a fresh version store.
    #[must_use]
    pub fn create(config: &CollectionConfig) -> Self {
        Self::new(config.version_store(), config.graph_store(), config.clone())
    }

    /// Write every staged record, in insertion order, as one new version.
    ///
    /// With nothing staged no version is created. The staged buffer is empty
    /// afterwards whether or not the commit succeeds.
    ///
    /// # Errors
    ///
    /// Returns error if a record cannot be encoded or a write fails.
    pub fn commit(&mut self, options: &CommitOptions<'_>) -> Result<CommitSummary, CollectionError> {
        let staged = self.engine.take_added();
        let records = staged
            .iter()
            .map(R::encode)
            .collect::<Result<Vec<_>, _>>()?;
        self.engine.commit_encoded(&records, options)
    }

    /// Read a page of the persisted list into the loaded buffer.
    ///
    /// # Errors
    ///
    /// Returns error if the start index is outside the list or a record
    /// cannot be decoded.
    pub fn load(&mut self, range: LoadRange) -> Result<Vec<&R>, CollectionError> {
        self.engine.loaded.clear();
        let loaded = self
            .engine
            .read_range(range)?
            .iter()
            .map(|bytes| {
                R::decode(bytes).map(|model| Versioned {
                    model,
                    version: None,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.engine.loaded = loaded;
        Ok(self.values_loaded())
    }

    /// Upload the lineage with the current head to a relay.
    ///
    /// # Errors
    ///
    /// Returns error if nothing is committed or the relay fails.
    pub async fn push<T: RelayTransport>(&self, relay: &T) -> Result<PushResponse, CollectionError> {
        self.engine.push_to(relay).await
    }

    /// Fast-forward the head to the relay's head for this store id.
    ///
    /// # Errors
    ///
    /// Returns error if the relay fails or the pulled bundle is corrupt.
    pub async fn pull<T: RelayTransport>(&mut self, relay: &T) -> Result<PullOutcome, CollectionError> {
        self.engine.pull_from(relay).await
    }
}

impl<R> ContentAddressable for Collection<R> {
    type Item = R;

    fn engine(&self) -> &Engine<R> {
        &self.engine
    }

    fn engine_mut(&mut self) -> &mut Engine<R> {
        &mut self.engine
    }
}

/// Fetch a collection by store id from a relay.
///
/// Returns `None` if the relay does not know the store.
///
/// # Errors
///
/// Returns error if the relay fails or the bundle is corrupt.
pub async fn pull_collection<R: Record, T: RelayTransport>(
    relay: &T,
    store_id: &str,
    config: &CollectionConfig,
) -> Result<Option<Collection<R>>, CollectionError> {
    let graph = config.graph_store();
    let pulled = RelayClientBasic::new(relay, &graph).pull(store_id, None).await?;
    Ok(pulled.map(|pulled| Collection::new(pulled.version_store, pulled.graph_store, config.clone())))
}

/// Open a persisted collection at its store root, head at the latest version.
///
/// # Errors
///
/// Returns error if the index cannot be read.
pub fn retrieve_collection<R: Record>(
    store_root: Link,
    config: &CollectionConfig,
) -> Result<Collection<R>, CollectionError> {
    let versions = VersionStore::open(config.block_store().clone(), store_root, None)?;
    Ok(Collection::new(versions, config.graph_store(), config.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mediavc_core::StoreError;
    use mediavc_proto::Media;

    fn node(i: usize) -> MediaNode {
        MediaNode::new(
            format!("id-{i}"),
            1_700_000_000_000 + i as i64,
            format!("comment {i}"),
            Media::new(format!("file-{i}.txt"), "text/plain", format!("data {i}").into_bytes()),
        )
    }

    fn collection_with(n: usize) -> MediaCollection {
        let mut collection = MediaCollection::create(&CollectionConfig::in_memory());
        for i in 0..n {
            collection.add(node(i));
        }
        collection.commit(&CommitOptions::default()).unwrap();
        collection
    }

    #[test]
    fn load_defaults_to_whole_list() {
        let mut collection = collection_with(3);
        let loaded = collection.load(LoadRange::all()).unwrap();
        assert_eq!(loaded, vec![&node(0), &node(1), &node(2)]);
    }

    #[test]
    fn load_clamps_overlong_count() {
        let mut collection = collection_with(5);
        let page: Vec<String> = collection
            .load(LoadRange::new(3, 100))
            .unwrap()
            .into_iter()
            .map(|n| n.id.clone())
            .collect();
        assert_eq!(page, vec!["id-3", "id-4"]);
    }

    #[test]
    fn load_rejects_start_past_end() {
        let mut collection = collection_with(2);
        assert!(matches!(
            collection.load(LoadRange::from_index(2)),
            Err(CollectionError::InvalidStartIndex { start: 2, len: 2 })
        ));
        assert_eq!(collection.loaded_size(), 0);
    }

    #[test]
    fn load_before_commit_is_empty() {
        let mut collection = MediaCollection::create(&CollectionConfig::in_memory());
        assert!(collection.load(LoadRange::from_index(5)).unwrap().is_empty());
    }

    #[test]
    fn load_replaces_previous_page() {
        let mut collection = collection_with(4);
        collection.load(LoadRange::all()).unwrap();
        assert_eq!(collection.loaded_size(), 4);
        collection.load(LoadRange::new(1, 1)).unwrap();
        assert_eq!(collection.loaded_size(), 1);
        assert_eq!(collection.get_by_index_loaded(0), Some(&node(1)));
    }

    #[test]
    fn commit_clears_staged_buffer() {
        let mut collection = MediaCollection::create(&CollectionConfig::in_memory());
        collection.add(node(0));
        collection.add(node(1));
        assert_eq!(collection.added_size(), 2);
        collection.commit(&CommitOptions::default()).unwrap();
        assert_eq!(collection.added_size(), 0);
        assert_eq!(collection.persisted_size().unwrap(), 2);
    }

    #[test]
    fn checkout_unknown_root_fails() {
        let mut collection = collection_with(1);
        let err = collection.checkout(Link::digest(b"elsewhere")).err().unwrap();
        assert!(matches!(err, CollectionError::Store(StoreError::UnknownVersion(_))));
    }

    #[test]
    fn for_each_visits_in_order() {
        let mut collection = collection_with(3);
        collection.load(LoadRange::all()).unwrap();
        let mut seen = Vec::new();
        collection.for_each_loaded(|n, i| seen.push((i, n.id.clone())));
        assert_eq!(seen[2], (2, "id-2".to_string()));

        collection.add(node(9));
        let mut staged = 0;
        collection.for_each_added(|_, _| staged += 1);
        assert_eq!(staged, 1);
    }
}
