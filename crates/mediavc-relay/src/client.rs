//! Relay clients.
//!
//! The basic tier moves whole version stores (pack on push, restore on pull).
//! The plumbing tier exposes the raw index bundle for cheap remote checks.

use crate::transport::{RelayError, RelayTransport};
use mediavc_core::pack::{pack_complete, restore_complete};
use mediavc_core::{GraphStore, Link, MemoryBlockStore, VersionStore};
use mediavc_proto::PushResponse;

/// A version store pulled from a relay, backed by the local block store.
#[derive(Clone)]
pub struct PulledStore {
    /// Lineage as served by the relay, head at the relay's head
    pub version_store: VersionStore,
    /// Graph store over the local block store
    pub graph_store: GraphStore,
}

/// Push and pull whole version stores.
pub struct RelayClientBasic<'a, T> {
    relay: &'a T,
    graph: &'a GraphStore,
}

impl<'a, T: RelayTransport> RelayClientBasic<'a, T> {
    /// Create a client over the local graph store.
    #[must_use]
    pub fn new(relay: &'a T, graph: &'a GraphStore) -> Self {
        Self { relay, graph }
    }

    /// Push the store at `store_root` with `head_root` as its head.
    ///
    /// # Errors
    ///
    /// Returns error if packing or the relay fails.
    pub async fn push(&self, store_root: &Link, head_root: &Link) -> Result<PushResponse, RelayError> {
        let bundle = pack_complete(store_root, Some(head_root), self.graph.blocks())?;
        tracing::debug!(
            store_root = %store_root,
            head_root = %head_root,
            bytes = bundle.bytes.len(),
            "Pushing store"
        );
        self.relay.push_bundle(bundle.bytes).await
    }

    /// Pull the store `store_id` into the local block store.
    ///
    /// Returns `None` if the relay does not know the store.
    ///
    /// # Errors
    ///
    /// Returns error if the relay fails or the bundle is corrupt.
    pub async fn pull(
        &self,
        store_id: &str,
        known_root: Option<&Link>,
    ) -> Result<Option<PulledStore>, RelayError> {
        let Some(bytes) = self.relay.pull_bundle(store_id, known_root).await? else {
            tracing::debug!(store_id, "Relay does not know store");
            return Ok(None);
        };

        let scratch = MemoryBlockStore::new();
        let restored = restore_complete(&bytes, &scratch)?;
        scratch.push_into(self.graph.blocks())?;

        let version_store = VersionStore::open(
            self.graph.block_store().clone(),
            restored.store_root,
            restored.version_roots.first().copied(),
        )?;
        Ok(Some(PulledStore {
            version_store,
            graph_store: self.graph.clone(),
        }))
    }
}

/// Raw bundle access.
pub struct RelayClientPlumbing<'a, T> {
    relay: &'a T,
}

impl<'a, T: RelayTransport> RelayClientPlumbing<'a, T> {
    /// Create a plumbing client.
    #[must_use]
    pub fn new(relay: &'a T) -> Self {
        Self { relay }
    }

    /// Fetch the index bundle for `store_id`, if the relay knows it.
    ///
    /// # Errors
    ///
    /// Returns error if the relay fails.
    pub async fn store_pull(
        &self,
        chunk_hint: usize,
        store_id: &str,
    ) -> Result<Option<Vec<u8>>, RelayError> {
        self.relay.pull_index(chunk_hint, store_id).await
    }
}
