//! In-process relay.
//!
//! Keeps one lineage per store id; the most recent push wins.

use crate::transport::{RelayError, RelayTransport};
use mediavc_core::pack::{pack_complete, pack_index, restore_complete};
use mediavc_core::{Link, MemoryBlockStore, VersionStore};
use mediavc_proto::PushResponse;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy)]
struct ServedStore {
    store_root: Link,
    current_root: Link,
}

/// Relay holding blocks in memory.
#[derive(Debug, Default)]
pub struct MemoryRelay {
    blocks: Arc<MemoryBlockStore>,
    stores: Mutex<HashMap<String, ServedStore>>,
}

impl MemoryRelay {
    /// Create an empty relay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store root and head currently served for `store_id`.
    ///
    /// # Errors
    ///
    /// Returns error if the state lock is poisoned.
    pub fn served(&self, store_id: &str) -> Result<Option<(Link, Link)>, RelayError> {
        Ok(self
            .lookup(store_id)?
            .map(|served| (served.store_root, served.current_root)))
    }

    /// Number of store ids known to the relay.
    ///
    /// # Errors
    ///
    /// Returns error if the state lock is poisoned.
    pub fn store_count(&self) -> Result<usize, RelayError> {
        Ok(self.stores.lock().map_err(|_| RelayError::Poisoned)?.len())
    }

    fn lookup(&self, store_id: &str) -> Result<Option<ServedStore>, RelayError> {
        let stores = self.stores.lock().map_err(|_| RelayError::Poisoned)?;
        Ok(stores.get(store_id).copied())
    }
}

impl RelayTransport for MemoryRelay {
    async fn push_bundle(&self, bundle: Vec<u8>) -> Result<PushResponse, RelayError> {
        let restored = restore_complete(&bundle, &*self.blocks)?;
        let current_root = *restored
            .version_roots
            .first()
            .ok_or(RelayError::EmptyBundle)?;
        let versions = VersionStore::open(
            self.blocks.clone(),
            restored.store_root,
            Some(current_root),
        )?;
        let store_id = versions.id().to_string();

        let previous = self
            .stores
            .lock()
            .map_err(|_| RelayError::Poisoned)?
            .insert(
                store_id.clone(),
                ServedStore {
                    store_root: restored.store_root,
                    current_root,
                },
            );
        tracing::info!(
            store_id = %store_id,
            store_root = %restored.store_root,
            current_root = %current_root,
            replaced = previous.is_some(),
            "Relay accepted push"
        );

        Ok(PushResponse::new(
            store_id,
            restored.store_root.to_string(),
            current_root.to_string(),
        ))
    }

    async fn pull_bundle(
        &self,
        store_id: &str,
        known_root: Option<&Link>,
    ) -> Result<Option<Vec<u8>>, RelayError> {
        let Some(served) = self.lookup(store_id)? else {
            return Ok(None);
        };
        if known_root == Some(&served.store_root) {
            tracing::debug!(store_id, "Puller already has the served store root");
        }
        let bundle = pack_complete(
            &served.store_root,
            Some(&served.current_root),
            &*self.blocks,
        )?;
        Ok(Some(bundle.bytes))
    }

    async fn pull_index(
        &self,
        _chunk_hint: usize,
        store_id: &str,
    ) -> Result<Option<Vec<u8>>, RelayError> {
        let Some(served) = self.lookup(store_id)? else {
            return Ok(None);
        };
        let bundle = pack_index(&served.store_root, &served.current_root, &*self.blocks)?;
        Ok(Some(bundle.bytes))
    }
}
