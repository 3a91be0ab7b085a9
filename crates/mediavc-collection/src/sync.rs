//! Relay synchronisation: push, pull and remote-update detection.
//!
//! Pull is a fast-forward of the head to whatever the relay serves. It is not
//! a merge: when the local head is not part of the remote lineage the local
//! head is overwritten, and [`PullOutcome::Overwrote`] says so.

use crate::engine::Engine;
use crate::error::CollectionError;
use mediavc_core::pack::restore_single_index;
use mediavc_core::{Link, MemoryBlockStore, VersionStore};
use mediavc_proto::PushResponse;
use mediavc_relay::{RelayClientBasic, RelayClientPlumbing, RelayTransport};

/// What a pull did to the local head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// The relay does not know this store
    NotFound,
    /// Local head already equals the relay's head
    UpToDate,
    /// Head moved forward along the same lineage (or was unset)
    FastForward,
    /// Local head was not in the remote lineage and has been replaced
    Overwrote,
}

impl<E> Engine<E> {
    pub(crate) async fn push_to<T: RelayTransport>(
        &self,
        relay: &T,
    ) -> Result<PushResponse, CollectionError> {
        let head = self
            .versions
            .current_root()
            .ok_or(CollectionError::NothingCommitted)?;
        let store_root = self
            .versions
            .version_store_root()
            .ok_or(CollectionError::Detached)?;

        let response = RelayClientBasic::new(relay, &self.graph)
            .push(&store_root, &head)
            .await?;
        tracing::info!(
            store_id = %response.store_id,
            current_root = %response.current_root,
            "Pushed collection"
        );
        Ok(response)
    }

    pub(crate) async fn pull_from<T: RelayTransport>(
        &mut self,
        relay: &T,
    ) -> Result<PullOutcome, CollectionError> {
        let known = self.versions.version_store_root();
        let pulled = RelayClientBasic::new(relay, &self.graph)
            .pull(self.versions.id(), known.as_ref())
            .await?;
        let Some(snapshot) = pulled.and_then(|p| p.version_store.version_get()) else {
            tracing::info!(store_id = %self.versions.id(), "Relay has nothing for this store");
            return Ok(PullOutcome::NotFound);
        };

        let remote_head = snapshot.head.root;
        let outcome = match self.versions.current_root() {
            Some(local) if local == remote_head => PullOutcome::UpToDate,
            Some(local) if !snapshot.index.versions.iter().any(|v| v.root == local) => {
                tracing::warn!(
                    store_id = %self.versions.id(),
                    local_head = %local,
                    remote_head = %remote_head,
                    "Local head not in remote lineage, overwriting"
                );
                PullOutcome::Overwrote
            }
            _ => PullOutcome::FastForward,
        };

        self.versions.version_set(snapshot);
        tracing::info!(
            store_id = %self.versions.id(),
            head = %remote_head,
            outcome = ?outcome,
            "Pulled collection"
        );
        Ok(outcome)
    }
}

/// Head of the lineage the relay serves for `store_id`, read from the
/// lightweight index bundle. `None` when the relay does not know the store.
pub(crate) async fn fetch_remote_head<T: RelayTransport>(
    relay: &T,
    chunk_hint: usize,
    store_id: &str,
) -> Result<Option<Link>, CollectionError> {
    let Some(bytes) = RelayClientPlumbing::new(relay)
        .store_pull(chunk_hint, store_id)
        .await?
    else {
        return Ok(None);
    };

    let scratch = MemoryBlockStore::shared();
    let restored = restore_single_index(&bytes, scratch.as_ref())?;
    let remote = VersionStore::open(scratch, restored.store_root, Some(restored.head))?;
    Ok(remote.current_root())
}
