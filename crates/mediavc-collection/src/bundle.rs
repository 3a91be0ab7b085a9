//! Importing bundles produced by `export_current_version` and
//! `export_complete`.
//!
//! Both imports unpack into a scratch store first, so a corrupt bundle never
//! touches the persistent block store, then merge the scratch blocks in.

use crate::collection::Collection;
use crate::config::CollectionConfig;
use crate::error::CollectionError;
use crate::registry::Registry;
use mediavc_core::pack::{restore_complete, restore_version};
use mediavc_core::{MemoryBlockStore, VersionStore};
use mediavc_proto::Record;

/// Version store detached at the single version carried by `bundle`.
fn import_version_store(
    bundle: &[u8],
    config: &CollectionConfig,
) -> Result<VersionStore, CollectionError> {
    let scratch = MemoryBlockStore::new();
    let root = restore_version(bundle, &scratch)?;
    let merged = scratch.push_into(config.block_store().as_ref())?;
    tracing::info!(root = %root, blocks = merged, "Imported version bundle");
    Ok(VersionStore::detached(config.block_store().clone(), root))
}

/// Version store anchored at the bundle's store root, head at its first root.
fn import_complete_store(
    bundle: &[u8],
    config: &CollectionConfig,
) -> Result<VersionStore, CollectionError> {
    let scratch = MemoryBlockStore::new();
    let restored = restore_complete(bundle, &scratch)?;
    let head = *restored
        .version_roots
        .first()
        .ok_or(CollectionError::EmptyBundle)?;
    let merged = scratch.push_into(config.block_store().as_ref())?;
    tracing::info!(
        store_root = %restored.store_root,
        head = %head,
        versions = restored.version_roots.len(),
        blocks = merged,
        "Imported complete bundle"
    );
    Ok(VersionStore::open(
        config.block_store().clone(),
        restored.store_root,
        Some(head),
    )?)
}

/// Import a version bundle as a collection with no lineage.
///
/// The result can be read and extended, but `checkout` to any other version
/// fails.
///
/// # Errors
///
/// Returns error if the bundle is malformed, corrupt, or not a version bundle.
pub fn import_collection_version<R: Record>(
    bundle: &[u8],
    config: &CollectionConfig,
) -> Result<Collection<R>, CollectionError> {
    let versions = import_version_store(bundle, config)?;
    Ok(Collection::new(versions, config.graph_store(), config.clone()))
}

/// Import a complete bundle as a collection with its full lineage.
///
/// # Errors
///
/// Returns error if the bundle is malformed, corrupt, or not a complete bundle.
pub fn import_collection_complete<R: Record>(
    bundle: &[u8],
    config: &CollectionConfig,
) -> Result<Collection<R>, CollectionError> {
    let versions = import_complete_store(bundle, config)?;
    Ok(Collection::new(versions, config.graph_store(), config.clone()))
}

/// Import a version bundle as a registry with no lineage.
///
/// Only the registry's own pointer records are carried; nested collections
/// must already be present in the block store to be loaded.
///
/// # Errors
///
/// Returns error if the bundle is malformed, corrupt, or not a version bundle.
pub fn import_registry_version<R: Record>(
    bundle: &[u8],
    config: &CollectionConfig,
) -> Result<Registry<R>, CollectionError> {
    let versions = import_version_store(bundle, config)?;
    Ok(Registry::new(versions, config.graph_store(), config.clone()))
}

/// Import a complete bundle as a registry with its full lineage.
///
/// # Errors
///
/// Returns error if the bundle is malformed, corrupt, or not a complete bundle.
pub fn import_registry_complete<R: Record>(
    bundle: &[u8],
    config: &CollectionConfig,
) -> Result<Registry<R>, CollectionError> {
    let versions = import_complete_store(bundle, config)?;
    Ok(Registry::new(versions, config.graph_store(), config.clone()))
}
