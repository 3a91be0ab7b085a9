//! # mediavc Collections
//!
//! Versioned, content-addressed collections of records and registries that
//! name them.
//!
//! This crate provides:
//! - [`Collection`], an append-only record list with staged adds, paged
//!   loads, commits, checkout and signature verification
//! - [`Registry`], a collection of [`NamedCollection`] pointers that only
//!   persists new or changed nested collections
//! - [`RegistryView`], lookup by name with a backward paged scan
//! - Relay push/pull, remote-update detection and bundle import/export
//!
//! Storage comes from `mediavc-core`; record encodings from `mediavc-proto`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bundle;
pub mod collection;
pub mod config;
pub mod engine;
pub mod error;
pub mod registry;
pub mod sync;
pub mod view;

pub use bundle::{
    import_collection_complete, import_collection_version, import_registry_complete,
    import_registry_version,
};
pub use collection::{pull_collection, retrieve_collection, Collection, MediaCollection};
pub use config::CollectionConfig;
pub use engine::{CommitSummary, ContentAddressable, Engine, LoadRange, Versioned};
pub use error::CollectionError;
pub use registry::{pull_registry, retrieve_registry, MediaRegistry, NamedCollection, Registry};
pub use sync::PullOutcome;
pub use view::{RegistryView, VIEW_PAGE_SIZE};

pub use mediavc_core::{CommitOptions, Ed25519Signer, Link};
pub use mediavc_proto::{Media, MediaNode, Record};
