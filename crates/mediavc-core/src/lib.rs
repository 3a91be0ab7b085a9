//! # mediavc Core
//!
//! Content-addressed storage substrate for versioned media collections.
//!
//! This crate provides:
//! - Content identifiers ([`Link`]) and blocks addressed by them
//! - Block stores (in-memory reference implementation behind a trait)
//! - Fixed-size chunking and a graph store that splits large values
//! - A version store holding the ordered lineage of list roots
//! - Record lists with transactional append
//! - Bundle packing/restoring for transport between stores
//! - Ed25519 signing of version roots

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod block;
pub mod chunk;
pub mod graph;
pub mod link;
pub mod list;
pub mod node;
pub mod pack;
pub mod sign;
pub mod version;

mod raw_bytes;

pub use block::{BlockStore, MemoryBlockStore, SharedBlockStore, StoreError};
pub use chunk::{Chunker, FixedSizeChunker, DEFAULT_CHUNK_SIZE};
pub use graph::GraphStore;
pub use link::{Block, Link, LinkError};
pub use list::{CommitOptions, RecordList, Transaction};
pub use node::GraphNode;
pub use pack::{Bundle, BundleError, RestoredComplete, RestoredIndex};
pub use sign::{verify_signature, verify_version, Ed25519Signer, SignError, Signer};
pub use version::{Version, VersionDetails, VersionIndex, VersionSnapshot, VersionStore};
