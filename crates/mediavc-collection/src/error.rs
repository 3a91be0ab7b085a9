//! Collection errors.

use mediavc_core::{BundleError, LinkError, StoreError};
use mediavc_proto::CodecError;
use mediavc_relay::RelayError;

/// Errors from collection and registry operations.
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    /// Load started outside the persisted list
    #[error("invalid start index {start} (length {len})")]
    InvalidStartIndex {
        /// Requested start
        start: usize,
        /// Persisted length
        len: usize,
    },

    /// Operation needs a committed version
    #[error("nothing committed")]
    NothingCommitted,

    /// Operation needs a store root, but the collection is detached
    #[error("collection is detached at a single version")]
    Detached,

    /// Imported bundle listed no versions
    #[error("bundle lists no versions")]
    EmptyBundle,

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Record encoding failure
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Bundle failure
    #[error(transparent)]
    Bundle(#[from] BundleError),

    /// Relay failure
    #[error(transparent)]
    Relay(#[from] RelayError),

    /// Malformed root string in a pointer record
    #[error(transparent)]
    Link(#[from] LinkError),
}
