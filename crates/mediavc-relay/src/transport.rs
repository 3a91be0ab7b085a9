//! Relay transport abstraction.

use mediavc_core::{BundleError, Link, StoreError};
use mediavc_proto::PushResponse;
use std::future::Future;

/// Raw relay operations. Bundles are opaque CBOR bytes at this level.
pub trait RelayTransport: Send + Sync {
    /// Upload a complete bundle. The relay keeps it as the latest lineage for
    /// the store id found in the bundle's index.
    fn push_bundle(
        &self,
        bundle: Vec<u8>,
    ) -> impl Future<Output = Result<PushResponse, RelayError>> + Send;

    /// Download the complete bundle for `store_id`, or `None` if unknown.
    fn pull_bundle(
        &self,
        store_id: &str,
        known_root: Option<&Link>,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, RelayError>> + Send;

    /// Download only the index bundle for `store_id`, or `None` if unknown.
    fn pull_index(
        &self,
        chunk_hint: usize,
        store_id: &str,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, RelayError>> + Send;
}

/// Errors that can occur talking to a relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Client initialization failed
    #[error("client init error: {0}")]
    Init(String),

    /// HTTP request failed
    #[error("request error: {0}")]
    Request(String),

    /// Relay returned an error status
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the relay
        message: String,
    },

    /// Response parsing failed
    #[error("parse error: {0}")]
    Parse(String),

    /// Pushed bundle lists no versions
    #[error("bundle has no versions")]
    EmptyBundle,

    /// Relay state lock poisoned
    #[error("relay state lock poisoned")]
    Poisoned,

    /// Bundle packing or restoring failed
    #[error(transparent)]
    Bundle(#[from] BundleError),

    /// Local storage failed
    #[error(transparent)]
    Store(#[from] StoreError),
}
