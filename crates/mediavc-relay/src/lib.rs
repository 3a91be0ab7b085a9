//! # mediavc Relay
//!
//! Moving version stores between peers through a relay.
//!
//! This crate provides:
//! - [`RelayTransport`], the three raw relay operations
//! - [`HttpRelay`], the transport over HTTP
//! - [`MemoryRelay`], an in-process relay for tests and embedding
//! - [`RelayClientBasic`] and [`RelayClientPlumbing`], the two client tiers

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod http;
pub mod memory;
pub mod transport;

pub use client::{PulledStore, RelayClientBasic, RelayClientPlumbing};
pub use http::{HttpRelay, RelayConfig};
pub use memory::MemoryRelay;
pub use transport::{RelayError, RelayTransport};
