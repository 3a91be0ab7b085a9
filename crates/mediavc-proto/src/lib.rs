//! # mediavc Protocol
//!
//! Wire formats for mediavc.
//!
//! This crate defines:
//! - The fixed-tag field map codec every record is persisted with
//! - Media records and registry pointer records
//! - Relay push responses

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fields;
pub mod media;
pub mod messages;
pub mod pointer;

pub use fields::{CodecError, FieldMap, FieldValue, Record};
pub use media::{Media, MediaNode, MediaNodeKeys};
pub use messages::{MessageError, PushResponse};
pub use pointer::{CollectionPointer, PointerKeys};
