//! Content identifiers and blocks.
//!
//! A [`Link`] is the SHA-256 digest of a block's bytes. Its canonical string
//! form is unpadded base64url, which is what gets stored inside records and
//! compared as a version tag.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Length of a link digest in bytes.
pub const LINK_LEN: usize = 32;

/// Content identifier of a block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Link([u8; LINK_LEN]);

impl Link {
    /// Compute the link for the given bytes.
    #[must_use]
    pub fn digest(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; LINK_LEN];
        out.copy_from_slice(&digest);
        Self(out)
    }

    /// Wrap a raw digest.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; LINK_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; LINK_LEN] {
        &self.0
    }

    /// Canonical string form (unpadded base64url).
    #[must_use]
    pub fn encode_string(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    /// Parse the canonical string form.
    ///
    /// # Errors
    ///
    /// Returns error if the string is not base64url or has the wrong length.
    pub fn parse_string(s: &str) -> Result<Self, LinkError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|e| LinkError::Encoding(e.to_string()))?;
        Self::try_from(bytes.as_slice())
    }
}

impl TryFrom<&[u8]> for Link {
    type Error = LinkError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let raw: [u8; LINK_LEN] = bytes
            .try_into()
            .map_err(|_| LinkError::Length(bytes.len()))?;
        Ok(Self(raw))
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode_string())
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Link({})", self.encode_string())
    }
}

impl FromStr for Link {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_string(s)
    }
}

impl Serialize for Link {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for Link {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LinkVisitor;

        impl<'de> Visitor<'de> for LinkVisitor {
            type Value = Link;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{LINK_LEN} digest bytes")
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Link, E> {
                Link::try_from(v).map_err(E::custom)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Link, A::Error> {
                let mut raw = [0u8; LINK_LEN];
                for (i, slot) in raw.iter_mut().enumerate() {
                    *slot = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(i, &self))?;
                }
                Ok(Link(raw))
            }
        }

        deserializer.deserialize_bytes(LinkVisitor)
    }
}

/// An immutable block of bytes together with its content identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Digest of `bytes`
    pub cid: Link,
    /// Block payload
    pub bytes: Vec<u8>,
}

impl Block {
    /// Create a block, deriving its identifier from the bytes.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            cid: Link::digest(&bytes),
            bytes,
        }
    }

    /// Check that the identifier matches the payload.
    #[must_use]
    pub fn verify(&self) -> bool {
        Link::digest(&self.bytes) == self.cid
    }
}

/// Link parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Not valid base64url
    #[error("invalid link encoding: {0}")]
    Encoding(String),

    /// Digest had the wrong length
    #[error("invalid link length: expected 32 bytes, got {0}")]
    Length(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_form_round_trips() {
        let link = Link::digest(b"hello");
        let text = link.to_string();
        assert!(!text.contains('='));
        assert_eq!(text.parse::<Link>().unwrap(), link);
    }

    #[test]
    fn distinct_content_distinct_links() {
        assert_ne!(Link::digest(b"a"), Link::digest(b"b"));
        assert_eq!(Link::digest(b"a"), Link::digest(b"a"));
    }

    #[test]
    fn rejects_short_digest() {
        let err = "AAAA".parse::<Link>().unwrap_err();
        assert!(matches!(err, LinkError::Length(3)));
    }

    #[test]
    fn block_verifies_its_cid() {
        let mut block = Block::new(b"payload".to_vec());
        assert!(block.verify());
        block.bytes.push(0);
        assert!(!block.verify());
    }

    #[test]
    fn cbor_encoding_is_a_byte_string() {
        let link = Link::digest(b"x");
        let mut bytes = Vec::new();
        ciborium::into_writer(&link, &mut bytes).unwrap();
        // major type 2, one-byte length
        assert_eq!(bytes[0], 0x58);
        assert_eq!(bytes.len(), 2 + LINK_LEN);
        let back: Link = ciborium::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(back, link);
    }
}
