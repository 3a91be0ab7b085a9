//! Relay protocol messages.

use serde::{Deserialize, Serialize};

/// Acknowledgement returned by a relay after a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    /// Id of the pushed version store
    pub store_id: String,
    /// Index root the relay now serves
    pub store_root: String,
    /// Head the relay now serves
    pub current_root: String,
}

impl PushResponse {
    /// Create a response.
    #[must_use]
    pub fn new(
        store_id: impl Into<String>,
        store_root: impl Into<String>,
        current_root: impl Into<String>,
    ) -> Self {
        Self {
            store_id: store_id.into(),
            store_root: store_root.into(),
            current_root: current_root.into(),
        }
    }

    /// Deserialize a relay acknowledgement from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_json(bytes: &[u8]) -> Result<Self, MessageError> {
        serde_json::from_slice(bytes).map_err(|e| MessageError::Deserialize(e.to_string()))
    }
}

/// Message errors.
#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    /// Deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_response_reads_camel_case() {
        let json = br#"{"storeId":"id","storeRoot":"store","currentRoot":"head"}"#;
        assert_eq!(
            PushResponse::from_json(json).unwrap(),
            PushResponse::new("id", "store", "head")
        );
    }

    #[test]
    fn push_response_missing_field_fails() {
        let err = PushResponse::from_json(br#"{"storeId":"id"}"#).unwrap_err();
        assert!(matches!(err, MessageError::Deserialize(_)));
    }
}
