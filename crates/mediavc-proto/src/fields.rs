//! Fixed-tag field maps.
//!
//! Every persisted record is a CBOR map from small integer tags to scalar or
//! binary values. Tags are a stable contract: a new field takes a new tag and
//! an absent optional field is simply missing from the map.

use ciborium::Value;
use std::collections::BTreeMap;

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// UTF-8 text
    Text(String),
    /// Signed integer
    Integer(i64),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl FieldValue {
    fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Integer(_) => "integer",
            FieldValue::Bytes(_) => "bytes",
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Text(s) => Value::Text(s),
            FieldValue::Integer(i) => Value::Integer(i.into()),
            FieldValue::Bytes(b) => Value::Bytes(b),
        }
    }
}

impl TryFrom<Value> for FieldValue {
    type Error = CodecError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Text(s) => Ok(FieldValue::Text(s)),
            Value::Integer(i) => i64::try_from(i)
                .map(FieldValue::Integer)
                .map_err(|e| CodecError::Deserialize(e.to_string())),
            Value::Bytes(b) => Ok(FieldValue::Bytes(b)),
            other => Err(CodecError::Deserialize(format!(
                "unsupported field value: {other:?}"
            ))),
        }
    }
}

/// Tag-keyed field map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    fields: BTreeMap<u32, FieldValue>,
}

impl FieldMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field.
    pub fn insert(&mut self, tag: u32, value: FieldValue) {
        self.fields.insert(tag, value);
    }

    /// Set a text field.
    pub fn insert_text(&mut self, tag: u32, value: impl Into<String>) {
        self.insert(tag, FieldValue::Text(value.into()));
    }

    /// Set an integer field.
    pub fn insert_integer(&mut self, tag: u32, value: i64) {
        self.insert(tag, FieldValue::Integer(value));
    }

    /// Set a bytes field.
    pub fn insert_bytes(&mut self, tag: u32, value: Vec<u8>) {
        self.insert(tag, FieldValue::Bytes(value));
    }

    /// Raw field lookup.
    #[must_use]
    pub fn get(&self, tag: u32) -> Option<&FieldValue> {
        self.fields.get(&tag)
    }

    /// Whether a tag is present.
    #[must_use]
    pub fn contains(&self, tag: u32) -> bool {
        self.fields.contains_key(&tag)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the map has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Optional text field.
    ///
    /// # Errors
    ///
    /// Returns error if the field is present with another type.
    pub fn text(&self, tag: u32) -> Result<Option<&str>, CodecError> {
        match self.get(tag) {
            None => Ok(None),
            Some(FieldValue::Text(s)) => Ok(Some(s)),
            Some(other) => Err(wrong_type(tag, "text", other)),
        }
    }

    /// Optional integer field.
    ///
    /// # Errors
    ///
    /// Returns error if the field is present with another type.
    pub fn integer(&self, tag: u32) -> Result<Option<i64>, CodecError> {
        match self.get(tag) {
            None => Ok(None),
            Some(FieldValue::Integer(i)) => Ok(Some(*i)),
            Some(other) => Err(wrong_type(tag, "integer", other)),
        }
    }

    /// Optional bytes field.
    ///
    /// # Errors
    ///
    /// Returns error if the field is present with another type.
    pub fn bytes(&self, tag: u32) -> Result<Option<&[u8]>, CodecError> {
        match self.get(tag) {
            None => Ok(None),
            Some(FieldValue::Bytes(b)) => Ok(Some(b)),
            Some(other) => Err(wrong_type(tag, "bytes", other)),
        }
    }

    /// Required text field.
    ///
    /// # Errors
    ///
    /// Returns error if the field is missing or has another type.
    pub fn required_text(&self, tag: u32, name: &'static str) -> Result<&str, CodecError> {
        self.text(tag)?.ok_or(CodecError::MissingField { tag, name })
    }

    /// Required integer field.
    ///
    /// # Errors
    ///
    /// Returns error if the field is missing or has another type.
    pub fn required_integer(&self, tag: u32, name: &'static str) -> Result<i64, CodecError> {
        self.integer(tag)?.ok_or(CodecError::MissingField { tag, name })
    }

    /// Required bytes field.
    ///
    /// # Errors
    ///
    /// Returns error if the field is missing or has another type.
    pub fn required_bytes(&self, tag: u32, name: &'static str) -> Result<&[u8], CodecError> {
        self.bytes(tag)?.ok_or(CodecError::MissingField { tag, name })
    }

    /// Serialize to CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_cbor(&self) -> Result<Vec<u8>, CodecError> {
        let entries = self
            .fields
            .iter()
            .map(|(tag, value)| (Value::Integer((*tag).into()), Value::from(value.clone())))
            .collect();
        let mut bytes = Vec::new();
        ciborium::into_writer(&Value::Map(entries), &mut bytes)
            .map_err(|e| CodecError::Serialize(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize from CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a tag-keyed map of supported values.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, CodecError> {
        let value: Value =
            ciborium::from_reader(bytes).map_err(|e| CodecError::Deserialize(e.to_string()))?;
        let Value::Map(entries) = value else {
            return Err(CodecError::Deserialize("record is not a map".to_string()));
        };
        let mut fields = BTreeMap::new();
        for (key, value) in entries {
            let tag = match key {
                Value::Integer(i) => {
                    u32::try_from(i).map_err(|e| CodecError::Deserialize(e.to_string()))?
                }
                other => {
                    return Err(CodecError::Deserialize(format!(
                        "record key is not a tag: {other:?}"
                    )))
                }
            };
            fields.insert(tag, FieldValue::try_from(value)?);
        }
        Ok(Self { fields })
    }
}

fn wrong_type(tag: u32, expected: &'static str, found: &FieldValue) -> CodecError {
    CodecError::FieldType {
        tag,
        expected,
        found: found.type_name(),
    }
}

/// A record persisted through a field map.
pub trait Record: Sized {
    /// Convert to a field map.
    fn to_fields(&self) -> FieldMap;

    /// Rebuild from a field map.
    ///
    /// # Errors
    ///
    /// Returns error if a required field is missing or mistyped.
    fn from_fields(fields: &FieldMap) -> Result<Self, CodecError>;

    /// Encode to bytes.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        self.to_fields().to_cbor()
    }

    /// Decode from bytes.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a valid record.
    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Self::from_fields(&FieldMap::from_cbor(bytes)?)
    }
}

/// Record codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed
    #[error("serialization failed: {0}")]
    Serialize(String),

    /// Deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialize(String),

    /// Required field absent
    #[error("missing field {name} (tag {tag})")]
    MissingField {
        /// Wire tag
        tag: u32,
        /// Field name
        name: &'static str,
    },

    /// Field present with the wrong type
    #[error("field tag {tag}: expected {expected}, found {found}")]
    FieldType {
        /// Wire tag
        tag: u32,
        /// Expected type
        expected: &'static str,
        /// Actual type
        found: &'static str,
    },
}
