//! Media records.

use crate::fields::{CodecError, FieldMap, Record};

/// Wire tags of a media record.
#[derive(Debug, Clone, Copy)]
pub struct MediaNodeKeys;

impl MediaNodeKeys {
    /// Record identifier
    pub const ID: u32 = 10;
    /// Free-form comment
    pub const COMMENT: u32 = 20;
    /// Creation time (Unix milliseconds)
    pub const CREATED_AT: u32 = 30;
    /// Optional ordering hint
    pub const PRIORITY: u32 = 40;
    /// MIME type
    pub const MEDIA_TYPE: u32 = 50;
    /// Payload bytes
    pub const MEDIA_DATA: u32 = 60;
    /// File name
    pub const MEDIA_NAME: u32 = 70;
}

/// A media payload with its name and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    /// File name
    pub name: String,
    /// MIME type
    pub mime_type: String,
    /// Payload
    pub data: Vec<u8>,
}

impl Media {
    /// Create a media payload.
    #[must_use]
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }
}

/// One entry of a media collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaNode {
    /// Record identifier
    pub id: String,
    /// Creation time (Unix milliseconds)
    pub created_at: i64,
    /// Optional ordering hint
    pub priority: Option<i64>,
    /// Free-form comment
    pub comment: String,
    /// Payload
    pub media: Media,
}

impl MediaNode {
    /// Create a record without a priority.
    #[must_use]
    pub fn new(id: impl Into<String>, created_at: i64, comment: impl Into<String>, media: Media) -> Self {
        Self {
            id: id.into(),
            created_at,
            priority: None,
            comment: comment.into(),
            media,
        }
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }
}

impl Record for MediaNode {
    fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert_text(MediaNodeKeys::ID, self.id.clone());
        fields.insert_text(MediaNodeKeys::COMMENT, self.comment.clone());
        fields.insert_integer(MediaNodeKeys::CREATED_AT, self.created_at);
        if let Some(priority) = self.priority {
            fields.insert_integer(MediaNodeKeys::PRIORITY, priority);
        }
        fields.insert_text(MediaNodeKeys::MEDIA_TYPE, self.media.mime_type.clone());
        fields.insert_bytes(MediaNodeKeys::MEDIA_DATA, self.media.data.clone());
        fields.insert_text(MediaNodeKeys::MEDIA_NAME, self.media.name.clone());
        fields
    }

    fn from_fields(fields: &FieldMap) -> Result<Self, CodecError> {
        Ok(Self {
            id: fields.required_text(MediaNodeKeys::ID, "id")?.to_string(),
            created_at: fields.required_integer(MediaNodeKeys::CREATED_AT, "created_at")?,
            priority: fields.integer(MediaNodeKeys::PRIORITY)?,
            comment: fields
                .text(MediaNodeKeys::COMMENT)?
                .unwrap_or_default()
                .to_string(),
            media: Media {
                name: fields
                    .required_text(MediaNodeKeys::MEDIA_NAME, "media_name")?
                    .to_string(),
                mime_type: fields
                    .required_text(MediaNodeKeys::MEDIA_TYPE, "media_type")?
                    .to_string(),
                data: fields
                    .required_bytes(MediaNodeKeys::MEDIA_DATA, "media_data")?
                    .to_vec(),
            },
        })
    }
}
