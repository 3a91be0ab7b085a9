//! Registry pointer records.
//!
//! A pointer names a nested collection and records where its lineage lives
//! (`version_store_root`) and which head it was at (`current_root`). Roots are
//! kept as canonical link strings.

use crate::fields::{CodecError, FieldMap, Record};

/// Wire tags of a pointer record.
#[derive(Debug, Clone, Copy)]
pub struct PointerKeys;

impl PointerKeys {
    /// Collection name
    pub const NAME: u32 = 7;
    /// Root of the nested collection's version index
    pub const VERSION_STORE_ROOT: u32 = 8;
    /// Head of the nested collection
    pub const CURRENT_ROOT: u32 = 9;
}

/// Named reference to a nested collection at a given head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPointer {
    /// Collection name
    pub name: String,
    /// Root of the nested collection's version index
    pub version_store_root: String,
    /// Head of the nested collection
    pub current_root: String,
}

impl Record for CollectionPointer {
    fn to_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert_text(PointerKeys::NAME, self.name.clone());
        fields.insert_text(PointerKeys::VERSION_STORE_ROOT, self.version_store_root.clone());
        fields.insert_text(PointerKeys::CURRENT_ROOT, self.current_root.clone());
        fields
    }

    fn from_fields(fields: &FieldMap) -> Result<Self, CodecError> {
        Ok(Self {
            name: fields.required_text(PointerKeys::NAME, "name")?.to_string(),
            version_store_root: fields
                .required_text(PointerKeys::VERSION_STORE_ROOT, "version_store_root")?
                .to_string(),
            current_root: fields
                .required_text(PointerKeys::CURRENT_ROOT, "current_root")?
                .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_uses_low_tags() {
        let pointer = CollectionPointer {
            name: "/photos".to_string(),
            version_store_root: "store".to_string(),
            current_root: "head".to_string(),
        };
        let fields = pointer.to_fields();
        assert_eq!(fields.text(7).unwrap(), Some("/photos"));
        assert_eq!(fields.text(8).unwrap(), Some("store"));
        assert_eq!(fields.text(9).unwrap(), Some("head"));
        assert_eq!(CollectionPointer::decode(&pointer.encode().unwrap()).unwrap(), pointer);
    }
}
