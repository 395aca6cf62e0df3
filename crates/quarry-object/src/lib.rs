//! Object model for the quarry object store.
//!
//! quarry is a read-only store, so objects are not parsed into structural
//! types; a decoded object is its [`ObjectType`] plus raw content bytes
//! ([`RawObject`]). This crate also provides the `"<type> <size>\0"` header
//! codec used by loose storage and an LRU cache for decoded objects.

pub mod cache;
pub mod header;

use bstr::BString;
use quarry_hash::{HashError, ObjectId};

/// Errors produced by object decoding.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error("invalid object type: {0}")]
    InvalidType(BString),

    #[error("invalid object header: {0}")]
    InvalidHeader(String),

    #[error("object size mismatch: header says {declared}, content is {actual}")]
    SizeMismatch { declared: usize, actual: usize },

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// The four types of git objects.
///
/// Pack files additionally carry two delta wire types; those never escape
/// the pack decoding layer, so they are not represented here. A fully
/// resolved object always has one of these four types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl ObjectType {
    /// Parse from the type word in object headers.
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        match s {
            b"commit" => Ok(Self::Commit),
            b"tree" => Ok(Self::Tree),
            b"blob" => Ok(Self::Blob),
            b"tag" => Ok(Self::Tag),
            _ => Err(ObjectError::InvalidType(BString::from(s))),
        }
    }

    /// The canonical byte representation.
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::Commit => b"commit",
            Self::Tree => b"tree",
            Self::Blob => b"blob",
            Self::Tag => b"tag",
        }
    }

    /// The canonical type word as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::Tree => "tree",
            Self::Blob => "blob",
            Self::Tag => "tag",
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectType {
    type Err = ObjectError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes())
    }
}

/// A fully decoded object: its type and decompressed content.
///
/// Constructed fresh per lookup and immutable afterwards. Every decode path
/// checks declared sizes against actual content length before building one,
/// so `size() == data.len()` holds by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    pub obj_type: ObjectType,
    pub data: Vec<u8>,
}

impl RawObject {
    /// Wrap a type and content bytes.
    pub fn new(obj_type: ObjectType, data: Vec<u8>) -> Self {
        Self { obj_type, data }
    }

    /// Parse from loose bytes (header + content).
    ///
    /// The declared size must equal the content length exactly; a short or
    /// long payload is treated as corruption, never truncated or padded.
    pub fn parse(data: &[u8]) -> Result<Self, ObjectError> {
        let (obj_type, declared, header_len) = header::parse_header(data)?;
        let content = &data[header_len..];
        if content.len() != declared {
            return Err(ObjectError::SizeMismatch {
                declared,
                actual: content.len(),
            });
        }
        Ok(Self {
            obj_type,
            data: content.to_vec(),
        })
    }

    /// Content length in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Serialize to canonical loose form (header + content).
    pub fn serialize(&self) -> Vec<u8> {
        let hdr = header::write_header(self.obj_type, self.data.len());
        let mut out = Vec::with_capacity(hdr.len() + self.data.len());
        out.extend_from_slice(&hdr);
        out.extend_from_slice(&self.data);
        out
    }

    /// Compute the object id by hashing the serialized form.
    pub fn id(&self) -> Result<ObjectId, ObjectError> {
        Ok(quarry_hash::hasher::Hasher::hash_object(
            self.obj_type.as_str(),
            &self.data,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_type_from_bytes() {
        assert_eq!(
            ObjectType::from_bytes(b"commit").unwrap(),
            ObjectType::Commit
        );
        assert_eq!(ObjectType::from_bytes(b"tree").unwrap(), ObjectType::Tree);
        assert_eq!(ObjectType::from_bytes(b"blob").unwrap(), ObjectType::Blob);
        assert_eq!(ObjectType::from_bytes(b"tag").unwrap(), ObjectType::Tag);
        assert!(ObjectType::from_bytes(b"unknown").is_err());
    }

    #[test]
    fn object_type_display() {
        assert_eq!(ObjectType::Blob.to_string(), "blob");
        assert_eq!(ObjectType::Commit.to_string(), "commit");
    }

    #[test]
    fn object_type_from_str() {
        assert_eq!("tree".parse::<ObjectType>().unwrap(), ObjectType::Tree);
        assert!("invalid".parse::<ObjectType>().is_err());
    }

    #[test]
    fn invalid_type_error_carries_word() {
        let err = ObjectType::from_bytes(b"blobby").unwrap_err();
        assert_eq!(err.to_string(), "invalid object type: blobby");
    }

    #[test]
    fn parse_roundtrip() {
        let obj = RawObject::new(ObjectType::Blob, b"hello\n".to_vec());
        let serialized = obj.serialize();
        assert_eq!(serialized, b"blob 6\0hello\n");
        let parsed = RawObject::parse(&serialized).unwrap();
        assert_eq!(parsed, obj);
    }

    #[test]
    fn parse_rejects_short_content() {
        let err = RawObject::parse(b"blob 10\0hello").unwrap_err();
        assert!(matches!(
            err,
            ObjectError::SizeMismatch {
                declared: 10,
                actual: 5
            }
        ));
    }

    #[test]
    fn parse_rejects_long_content() {
        let err = RawObject::parse(b"blob 2\0hello").unwrap_err();
        assert!(matches!(
            err,
            ObjectError::SizeMismatch {
                declared: 2,
                actual: 5
            }
        ));
    }

    #[test]
    fn size_matches_content() {
        let obj = RawObject::new(ObjectType::Tag, vec![0u8; 42]);
        assert_eq!(obj.size(), 42);
    }

    #[test]
    fn id_matches_git_hash_object() {
        // `echo hello | git hash-object --stdin`
        let obj = RawObject::new(ObjectType::Blob, b"hello\n".to_vec());
        assert_eq!(
            obj.id().unwrap().to_hex(),
            "ce013625030ba8dba906f756967f9e9ca394464a"
        );
    }
}
