//! Packfile reading: indexes, entry headers, and delta resolution.
//!
//! A pack stores many objects in a single `.pack` file, most of them
//! delta-encoded against some other object. The sibling `.idx` file maps
//! object ids to byte offsets. This crate reads both, reconstructing full
//! objects by walking delta chains iteratively.

pub mod delta;
pub mod entry;
pub mod index;
pub mod pack;
pub mod varint;

use quarry_hash::ObjectId;
use quarry_object::ObjectType;

/// Errors that can occur while reading packs.
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("invalid pack header: {0}")]
    InvalidHeader(String),

    #[error("invalid pack index: {0}")]
    InvalidIndex(String),

    #[error("unsupported pack format version: {0}")]
    UnsupportedVersion(u32),

    #[error("pack exceeds 2 GiB: {oid} uses a 64-bit offset")]
    PackTooLarge { oid: ObjectId },

    #[error("malformed varint at offset {offset}")]
    MalformedVarint { offset: u64 },

    #[error("invalid object type {type_num} at offset {offset}")]
    InvalidObjectType { offset: u64, type_num: u8 },

    #[error("corrupt pack entry at offset {0}")]
    CorruptEntry(u64),

    #[error("size mismatch at offset {offset}: header says {declared}, inflated {actual}")]
    SizeMismatch {
        offset: u64,
        declared: u64,
        actual: usize,
    },

    #[error("truncated delta at byte {offset}: {reason}")]
    TruncatedDelta { offset: usize, reason: &'static str },

    #[error("delta base size mismatch: delta says {declared}, base is {actual}")]
    BaseSizeMismatch { declared: u64, actual: usize },

    #[error("delta result size mismatch: delta says {declared}, produced {actual}")]
    ResultSizeMismatch { declared: u64, actual: usize },

    #[error("reserved delta opcode 0 at byte {offset}")]
    InvalidDeltaOpcode { offset: usize },

    #[error("delta base not found: {0}")]
    MissingBase(ObjectId),

    #[error("delta chain too deep (>{max_depth} levels) at offset {offset}")]
    DeltaChainTooDeep { offset: u64, max_depth: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Hash(#[from] quarry_hash::HashError),
}

/// Type of a packed object entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackEntryType {
    Commit,
    Tree,
    Blob,
    Tag,
    /// Delta whose base lies earlier in the same pack.
    OfsDelta { base_offset: u64 },
    /// Delta referencing its base by id.
    RefDelta { base_oid: ObjectId },
}

impl PackEntryType {
    /// Convert a non-delta entry type to an ObjectType.
    pub fn to_object_type(self) -> Option<ObjectType> {
        match self {
            Self::Commit => Some(ObjectType::Commit),
            Self::Tree => Some(ObjectType::Tree),
            Self::Blob => Some(ObjectType::Blob),
            Self::Tag => Some(ObjectType::Tag),
            Self::OfsDelta { .. } | Self::RefDelta { .. } => None,
        }
    }

    /// Type number as used in pack entry headers.
    pub fn type_number(&self) -> u8 {
        match self {
            Self::Commit => 1,
            Self::Tree => 2,
            Self::Blob => 3,
            Self::Tag => 4,
            Self::OfsDelta { .. } => 6,
            Self::RefDelta { .. } => 7,
        }
    }
}

/// Pack format constants.
pub const PACK_SIGNATURE: &[u8; 4] = b"PACK";
pub const PACK_VERSION: u32 = 2;
pub const PACK_HEADER_SIZE: usize = 12;

/// Pack index v2 constants. A v1 index has no signature at all.
pub const IDX_SIGNATURE: [u8; 4] = [0xff, 0x74, 0x4f, 0x63]; // "\377tOc"
pub const IDX_VERSION: u32 = 2;

/// Maximum delta chain depth before we bail out.
pub const MAX_DELTA_CHAIN_DEPTH: usize = 512;
