//! Loose object reading.
//!
//! Each loose object lives at `objects/XX/YYYY...` where `XX` is the first
//! byte of the id in hex and `YYYY...` is the remaining 38 characters. The
//! file content is zlib-compressed `"<type> <size>\0<content>"`. Loose
//! storage is the simple half of the object store; the packed half lives in
//! `quarry-pack`.

mod read;

use std::path::{Path, PathBuf};

use quarry_hash::ObjectId;

/// Read-only interface to a loose object directory.
pub struct LooseObjectStore {
    /// Path to the objects directory.
    objects_dir: PathBuf,
}

impl LooseObjectStore {
    /// Open the loose object store at the given objects directory.
    pub fn open(objects_dir: impl AsRef<Path>) -> Self {
        Self {
            objects_dir: objects_dir.as_ref().to_path_buf(),
        }
    }

    /// The file path for a given id.
    pub fn object_path(&self, oid: &ObjectId) -> PathBuf {
        self.objects_dir.join(oid.loose_path())
    }

    /// The objects directory this store reads from.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }
}

/// Errors from loose object reads.
#[derive(Debug, thiserror::Error)]
pub enum LooseError {
    #[error("corrupt loose object {oid}: {reason}")]
    Corrupt { oid: String, reason: String },

    #[error("decompression error for {oid}: {source}")]
    Decompress {
        oid: String,
        #[source]
        source: std::io::Error,
    },

    #[error("hash mismatch for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("object decode error: {0}")]
    Object(#[from] quarry_object::ObjectError),

    #[error("hash error: {0}")]
    Hash(#[from] quarry_hash::HashError),
}
