//! Streaming SHA-1 with collision detection.

use crate::{HashError, ObjectId};

/// Incremental object-id computation.
///
/// Wraps collision-detecting SHA-1; data is fed with [`update`](Hasher::update)
/// and finalised into an [`ObjectId`]. Finalisation fails if the collision
/// detector fires; a forged object must never be given a valid id.
pub struct Hasher {
    inner: Box<sha1_checked::Sha1>,
}

impl Hasher {
    /// Create a new hasher.
    pub fn new() -> Self {
        use digest::Digest;
        Self {
            inner: Box::new(sha1_checked::Sha1::new()),
        }
    }

    /// Feed data into the hasher.
    pub fn update(&mut self, data: &[u8]) {
        use digest::Digest;
        self.inner.update(data);
    }

    /// Finalize and return the object id.
    pub fn finalize(self) -> Result<ObjectId, HashError> {
        let result = self.inner.try_finalize();
        if result.has_collision() {
            return Err(HashError::Sha1Collision);
        }
        ObjectId::from_bytes(result.hash().as_slice())
    }

    /// Hash a buffer in one call.
    pub fn digest(data: &[u8]) -> Result<ObjectId, HashError> {
        let mut h = Self::new();
        h.update(data);
        h.finalize()
    }

    /// Hash a git object: `"{type} {len}\0{content}"`.
    pub fn hash_object(obj_type: &str, content: &[u8]) -> Result<ObjectId, HashError> {
        let header = format!("{} {}\0", obj_type, content.len());
        let mut h = Self::new();
        h.update(header.as_bytes());
        h.update(content);
        h.finalize()
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}
