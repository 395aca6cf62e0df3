use std::fs;
use std::io::Read;

use flate2::read::ZlibDecoder;
use quarry_hash::hasher::Hasher;
use quarry_hash::ObjectId;
use quarry_object::{header, ObjectType, RawObject};

use crate::{LooseError, LooseObjectStore};

impl LooseObjectStore {
    /// Check if a loose object exists.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.object_path(oid).is_file()
    }

    /// Read a loose object by id.
    ///
    /// Returns `Ok(None)` if the object does not exist, `Err` if it exists
    /// but is corrupt. The declared header size must match the content
    /// length exactly.
    pub fn read(&self, oid: &ObjectId) -> Result<Option<RawObject>, LooseError> {
        let path = self.object_path(oid);
        let compressed = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LooseError::Io(e)),
        };

        let decompressed = inflate_all(&compressed, oid)?;
        let obj = RawObject::parse(&decompressed)?;
        Ok(Some(obj))
    }

    /// Read just the header (type + size) without decompressing the body.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    pub fn read_header(
        &self,
        oid: &ObjectId,
    ) -> Result<Option<(ObjectType, usize)>, LooseError> {
        let path = self.object_path(oid);
        let compressed = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LooseError::Io(e)),
        };

        // Inflate only enough to see the header. Headers are well under
        // 32 bytes, so a 64-byte window is plenty.
        let mut decoder = ZlibDecoder::new(&compressed[..]);
        let mut buf = [0u8; 64];
        let mut filled = 0;

        loop {
            if filled >= buf.len() {
                return Err(LooseError::Corrupt {
                    oid: oid.to_hex(),
                    reason: "header exceeds 64 bytes".into(),
                });
            }
            let n = decoder
                .read(&mut buf[filled..])
                .map_err(|e| LooseError::Decompress {
                    oid: oid.to_hex(),
                    source: e,
                })?;
            if n == 0 {
                return Err(LooseError::Corrupt {
                    oid: oid.to_hex(),
                    reason: "unexpected EOF before header null terminator".into(),
                });
            }
            filled += n;
            if buf[..filled].contains(&0) {
                break;
            }
        }

        let (obj_type, declared_size, _header_len) = header::parse_header(&buf[..filled])?;
        Ok(Some((obj_type, declared_size)))
    }

    /// Read a loose object and verify its content hashes back to `oid`.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    pub fn read_verified(&self, oid: &ObjectId) -> Result<Option<RawObject>, LooseError> {
        let path = self.object_path(oid);
        let compressed = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LooseError::Io(e)),
        };

        let decompressed = inflate_all(&compressed, oid)?;

        // The id is the hash of the raw decompressed bytes (header + content).
        let actual_oid = Hasher::digest(&decompressed)?;
        if actual_oid != *oid {
            return Err(LooseError::HashMismatch {
                path,
                expected: oid.to_hex(),
                actual: actual_oid.to_hex(),
            });
        }

        let obj = RawObject::parse(&decompressed)?;
        Ok(Some(obj))
    }
}

/// Zlib-decompress the full contents of a loose object file.
fn inflate_all(compressed: &[u8], oid: &ObjectId) -> Result<Vec<u8>, LooseError> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| LooseError::Decompress {
            oid: oid.to_hex(),
            source: e,
        })?;
    Ok(decompressed)
}
