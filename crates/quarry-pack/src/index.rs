//! Pack index reading and lookup.
//!
//! The index maps object ids to byte offsets in the pack through a 256-entry
//! fan-out table (cumulative counts by first id byte) and a sorted id table.
//! Two layouts exist.
//!
//! Version 2 (signed with `\xff tOc`):
//!
//! ```text
//! Header:  \xff tOc (4 bytes) | version (4 bytes = 2)
//! Fanout:  256 x 4-byte big-endian cumulative counts
//! OIDs:    N x 20-byte sorted ids
//! CRC32:   N x 4-byte entry checksums
//! Offsets: N x 4-byte offsets (high bit set -> 64-bit table entry)
//! 64-bit:  M x 8-byte offsets, for packs over 2 GiB
//! Trailer: 20-byte pack checksum | 20-byte index checksum
//! ```
//!
//! Version 1 (no header at all, detected by the absent signature):
//!
//! ```text
//! Fanout:  256 x 4-byte big-endian cumulative counts
//! Entries: N x (4-byte big-endian offset | 20-byte id), sorted by id
//! Trailer: 20-byte pack checksum | 20-byte index checksum
//! ```
//!
//! Offsets into the 64-bit table are refused with
//! [`PackError::PackTooLarge`]: packs over 2 GiB are out of scope, and a
//! truncated offset must never be returned in their place.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use quarry_hash::ObjectId;

use crate::{PackError, IDX_SIGNATURE, IDX_VERSION};

/// Byte length of the fan-out table.
const FANOUT_LEN: usize = 256 * 4;

/// Byte length of a v1 entry (offset + id).
const V1_ENTRY_LEN: usize = 4 + ObjectId::LEN;

/// Byte length of the v2 header (signature + version).
const V2_HEADER_LEN: usize = 8;

/// A memory-mapped pack index providing id -> offset lookup.
#[derive(Debug)]
pub struct PackIndex {
    data: Mmap,
    version: u32,
    num_objects: u32,
    idx_path: PathBuf,
}

impl PackIndex {
    /// Open a pack index file, detecting its version.
    ///
    /// A recognized signature with a version other than 2 is
    /// [`PackError::UnsupportedVersion`]; no signature at all means
    /// version 1. Either way the file must be large enough for its
    /// declared object count.
    pub fn open(idx_path: impl AsRef<Path>) -> Result<Self, PackError> {
        let idx_path = idx_path.as_ref().to_path_buf();
        let file = std::fs::File::open(&idx_path)?;
        let data = unsafe { Mmap::map(&file)? };

        let version = if data.len() >= V2_HEADER_LEN && data[0..4] == IDX_SIGNATURE {
            let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
            if version != IDX_VERSION {
                return Err(PackError::UnsupportedVersion(version));
            }
            version
        } else {
            1
        };

        let fanout_start = if version == 1 { 0 } else { V2_HEADER_LEN };
        let fanout_end = fanout_start + FANOUT_LEN;
        if data.len() < fanout_end + 2 * ObjectId::LEN {
            return Err(PackError::InvalidIndex("file too small".into()));
        }

        // Total object count is the last fan-out entry.
        let last = fanout_end - 4;
        let num_objects =
            u32::from_be_bytes([data[last], data[last + 1], data[last + 2], data[last + 3]]);

        let n = num_objects as usize;
        let min_size = match version {
            1 => fanout_end + n * V1_ENTRY_LEN + 2 * ObjectId::LEN,
            _ => fanout_end + n * (ObjectId::LEN + 4 + 4) + 2 * ObjectId::LEN,
        };
        if data.len() < min_size {
            return Err(PackError::InvalidIndex(format!(
                "file too small for {n} objects: {} < {min_size}",
                data.len()
            )));
        }

        Ok(Self {
            data,
            version,
            num_objects,
            idx_path,
        })
    }

    /// Look up an id, returning its offset in the pack file.
    ///
    /// `Ok(None)` means the id is not in this index; callers move on to
    /// other packs. A v2 offset pointing into the 64-bit table is
    /// `Err(PackTooLarge)`, never a wrong offset.
    pub fn lookup(&self, oid: &ObjectId) -> Result<Option<u64>, PackError> {
        match self.search(oid) {
            Some(position) => self.offset_at_index(position).map(Some),
            None => Ok(None),
        }
    }

    /// Binary-search the fan-out bucket for an id's sorted position.
    fn search(&self, oid: &ObjectId) -> Option<u32> {
        let (mut low, mut high) = self.fanout_range(oid.first_byte());
        let target = oid.as_bytes();

        while low < high {
            let mid = low + (high - low) / 2;
            match self.oid_bytes_at(mid).cmp(target) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => return Some(mid as u32),
            }
        }
        None
    }

    /// Check whether an id is present without computing its offset.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.search(oid).is_some()
    }

    /// The id at the given sorted index position.
    ///
    /// `index` must be below [`num_objects`](Self::num_objects).
    pub fn oid_at_index(&self, index: u32) -> ObjectId {
        self.read_oid(self.oid_pos(index as usize))
    }

    /// The pack file offset at the given sorted index position.
    pub fn offset_at_index(&self, index: u32) -> Result<u64, PackError> {
        match self.version {
            1 => {
                let pos = self.entries_start() + index as usize * V1_ENTRY_LEN;
                Ok(u64::from(self.read_u32(pos)))
            }
            _ => {
                let pos = self.offset32_start() + index as usize * 4;
                let val = self.read_u32(pos);
                if val & 0x8000_0000 != 0 {
                    // High bit marks an entry in the 64-bit offset table.
                    return Err(PackError::PackTooLarge {
                        oid: self.oid_at_index(index),
                    });
                }
                Ok(u64::from(val))
            }
        }
    }

    /// The CRC32 of the entry at the given sorted index position.
    ///
    /// Version 1 indexes carry no CRC table.
    pub fn crc32_at_index(&self, index: u32) -> Option<u32> {
        if self.version == 1 {
            return None;
        }
        let pos = self.crc_start() + index as usize * 4;
        Some(self.read_u32(pos))
    }

    /// Total number of objects in this index.
    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    /// Index format version (1 or 2).
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Path to the `.idx` file.
    pub fn path(&self) -> &Path {
        &self.idx_path
    }

    /// Pack checksum stored in the index trailer.
    pub fn pack_checksum(&self) -> ObjectId {
        self.read_oid(self.data.len() - 2 * ObjectId::LEN)
    }

    /// Checksum of the index file itself (the trailing hash).
    pub fn index_checksum(&self) -> ObjectId {
        self.read_oid(self.data.len() - ObjectId::LEN)
    }

    /// Iterate over all (id, offset) pairs in sorted id order.
    pub fn iter(&self) -> PackIndexIter<'_> {
        PackIndexIter {
            index: self,
            pos: 0,
        }
    }

    /// Fan-out bucket bounds for a first byte, as sorted index positions.
    ///
    /// Bounds are clamped to the object count so a corrupt fan-out table
    /// cannot push the search past the id table.
    fn fanout_range(&self, first_byte: u8) -> (usize, usize) {
        let n = self.num_objects as usize;
        let end = (self.fanout_entry(first_byte) as usize).min(n);
        let start = if first_byte == 0 {
            0
        } else {
            (self.fanout_entry(first_byte - 1) as usize).min(end)
        };
        (start, end)
    }

    fn fanout_entry(&self, index: u8) -> u32 {
        let fanout_start = if self.version == 1 { 0 } else { V2_HEADER_LEN };
        self.read_u32(fanout_start + index as usize * 4)
    }

    /// Start of the entry region (v1) or id table (v2).
    fn entries_start(&self) -> usize {
        let fanout_start = if self.version == 1 { 0 } else { V2_HEADER_LEN };
        fanout_start + FANOUT_LEN
    }

    fn crc_start(&self) -> usize {
        self.entries_start() + self.num_objects as usize * ObjectId::LEN
    }

    fn offset32_start(&self) -> usize {
        self.crc_start() + self.num_objects as usize * 4
    }

    /// Byte position of the id at a sorted index position.
    fn oid_pos(&self, index: usize) -> usize {
        match self.version {
            1 => self.entries_start() + index * V1_ENTRY_LEN + 4,
            _ => self.entries_start() + index * ObjectId::LEN,
        }
    }

    fn oid_bytes_at(&self, index: usize) -> &[u8] {
        let start = self.oid_pos(index);
        &self.data[start..start + ObjectId::LEN]
    }

    fn read_oid(&self, start: usize) -> ObjectId {
        let mut bytes = [0u8; ObjectId::LEN];
        bytes.copy_from_slice(&self.data[start..start + ObjectId::LEN]);
        ObjectId::from(bytes)
    }

    fn read_u32(&self, pos: usize) -> u32 {
        u32::from_be_bytes([
            self.data[pos],
            self.data[pos + 1],
            self.data[pos + 2],
            self.data[pos + 3],
        ])
    }
}

/// Iterator over (id, offset) pairs in a pack index.
///
/// Yields an error for entries whose offset lives in the v2 64-bit table.
pub struct PackIndexIter<'a> {
    index: &'a PackIndex,
    pos: u32,
}

impl Iterator for PackIndexIter<'_> {
    type Item = Result<(ObjectId, u64), PackError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.index.num_objects {
            return None;
        }
        let oid = self.index.oid_at_index(self.pos);
        let item = self
            .index
            .offset_at_index(self.pos)
            .map(|offset| (oid, offset));
        self.pos += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.index.num_objects - self.pos) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PackIndexIter<'_> {}
