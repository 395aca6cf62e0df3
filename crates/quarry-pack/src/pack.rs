//! Reading `.pack` files.
//!
//! A pack holds a 12-byte header (`PACK`, version 2, object count), a
//! sequence of entries (type+size header then a zlib stream), and a
//! trailing checksum. Delta entries are resolved against their base by
//! walking the chain iteratively; a REF-delta base missing from the pack
//! is fetched through a caller-supplied resolver so the object store can
//! consult loose objects and other packs.

use std::io::Read;
use std::path::{Path, PathBuf};

use flate2::bufread::ZlibDecoder;
use memmap2::Mmap;
use quarry_hash::ObjectId;
use quarry_object::RawObject;

use crate::delta::apply::apply_delta;
use crate::entry::parse_entry_header;
use crate::index::PackIndex;
use crate::{
    PackEntryType, PackError, MAX_DELTA_CHAIN_DEPTH, PACK_HEADER_SIZE, PACK_SIGNATURE,
    PACK_VERSION,
};

/// A memory-mapped packfile with its index.
#[derive(Debug)]
pub struct PackFile {
    data: Mmap,
    index: PackIndex,
    pack_path: PathBuf,
    num_objects: u32,
}

impl PackFile {
    /// Open a pack file together with its sibling `.idx`.
    ///
    /// Validates the pack header and requires the object counts of pack
    /// and index to agree.
    pub fn open(pack_path: impl AsRef<Path>) -> Result<Self, PackError> {
        let pack_path = pack_path.as_ref().to_path_buf();
        let idx_path = pack_path.with_extension("idx");

        let file = std::fs::File::open(&pack_path)?;
        let data = unsafe { Mmap::map(&file)? };

        if data.len() < PACK_HEADER_SIZE + ObjectId::LEN {
            return Err(PackError::InvalidHeader("file too small".into()));
        }
        if &data[0..4] != PACK_SIGNATURE {
            return Err(PackError::InvalidHeader("bad PACK signature".into()));
        }
        let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if version != PACK_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }
        let num_objects = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);

        let index = PackIndex::open(&idx_path)?;
        if index.num_objects() != num_objects {
            return Err(PackError::InvalidHeader(format!(
                "pack has {} objects but index has {}",
                num_objects,
                index.num_objects()
            )));
        }

        Ok(Self {
            data,
            index,
            pack_path,
            num_objects,
        })
    }

    /// Read an object by id.
    ///
    /// Returns `Ok(None)` if the id is not in this pack. A REF-delta
    /// whose base lives outside the pack is
    /// [`PackError::MissingBase`]; use
    /// [`read_object_with_resolver`](Self::read_object_with_resolver)
    /// when external bases can occur.
    pub fn read_object(&self, oid: &ObjectId) -> Result<Option<RawObject>, PackError> {
        self.read_object_with_resolver(oid, |_| None)
    }

    /// Read an object by id, resolving external REF-delta bases through
    /// `resolver`.
    ///
    /// The resolver is consulted only for base ids this pack's index
    /// does not know; returning `None` makes the read fail with
    /// [`PackError::MissingBase`].
    pub fn read_object_with_resolver(
        &self,
        oid: &ObjectId,
        resolver: impl Fn(&ObjectId) -> Option<RawObject>,
    ) -> Result<Option<RawObject>, PackError> {
        match self.index.lookup(oid)? {
            Some(offset) => self.read_at_offset_with_resolver(offset, resolver).map(Some),
            None => Ok(None),
        }
    }

    /// Read the object starting at a known pack offset.
    pub fn read_at_offset(&self, offset: u64) -> Result<RawObject, PackError> {
        self.read_at_offset_with_resolver(offset, |_| None)
    }

    /// Walk the delta chain at `offset` and rebuild the object.
    ///
    /// Deltas accumulate into an explicit chain while hops move toward
    /// the base, so depth is bounded by [`MAX_DELTA_CHAIN_DEPTH`] rather
    /// than the stack. Chains broken by corrupt offsets error instead of
    /// panicking.
    fn read_at_offset_with_resolver(
        &self,
        offset: u64,
        resolver: impl Fn(&ObjectId) -> Option<RawObject>,
    ) -> Result<RawObject, PackError> {
        // Deltas pushed while walking toward the base; applied in reverse.
        let mut chain: Vec<Vec<u8>> = Vec::new();
        let mut current_offset = offset;

        loop {
            if chain.len() >= MAX_DELTA_CHAIN_DEPTH {
                return Err(PackError::DeltaChainTooDeep {
                    offset,
                    max_depth: MAX_DELTA_CHAIN_DEPTH,
                });
            }

            let end = self.entries_end();
            let entry_start = usize::try_from(current_offset)
                .ok()
                .filter(|&start| start >= PACK_HEADER_SIZE && start < end)
                .ok_or(PackError::CorruptEntry(current_offset))?;

            let entry = parse_entry_header(&self.data[entry_start..end], current_offset)?;

            let data_start = entry_start + entry.header_size;
            if data_start > end {
                return Err(PackError::CorruptEntry(current_offset));
            }
            let payload = inflate_exact(
                &self.data[data_start..end],
                entry.inflated_size,
                current_offset,
            )?;

            match entry.entry_type {
                PackEntryType::OfsDelta { base_offset } => {
                    chain.push(payload);
                    current_offset = base_offset;
                }
                PackEntryType::RefDelta { base_oid } => {
                    chain.push(payload);
                    if let Some(base_offset) = self.index.lookup(&base_oid)? {
                        current_offset = base_offset;
                    } else if let Some(base) = resolver(&base_oid) {
                        return finish_chain(base, &chain);
                    } else {
                        return Err(PackError::MissingBase(base_oid));
                    }
                }
                base_type => {
                    let obj_type = base_type
                        .to_object_type()
                        .ok_or(PackError::CorruptEntry(current_offset))?;
                    return finish_chain(RawObject::new(obj_type, payload), &chain);
                }
            }
        }
    }

    /// Check whether this pack contains the given id.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.index.contains(oid)
    }

    /// Number of objects in this pack.
    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    /// The pack's index.
    pub fn index(&self) -> &PackIndex {
        &self.index
    }

    /// Path to the `.pack` file.
    pub fn path(&self) -> &Path {
        &self.pack_path
    }

    /// End of the entry region: everything before the trailing checksum.
    fn entries_end(&self) -> usize {
        self.data.len() - ObjectId::LEN
    }
}

/// Apply the accumulated delta chain (innermost first) to a base object.
fn finish_chain(base: RawObject, chain: &[Vec<u8>]) -> Result<RawObject, PackError> {
    let mut data = base.data;
    for delta in chain.iter().rev() {
        data = apply_delta(&data, delta)?;
    }
    Ok(RawObject::new(base.obj_type, data))
}

/// Inflate a zlib stream that must produce exactly `declared` bytes.
fn inflate_exact(compressed: &[u8], declared: u64, offset: u64) -> Result<Vec<u8>, PackError> {
    // declared is untrusted; cap the preallocation and stop reading one
    // byte past the declared size.
    let mut decoder = ZlibDecoder::new(compressed).take(declared.saturating_add(1));
    let mut buf = Vec::with_capacity(declared.min(1 << 20) as usize);
    decoder
        .read_to_end(&mut buf)
        .map_err(|_| PackError::CorruptEntry(offset))?;

    if buf.len() as u64 != declared {
        return Err(PackError::SizeMismatch {
            offset,
            declared,
            actual: buf.len(),
        });
    }
    Ok(buf)
}
