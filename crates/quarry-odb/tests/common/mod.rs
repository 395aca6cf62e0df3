//! Shared fixture builders for object store integration tests.
//!
//! Builds loose objects and synthetic packs directly on disk, so tests
//! control exactly which storage holds which id.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use quarry_hash::hasher::Hasher;
use quarry_hash::ObjectId;
use quarry_object::ObjectType;
use quarry_pack::entry::encode_entry_header;
use quarry_pack::{IDX_SIGNATURE, IDX_VERSION, PACK_SIGNATURE, PACK_VERSION};

/// Compress with zlib at the default level.
pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut compressed = Vec::new();
    {
        let mut enc = ZlibEncoder::new(&mut compressed, Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap();
    }
    compressed
}

/// Id of an object as the store would compute it.
pub fn object_id(obj_type: ObjectType, content: &[u8]) -> ObjectId {
    Hasher::hash_object(obj_type.as_str(), content).unwrap()
}

/// Write a loose object under `objects_dir`, returning its id.
pub fn write_loose(objects_dir: &Path, obj_type: ObjectType, content: &[u8]) -> ObjectId {
    let oid = object_id(obj_type, content);
    write_loose_as(objects_dir, &oid, obj_type, content);
    oid
}

/// Write loose content filed under an explicit id.
///
/// Precedence tests deliberately file content under an id that does not
/// hash to it, to observe which storage answered a read.
pub fn write_loose_as(objects_dir: &Path, oid: &ObjectId, obj_type: ObjectType, content: &[u8]) {
    let mut raw = Vec::new();
    raw.extend_from_slice(obj_type.as_bytes());
    raw.push(b' ');
    raw.extend_from_slice(content.len().to_string().as_bytes());
    raw.push(0);
    raw.extend_from_slice(content);

    let path = objects_dir.join(oid.loose_path());
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, zlib(&raw)).unwrap();
}

/// One entry of a synthetic pack, indexed under an explicit id.
pub enum PackEntry<'a> {
    /// Object stored whole.
    Base {
        oid: ObjectId,
        obj_type: ObjectType,
        content: &'a [u8],
    },
    /// REF-delta against `base_oid` (in-pack or external).
    RefDelta {
        oid: ObjectId,
        base_oid: ObjectId,
        delta: Vec<u8>,
    },
}

/// A base entry whose id is computed from its content.
pub fn base(obj_type: ObjectType, content: &[u8]) -> PackEntry<'_> {
    PackEntry::Base {
        oid: object_id(obj_type, content),
        obj_type,
        content,
    }
}

/// Assemble `<name>.pack` + `<name>.idx` under `objects_dir/pack/`.
pub fn build_pack(objects_dir: &Path, name: &str, entries: &[PackEntry<'_>]) -> PathBuf {
    let pack_dir = objects_dir.join("pack");
    std::fs::create_dir_all(&pack_dir).unwrap();

    let mut pack_data = Vec::new();
    pack_data.extend_from_slice(PACK_SIGNATURE);
    pack_data.extend_from_slice(&PACK_VERSION.to_be_bytes());
    pack_data.extend_from_slice(&(entries.len() as u32).to_be_bytes());

    let mut index_entries: Vec<(ObjectId, u64, u32)> = Vec::new();

    for entry in entries {
        let entry_offset = pack_data.len() as u64;
        let mut raw = Vec::new();
        let oid = match entry {
            PackEntry::Base {
                oid,
                obj_type,
                content,
            } => {
                raw.extend_from_slice(&encode_entry_header(
                    type_number(*obj_type),
                    content.len() as u64,
                ));
                raw.extend_from_slice(&zlib(content));
                *oid
            }
            PackEntry::RefDelta {
                oid,
                base_oid,
                delta,
            } => {
                raw.extend_from_slice(&encode_entry_header(7, delta.len() as u64));
                raw.extend_from_slice(base_oid.as_bytes());
                raw.extend_from_slice(&zlib(delta));
                *oid
            }
        };

        let mut crc = crc32fast::Hasher::new();
        crc.update(&raw);
        index_entries.push((oid, entry_offset, crc.finalize()));
        pack_data.extend_from_slice(&raw);
    }

    let pack_checksum = Hasher::digest(&pack_data).unwrap();
    pack_data.extend_from_slice(pack_checksum.as_bytes());

    let pack_path = pack_dir.join(format!("{name}.pack"));
    std::fs::write(&pack_path, &pack_data).unwrap();

    let idx_data = build_v2_idx(&index_entries, pack_checksum.as_bytes());
    std::fs::write(pack_dir.join(format!("{name}.idx")), idx_data).unwrap();

    pack_path
}

fn type_number(obj_type: ObjectType) -> u8 {
    match obj_type {
        ObjectType::Commit => 1,
        ObjectType::Tree => 2,
        ObjectType::Blob => 3,
        ObjectType::Tag => 4,
    }
}

fn build_v2_idx(entries: &[(ObjectId, u64, u32)], pack_checksum: &[u8]) -> Vec<u8> {
    let mut sorted: Vec<_> = entries.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut buf = Vec::new();
    buf.extend_from_slice(&IDX_SIGNATURE);
    buf.extend_from_slice(&IDX_VERSION.to_be_bytes());

    let mut fanout = [0u32; 256];
    for (oid, _, _) in &sorted {
        fanout[oid.first_byte() as usize] += 1;
    }
    for i in 1..256 {
        fanout[i] += fanout[i - 1];
    }
    for count in fanout {
        buf.extend_from_slice(&count.to_be_bytes());
    }
    for (oid, _, _) in &sorted {
        buf.extend_from_slice(oid.as_bytes());
    }
    for (_, _, crc) in &sorted {
        buf.extend_from_slice(&crc.to_be_bytes());
    }
    for (_, offset, _) in &sorted {
        buf.extend_from_slice(&(*offset as u32).to_be_bytes());
    }

    buf.extend_from_slice(pack_checksum);
    let idx_checksum = Hasher::digest(&buf).unwrap();
    buf.extend_from_slice(idx_checksum.as_bytes());
    buf
}
