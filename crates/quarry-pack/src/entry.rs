//! Pack entry header parsing.

use quarry_hash::ObjectId;

use crate::varint::{read_entry_size, read_offset_varint};
use crate::{PackEntryType, PackError};

/// A raw entry header read from a packfile, before delta resolution.
#[derive(Debug, Clone)]
pub struct PackEntry {
    pub entry_type: PackEntryType,
    /// Declared size of the payload once inflated.
    pub inflated_size: u64,
    /// Absolute offset of the compressed payload in the pack.
    pub data_offset: u64,
    /// Number of bytes consumed by the header.
    pub header_size: usize,
}

/// Parse the pack entry header starting at the given position in `data`.
///
/// `data` must begin at the first byte of the entry; `entry_offset` is the
/// entry's absolute offset in the pack file (needed to turn an OFS-delta's
/// backward distance into an absolute base offset). Bits 4-6 of byte 0 hold
/// the type; type numbers 0 and 5 are reserved. An OFS-delta base must lie
/// strictly before the entry itself.
pub fn parse_entry_header(data: &[u8], entry_offset: u64) -> Result<PackEntry, PackError> {
    let first = *data.first().ok_or(PackError::CorruptEntry(entry_offset))?;
    let type_num = (first >> 4) & 0x07;

    let (inflated_size, mut pos) =
        read_entry_size(data).ok_or(PackError::MalformedVarint {
            offset: entry_offset,
        })?;

    let entry_type = match type_num {
        1 => PackEntryType::Commit,
        2 => PackEntryType::Tree,
        3 => PackEntryType::Blob,
        4 => PackEntryType::Tag,
        6 => {
            let (distance, consumed) =
                read_offset_varint(&data[pos..]).ok_or(PackError::MalformedVarint {
                    offset: entry_offset + pos as u64,
                })?;
            pos += consumed;
            if distance == 0 || distance > entry_offset {
                return Err(PackError::CorruptEntry(entry_offset));
            }
            PackEntryType::OfsDelta {
                base_offset: entry_offset - distance,
            }
        }
        7 => {
            let end = pos + ObjectId::LEN;
            if end > data.len() {
                return Err(PackError::CorruptEntry(entry_offset));
            }
            let base_oid = ObjectId::from_bytes(&data[pos..end])?;
            pos = end;
            PackEntryType::RefDelta { base_oid }
        }
        n => {
            return Err(PackError::InvalidObjectType {
                offset: entry_offset,
                type_num: n,
            });
        }
    };

    Ok(PackEntry {
        entry_type,
        inflated_size,
        data_offset: entry_offset + pos as u64,
        header_size: pos,
    })
}

/// Encode a pack entry header.
///
/// For OFS-delta and REF-delta entries the caller appends the base
/// reference (offset varint or raw id) separately.
pub fn encode_entry_header(type_num: u8, size: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(10);
    let mut s = size;

    let mut c = (type_num << 4) | (s & 0x0f) as u8;
    s >>= 4;

    while s > 0 {
        buf.push(c | 0x80);
        c = (s & 0x7f) as u8;
        s >>= 7;
    }
    buf.push(c);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::varint::write_offset_varint;

    #[test]
    fn parse_blob_header() {
        let data = encode_entry_header(3, 100);
        let entry = parse_entry_header(&data, 0).unwrap();
        assert_eq!(entry.entry_type, PackEntryType::Blob);
        assert_eq!(entry.inflated_size, 100);
        assert_eq!(entry.header_size, data.len());
        assert_eq!(entry.data_offset, data.len() as u64);
    }

    #[test]
    fn parse_commit_header_single_byte() {
        // (1 << 4) | 5, no continuation bit
        let entry = parse_entry_header(&[0x15], 0).unwrap();
        assert_eq!(entry.entry_type, PackEntryType::Commit);
        assert_eq!(entry.inflated_size, 5);
        assert_eq!(entry.header_size, 1);
    }

    #[test]
    fn header_roundtrip_all_base_types() {
        for (type_num, expected) in [
            (1, PackEntryType::Commit),
            (2, PackEntryType::Tree),
            (3, PackEntryType::Blob),
            (4, PackEntryType::Tag),
        ] {
            let data = encode_entry_header(type_num, 1_000_000);
            let entry = parse_entry_header(&data, 42).unwrap();
            assert_eq!(entry.entry_type, expected);
            assert_eq!(entry.inflated_size, 1_000_000);
        }
    }

    #[test]
    fn parse_ofs_delta_header() {
        let mut data = encode_entry_header(6, 30);
        data.extend_from_slice(&write_offset_varint(500));
        let entry = parse_entry_header(&data, 2000).unwrap();
        assert_eq!(
            entry.entry_type,
            PackEntryType::OfsDelta { base_offset: 1500 }
        );
        assert_eq!(entry.header_size, data.len());
        assert_eq!(entry.data_offset, 2000 + data.len() as u64);
    }

    #[test]
    fn ofs_delta_base_must_be_backward() {
        // Distance larger than the entry's own offset.
        let mut data = encode_entry_header(6, 30);
        data.extend_from_slice(&write_offset_varint(500));
        let err = parse_entry_header(&data, 100).unwrap_err();
        assert!(matches!(err, PackError::CorruptEntry(100)));

        // Zero distance would make the entry its own base.
        let mut data = encode_entry_header(6, 30);
        data.extend_from_slice(&write_offset_varint(0));
        let err = parse_entry_header(&data, 100).unwrap_err();
        assert!(matches!(err, PackError::CorruptEntry(100)));
    }

    #[test]
    fn parse_ref_delta_header() {
        let base_oid =
            ObjectId::from_hex("ce013625030ba8dba906f756967f9e9ca394464a").unwrap();
        let mut data = encode_entry_header(7, 30);
        data.extend_from_slice(base_oid.as_bytes());
        let entry = parse_entry_header(&data, 0).unwrap();
        assert_eq!(entry.entry_type, PackEntryType::RefDelta { base_oid });
    }

    #[test]
    fn ref_delta_truncated_base_id() {
        let mut data = encode_entry_header(7, 30);
        data.extend_from_slice(&[0xab; 10]);
        let err = parse_entry_header(&data, 7).unwrap_err();
        assert!(matches!(err, PackError::CorruptEntry(7)));
    }

    #[test]
    fn reserved_type_numbers_rejected() {
        for type_num in [0u8, 5] {
            let byte = (type_num << 4) | 0x01;
            let err = parse_entry_header(&[byte], 9).unwrap_err();
            assert!(matches!(
                err,
                PackError::InvalidObjectType {
                    offset: 9,
                    type_num: n,
                } if n == type_num
            ));
        }
    }

    #[test]
    fn empty_input_rejected() {
        let err = parse_entry_header(&[], 0).unwrap_err();
        assert!(matches!(err, PackError::CorruptEntry(0)));
    }

    #[test]
    fn truncated_size_varint() {
        // Continuation bit set, then nothing.
        let err = parse_entry_header(&[0x80 | 0x35], 3).unwrap_err();
        assert!(matches!(err, PackError::MalformedVarint { offset: 3 }));
    }
}
