//! Delta stream decoding and encoding.
//!
//! Deltified pack entries store instructions for rebuilding a target
//! object from a base object:
//!
//! ```text
//! [source_size: varint] [target_size: varint]
//! [instruction]*
//! ```
//!
//! Instructions:
//! - Copy:   `[1SSSOOOO] [offset bytes] [length bytes]` copies a range
//!   from the base; bits 0-3 select up to 4 little-endian offset bytes,
//!   bits 4-6 up to 3 length bytes, and all-zero length bits mean
//!   0x10000.
//! - Insert: `[0NNNNNNN] [N literal bytes]` appends 1-127 bytes.
//!
//! Opcode 0 is reserved and always an error.

pub mod apply;
pub mod compute;

use crate::PackError;

/// A single delta instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaInstruction {
    /// Copy bytes from the base object.
    Copy { offset: u64, size: usize },
    /// Insert literal bytes into the output.
    Insert(Vec<u8>),
}

/// Decode the operands of a copy opcode, advancing `pos` past them.
pub(crate) fn read_copy_operands(
    cmd: u8,
    delta: &[u8],
    pos: &mut usize,
) -> Result<(usize, usize), PackError> {
    let mut offset = 0usize;
    for (bit, shift) in [(0x01u8, 0u32), (0x02, 8), (0x04, 16), (0x08, 24)] {
        if cmd & bit != 0 {
            let byte = *delta.get(*pos).ok_or(PackError::TruncatedDelta {
                offset: *pos,
                reason: "copy offset cut short",
            })?;
            *pos += 1;
            offset |= (byte as usize) << shift;
        }
    }

    let mut size = 0usize;
    for (bit, shift) in [(0x10u8, 0u32), (0x20, 8), (0x40, 16)] {
        if cmd & bit != 0 {
            let byte = *delta.get(*pos).ok_or(PackError::TruncatedDelta {
                offset: *pos,
                reason: "copy length cut short",
            })?;
            *pos += 1;
            size |= (byte as usize) << shift;
        }
    }

    // All length bits clear means the maximum copy.
    if size == 0 {
        size = 0x10000;
    }
    Ok((offset, size))
}

/// Parse a delta stream into structured instructions.
///
/// Returns `(source_size, target_size, instructions)`.
pub fn parse_delta_instructions(
    delta: &[u8],
) -> Result<(u64, u64, Vec<DeltaInstruction>), PackError> {
    use crate::varint::read_size_varint;

    let mut pos = 0;

    let (source_size, consumed) =
        read_size_varint(delta).ok_or(PackError::MalformedVarint { offset: 0 })?;
    pos += consumed;

    let (target_size, consumed) =
        read_size_varint(&delta[pos..]).ok_or(PackError::MalformedVarint {
            offset: pos as u64,
        })?;
    pos += consumed;

    let mut instructions = Vec::new();
    while pos < delta.len() {
        let cmd = delta[pos];
        pos += 1;

        if cmd & 0x80 != 0 {
            let (offset, size) = read_copy_operands(cmd, delta, &mut pos)?;
            instructions.push(DeltaInstruction::Copy {
                offset: offset as u64,
                size,
            });
        } else if cmd != 0 {
            let n = cmd as usize;
            if pos + n > delta.len() {
                return Err(PackError::TruncatedDelta {
                    offset: pos,
                    reason: "insert data cut short",
                });
            }
            instructions.push(DeltaInstruction::Insert(delta[pos..pos + n].to_vec()));
            pos += n;
        } else {
            return Err(PackError::InvalidDeltaOpcode { offset: pos - 1 });
        }
    }

    Ok((source_size, target_size, instructions))
}

/// Encode a copy instruction.
pub fn encode_copy(offset: u64, size: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8);
    let mut cmd: u8 = 0x80;
    let mut extra = Vec::new();

    let off = offset as u32;
    if off & 0x0000_00ff != 0 {
        cmd |= 0x01;
        extra.push((off & 0xff) as u8);
    }
    if off & 0x0000_ff00 != 0 {
        cmd |= 0x02;
        extra.push(((off >> 8) & 0xff) as u8);
    }
    if off & 0x00ff_0000 != 0 {
        cmd |= 0x04;
        extra.push(((off >> 16) & 0xff) as u8);
    }
    if off & 0xff00_0000 != 0 {
        cmd |= 0x08;
        extra.push(((off >> 24) & 0xff) as u8);
    }

    let sz = if size == 0x10000 { 0usize } else { size };
    if sz & 0x0000_00ff != 0 {
        cmd |= 0x10;
        extra.push((sz & 0xff) as u8);
    }
    if sz & 0x0000_ff00 != 0 {
        cmd |= 0x20;
        extra.push(((sz >> 8) & 0xff) as u8);
    }
    if sz & 0xff_0000 != 0 {
        cmd |= 0x40;
        extra.push(((sz >> 16) & 0xff) as u8);
    }

    buf.push(cmd);
    buf.extend_from_slice(&extra);
    buf
}

/// Encode an insert instruction. Data must be 1-127 bytes.
pub fn encode_insert(data: &[u8]) -> Vec<u8> {
    assert!(!data.is_empty() && data.len() <= 127);
    let mut buf = Vec::with_capacity(1 + data.len());
    buf.push(data.len() as u8);
    buf.extend_from_slice(data);
    buf
}
