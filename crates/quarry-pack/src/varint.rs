//! The three varint encodings used inside packfiles.
//!
//! Packs carry variable-length integers in three distinct schemes that
//! must never be conflated:
//!
//! - plain size varints (the two sizes at the head of a delta stream):
//!   little-endian base-128, 7 bits per byte at shifts 0, 7, 14, ...;
//! - entry-header sizes: the low 4 bits of the first byte seed the value,
//!   continuation bytes contribute 7 bits at shifts 4, 11, 18, ...;
//! - OFS-delta base offsets: big-endian base-128 with an off-by-one step
//!   per continuation, giving every offset a single canonical encoding.
//!
//! All readers return `(value, bytes_consumed)` or `None` when the buffer
//! ends before the continuation bit clears (or the value cannot fit in 64
//! bits). Callers map `None` to [`PackError::MalformedVarint`] with the
//! offset context the codec cannot know.
//!
//! [`PackError::MalformedVarint`]: crate::PackError::MalformedVarint

/// Read a plain little-endian base-128 varint.
pub fn read_size_varint(data: &[u8]) -> Option<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut pos = 0;

    loop {
        let byte = *data.get(pos)?;
        pos += 1;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Some((value, pos));
        }
        shift += 7;
        if shift >= 64 {
            return None;
        }
    }
}

/// Read a pack entry-header size.
///
/// The low 4 bits of the first byte seed the value; the 3 type bits above
/// them belong to the caller (see `entry::parse_entry_header`).
pub fn read_entry_size(data: &[u8]) -> Option<(u64, usize)> {
    let first = *data.first()?;
    let mut value = u64::from(first & 0x0f);
    let mut shift = 4u32;
    let mut pos = 1;

    let mut byte = first;
    while byte & 0x80 != 0 {
        byte = *data.get(pos)?;
        pos += 1;
        if shift >= 64 {
            return None;
        }
        value |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }
    Some((value, pos))
}

/// Read an OFS-delta base offset.
///
/// Big-endian accumulation with `n = ((n + 1) << 7) | low7` per
/// continuation byte. Distinct arithmetic from the size schemes.
pub fn read_offset_varint(data: &[u8]) -> Option<(u64, usize)> {
    let first = *data.first()?;
    let mut value = u64::from(first & 0x7f);
    let mut pos = 1;

    let mut byte = first;
    while byte & 0x80 != 0 {
        byte = *data.get(pos)?;
        pos += 1;
        value = value.checked_add(1)?.checked_mul(1 << 7)? | u64::from(byte & 0x7f);
    }
    Some((value, pos))
}

/// Encode a plain size varint.
pub fn write_size_varint(mut value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(10);
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
    buf
}

/// Encode an OFS-delta base offset.
pub fn write_offset_varint(offset: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(10);
    let mut off = offset;

    buf.push((off & 0x7f) as u8);
    off >>= 7;
    while off > 0 {
        off -= 1;
        buf.push(0x80 | (off & 0x7f) as u8);
        off >>= 7;
    }
    buf.reverse();
    buf
}
