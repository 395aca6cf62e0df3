//! Apply a delta stream to reconstruct an object.

use super::read_copy_operands;
use crate::varint::read_size_varint;
use crate::PackError;

/// Apply a delta to a base object, producing the target bytes.
///
/// The declared source size must match `base.len()` exactly and the
/// produced output must match the declared target size; both checks are
/// hard errors. Every copy range is bounds-checked against the base
/// before any bytes move.
pub fn apply_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>, PackError> {
    let mut pos = 0;

    let (source_size, consumed) =
        read_size_varint(delta).ok_or(PackError::MalformedVarint { offset: 0 })?;
    pos += consumed;

    let (target_size, consumed) =
        read_size_varint(&delta[pos..]).ok_or(PackError::MalformedVarint {
            offset: pos as u64,
        })?;
    pos += consumed;

    if source_size != base.len() as u64 {
        return Err(PackError::BaseSizeMismatch {
            declared: source_size,
            actual: base.len(),
        });
    }

    // target_size is untrusted; cap the preallocation.
    let mut output = Vec::with_capacity(target_size.min(1 << 20) as usize);

    while pos < delta.len() {
        let cmd = delta[pos];
        pos += 1;

        if cmd & 0x80 != 0 {
            let (offset, size) = read_copy_operands(cmd, delta, &mut pos)?;
            let end = offset
                .checked_add(size)
                .filter(|&end| end <= base.len())
                .ok_or(PackError::TruncatedDelta {
                    offset: pos,
                    reason: "copy range outside base",
                })?;
            output.extend_from_slice(&base[offset..end]);
        } else if cmd != 0 {
            let n = cmd as usize;
            if pos + n > delta.len() {
                return Err(PackError::TruncatedDelta {
                    offset: pos,
                    reason: "insert data cut short",
                });
            }
            output.extend_from_slice(&delta[pos..pos + n]);
            pos += n;
        } else {
            return Err(PackError::InvalidDeltaOpcode { offset: pos - 1 });
        }
    }

    if output.len() as u64 != target_size {
        return Err(PackError::ResultSizeMismatch {
            declared: target_size,
            actual: output.len(),
        });
    }

    Ok(output)
}
