//! Lowercase hex encoding and decoding for object ids.

use crate::HashError;

/// Lookup table: ASCII byte → nibble value (255 = invalid).
const HEX_DECODE: [u8; 256] = {
    let mut table = [255u8; 256];
    let mut i = 0u8;
    loop {
        match i {
            b'0'..=b'9' => table[i as usize] = i - b'0',
            b'a'..=b'f' => table[i as usize] = i - b'a' + 10,
            b'A'..=b'F' => table[i as usize] = i - b'A' + 10,
            _ => {}
        }
        if i == 255 {
            break;
        }
        i += 1;
    }
    table
};

const HEX_ENCODE: &[u8; 16] = b"0123456789abcdef";

/// Hex-encode `bytes` into `buf`, which must hold at least `bytes.len() * 2`.
///
/// # Panics
///
/// Panics if `buf` is too short.
pub fn hex_encode(bytes: &[u8], buf: &mut [u8]) {
    assert!(buf.len() >= bytes.len() * 2, "hex_encode: buffer too short");
    for (i, &b) in bytes.iter().enumerate() {
        buf[i * 2] = HEX_ENCODE[(b >> 4) as usize];
        buf[i * 2 + 1] = HEX_ENCODE[(b & 0x0f) as usize];
    }
}

/// Hex-encode `bytes` to a new lowercase `String`.
pub fn hex_to_string(bytes: &[u8]) -> String {
    let mut buf = vec![0u8; bytes.len() * 2];
    hex_encode(bytes, &mut buf);
    // SAFETY: hex_encode only writes ASCII hex digits.
    unsafe { String::from_utf8_unchecked(buf) }
}

/// Decode a hex string into `buf`. The string length must be exactly
/// `buf.len() * 2`; uppercase digits are accepted.
pub fn hex_decode(hex: &str, buf: &mut [u8]) -> Result<(), HashError> {
    let hex = hex.as_bytes();
    if hex.len() != buf.len() * 2 {
        return Err(HashError::InvalidHexLength {
            expected: buf.len() * 2,
            actual: hex.len(),
        });
    }
    for i in 0..buf.len() {
        let hi = HEX_DECODE[hex[i * 2] as usize];
        let lo = HEX_DECODE[hex[i * 2 + 1] as usize];
        if hi == 255 {
            return Err(HashError::InvalidHex {
                position: i * 2,
                character: hex[i * 2] as char,
            });
        }
        if lo == 255 {
            return Err(HashError::InvalidHex {
                position: i * 2 + 1,
                character: hex[i * 2 + 1] as char,
            });
        }
        buf[i] = (hi << 4) | lo;
    }
    Ok(())
}
