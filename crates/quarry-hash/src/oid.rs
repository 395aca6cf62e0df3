use std::fmt;
use std::str::FromStr;

use crate::hex::{hex_decode, hex_to_string};
use crate::HashError;

/// A git object identifier: the SHA-1 hash of an object's serialized form.
///
/// 20 raw bytes, displayed as 40 lowercase hex characters. Ids are immutable
/// and ordered by their byte content, which is also the sort order of the
/// id tables inside pack index files.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    /// Raw digest length in bytes.
    pub const LEN: usize = 20;

    /// Length of the hex representation.
    pub const HEX_LEN: usize = 40;

    /// The null id (all zeros).
    pub const NULL: Self = Self([0u8; 20]);

    /// Create an id from exactly 20 raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HashError> {
        if bytes.len() != Self::LEN {
            return Err(HashError::InvalidHashLength {
                expected: Self::LEN,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Parse a 40-character hex string (case-insensitive).
    pub fn from_hex(hex: &str) -> Result<Self, HashError> {
        if hex.len() != Self::HEX_LEN {
            return Err(HashError::InvalidHexLength {
                expected: Self::HEX_LEN,
                actual: hex.len(),
            });
        }
        let mut bytes = [0u8; 20];
        hex_decode(hex, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check if this is the null (all-zeros) id.
    pub fn is_null(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// The hex string representation (lowercase).
    pub fn to_hex(&self) -> String {
        hex_to_string(&self.0)
    }

    /// The first byte of the digest (the fan-out table bucket).
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    /// The loose object path component: `"xx/xxxx…"` (2 + 38 hex chars).
    pub fn loose_path(&self) -> String {
        let hex = self.to_hex();
        format!("{}/{}", &hex[..2], &hex[2..])
    }
}

impl From<[u8; 20]> for ObjectId {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", &self.to_hex()[..8])
    }
}

impl FromStr for ObjectId {
    type Err = HashError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
