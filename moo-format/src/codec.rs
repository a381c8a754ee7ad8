//! Fixed-width little-endian primitives and 3-flag bitfields

use crate::error::{FormatError, FormatErrorKind, MooError};

/// Character marking an inactive position in a flag string
pub const FLAG_FILLER: char = '-';

// =============================================================================
// Writing
// =============================================================================

pub(crate) fn write_u8(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

pub(crate) fn write_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub(crate) fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Convert a collection length to its on-disk u32 form
pub(crate) fn len_u32(len: usize, field: &'static str) -> Result<u32, MooError> {
    u32::try_from(len).map_err(|_| MooError::TooLarge { field, len })
}

/// Write a u32 count followed by the raw bytes
pub(crate) fn write_counted_bytes(
    out: &mut Vec<u8>,
    bytes: &[u8],
    field: &'static str,
) -> Result<(), MooError> {
    write_u32(out, len_u32(bytes.len(), field)?);
    out.extend_from_slice(bytes);
    Ok(())
}

// =============================================================================
// Reading
// =============================================================================

/// Bounds-checked little-endian reader over a borrowed buffer
///
/// Tracks the absolute offset of its first byte so errors raised while
/// reading a nested payload still point into the original buffer.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteCursor<'a> {
    /// Cursor over a whole buffer
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    /// Cursor over a slice that starts `base` bytes into the original buffer
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    /// Absolute offset of the next unread byte
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take the next `len` bytes
    pub fn read_bytes(&mut self, len: usize, context: &'static str) -> Result<&'a [u8], FormatError> {
        if len > self.remaining() {
            return Err(FormatError::new(
                self.offset(),
                FormatErrorKind::Truncated {
                    context,
                    needed: len as u64,
                    available: self.remaining() as u64,
                },
            ));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N], FormatError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N, context)?);
        Ok(buf)
    }

    pub fn read_u8(&mut self, context: &'static str) -> Result<u8, FormatError> {
        Ok(self.read_array::<1>(context)?[0])
    }

    pub fn read_u16(&mut self, context: &'static str) -> Result<u16, FormatError> {
        Ok(u16::from_le_bytes(self.read_array(context)?))
    }

    pub fn read_u32(&mut self, context: &'static str) -> Result<u32, FormatError> {
        Ok(u32::from_le_bytes(self.read_array(context)?))
    }
}

// =============================================================================
// Flag strings
// =============================================================================

/// Pack a 3-character flag string into the low 3 bits of a byte
///
/// The string is padded with [`FLAG_FILLER`] (or truncated) to 3 characters.
/// The first character maps to bit 2; a bit is set when its character is
/// anything other than the filler.
pub fn pack_flags(flags: &str) -> u8 {
    let mut chars = flags.chars().chain(std::iter::repeat(FLAG_FILLER));
    (0..3).fold(0u8, |bits, i| {
        let active = chars.next().is_some_and(|c| c != FLAG_FILLER);
        bits | (u8::from(active) << (2 - i))
    })
}

/// Render the low 3 bits of a byte as a flag string
///
/// Set bits show the matching letter, clear bits show [`FLAG_FILLER`].
pub fn unpack_flags(bits: u8, letters: [char; 3]) -> String {
    letters
        .iter()
        .enumerate()
        .map(|(i, &letter)| {
            if bits & (1 << (2 - i)) != 0 {
                letter
            } else {
                FLAG_FILLER
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian_writes() {
        let mut out = Vec::new();
        write_u8(&mut out, 0xAB);
        write_u16(&mut out, 0x1234);
        write_u32(&mut out, 0xDEADBEEF);
        assert_eq!(out, [0xAB, 0x34, 0x12, 0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn test_cursor_reads() {
        let data = [0xAB, 0x34, 0x12, 0xEF, 0xBE, 0xAD, 0xDE];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_u8("a").unwrap(), 0xAB);
        assert_eq!(cursor.read_u16("b").unwrap(), 0x1234);
        assert_eq!(cursor.read_u32("c").unwrap(), 0xDEADBEEF);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_cursor_truncated() {
        let data = [0u8; 3];
        let mut cursor = ByteCursor::with_base(&data, 0x100);
        cursor.read_u8("first").unwrap();

        let err = cursor.read_u32("count").unwrap_err();
        assert_eq!(err.offset, 0x101);
        assert_eq!(
            err.kind,
            FormatErrorKind::Truncated {
                context: "count",
                needed: 4,
                available: 2,
            }
        );
        // A failed read consumes nothing
        assert_eq!(cursor.remaining(), 2);
    }

    #[test]
    fn test_pack_flags() {
        assert_eq!(pack_flags("---"), 0b000);
        assert_eq!(pack_flags("R--"), 0b100);
        assert_eq!(pack_flags("-A-"), 0b010);
        assert_eq!(pack_flags("--W"), 0b001);
        assert_eq!(pack_flags("RAW"), 0b111);
        // Any non-filler character counts
        assert_eq!(pack_flags("xyz"), 0b111);
    }

    #[test]
    fn test_pack_flags_pads_and_truncates() {
        assert_eq!(pack_flags(""), 0);
        assert_eq!(pack_flags("R"), 0b100);
        assert_eq!(pack_flags("-W"), 0b010);
        assert_eq!(pack_flags("--WRRR"), 0b001);
    }

    #[test]
    fn test_unpack_flags() {
        let letters = ['R', 'A', 'W'];
        assert_eq!(unpack_flags(0b000, letters), "---");
        assert_eq!(unpack_flags(0b101, letters), "R-W");
        assert_eq!(unpack_flags(0b111, letters), "RAW");
        // Only the low 3 bits are meaningful
        assert_eq!(unpack_flags(0b1111_1000, letters), "---");
    }

    #[test]
    fn test_len_u32() {
        assert_eq!(len_u32(7, "ram").unwrap(), 7);
    }
}
