//! Generic tag + length + payload framing

use core::fmt;

use crate::codec::{ByteCursor, len_u32, write_u32};
use crate::error::{FormatError, FormatErrorKind, MooError};

/// Size of a frame header (tag + u32 length)
pub const FRAME_HEADER_LEN: usize = 8;

/// Four-byte chunk identifier
///
/// Known chunk kinds get their own variant; anything else is carried as
/// [`ChunkTag::Unknown`] so readers can skip it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkTag {
    /// `MOO ` file header
    Moo,
    /// `TEST` one test record
    Test,
    /// `NAME` instruction disassembly
    Name,
    /// `BYTS` instruction bytes
    Bytes,
    /// `INIT` initial CPU state
    Init,
    /// `FINA` final CPU state
    Final,
    /// `REGS` register bitmask and values
    Regs,
    /// `RAM ` sparse memory
    Ram,
    /// `QUEU` prefetch queue
    Queue,
    /// `CYCL` bus cycle trace
    Cycles,
    /// `HASH` test digest
    Hash,
    Unknown([u8; 4]),
}

impl ChunkTag {
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        match &bytes {
            b"MOO " => ChunkTag::Moo,
            b"TEST" => ChunkTag::Test,
            b"NAME" => ChunkTag::Name,
            b"BYTS" => ChunkTag::Bytes,
            b"INIT" => ChunkTag::Init,
            b"FINA" => ChunkTag::Final,
            b"REGS" => ChunkTag::Regs,
            b"RAM " => ChunkTag::Ram,
            b"QUEU" => ChunkTag::Queue,
            b"CYCL" => ChunkTag::Cycles,
            b"HASH" => ChunkTag::Hash,
            _ => ChunkTag::Unknown(bytes),
        }
    }

    pub const fn to_bytes(self) -> [u8; 4] {
        match self {
            ChunkTag::Moo => *b"MOO ",
            ChunkTag::Test => *b"TEST",
            ChunkTag::Name => *b"NAME",
            ChunkTag::Bytes => *b"BYTS",
            ChunkTag::Init => *b"INIT",
            ChunkTag::Final => *b"FINA",
            ChunkTag::Regs => *b"REGS",
            ChunkTag::Ram => *b"RAM ",
            ChunkTag::Queue => *b"QUEU",
            ChunkTag::Cycles => *b"CYCL",
            ChunkTag::Hash => *b"HASH",
            ChunkTag::Unknown(bytes) => bytes,
        }
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.to_bytes().escape_ascii())
    }
}

// =============================================================================
// Writing
// =============================================================================

/// Append `tag | len | payload` to `out`
pub fn write_frame(out: &mut Vec<u8>, tag: ChunkTag, payload: &[u8]) -> Result<(), MooError> {
    let len = len_u32(payload.len(), "chunk payload")?;
    out.extend_from_slice(&tag.to_bytes());
    write_u32(out, len);
    out.extend_from_slice(payload);
    Ok(())
}

/// Append a frame whose payload is produced in place by `body`
///
/// The length field is patched once `body` returns. If `body` fails, `out`
/// is truncated back to its original length.
pub fn write_frame_with<F>(out: &mut Vec<u8>, tag: ChunkTag, body: F) -> Result<(), MooError>
where
    F: FnOnce(&mut Vec<u8>) -> Result<(), MooError>,
{
    let start = out.len();
    out.extend_from_slice(&tag.to_bytes());
    write_u32(out, 0);

    let result = body(out).and_then(|()| {
        len_u32(out.len() - start - FRAME_HEADER_LEN, "chunk payload")
    });
    match result {
        Ok(len) => {
            out[start + 4..start + FRAME_HEADER_LEN].copy_from_slice(&len.to_le_bytes());
            Ok(())
        }
        Err(e) => {
            out.truncate(start);
            Err(e)
        }
    }
}

// =============================================================================
// Reading
// =============================================================================

/// A chunk borrowed from an input buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub tag: ChunkTag,
    pub payload: &'a [u8],
    /// Absolute offset of the frame header
    pub offset: usize,
}

impl<'a> Frame<'a> {
    /// Absolute offset of the first payload byte
    pub fn payload_offset(&self) -> usize {
        self.offset + FRAME_HEADER_LEN
    }

    /// Cursor over the payload
    pub fn cursor(&self) -> ByteCursor<'a> {
        ByteCursor::with_base(self.payload, self.payload_offset())
    }

    /// Nested frames filling the whole payload
    pub fn children(&self) -> Frames<'a> {
        Frames::new(self.cursor())
    }

    /// Fail unless this frame carries `expected`
    pub fn expect(self, expected: ChunkTag) -> Result<Self, FormatError> {
        if self.tag == expected {
            Ok(self)
        } else {
            Err(FormatError::new(
                self.offset,
                FormatErrorKind::UnexpectedTag {
                    expected,
                    found: self.tag,
                },
            ))
        }
    }

    /// Fail unless the payload is exactly `expected` bytes long
    pub fn expect_len(&self, expected: u64) -> Result<(), FormatError> {
        let declared = self.payload.len() as u64;
        if declared == expected {
            Ok(())
        } else {
            Err(FormatError::new(
                self.offset,
                FormatErrorKind::LengthMismatch {
                    tag: self.tag,
                    declared,
                    expected,
                },
            ))
        }
    }
}

/// Read one frame, requiring its whole payload to be present
pub fn read_frame<'a>(cursor: &mut ByteCursor<'a>) -> Result<Frame<'a>, FormatError> {
    let offset = cursor.offset();
    let tag = ChunkTag::from_bytes(cursor.read_array("chunk tag")?);
    let len = cursor.read_u32("chunk length")?;
    let payload = cursor.read_bytes(len as usize, "chunk payload")?;
    Ok(Frame {
        tag,
        payload,
        offset,
    })
}

/// Iterator over consecutive frames until the cursor is exhausted
///
/// Stops after the first error.
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    cursor: ByteCursor<'a>,
    failed: bool,
}

impl<'a> Frames<'a> {
    pub fn new(cursor: ByteCursor<'a>) -> Self {
        Self {
            cursor,
            failed: false,
        }
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<Frame<'a>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.cursor.is_empty() {
            return None;
        }
        let frame = read_frame(&mut self.cursor);
        self.failed = frame.is_err();
        Some(frame)
    }
}
