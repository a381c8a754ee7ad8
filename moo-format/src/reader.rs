//! MOO document reader
//!
//! Decodes a borrowed buffer one `TEST` chunk at a time. The header is parsed
//! up front; tests are yielded lazily by the [`Iterator`] implementation.

use crate::chunk::{ChunkTag, Frame, Frames, read_frame};
use crate::codec::ByteCursor;
use crate::error::{FormatError, FormatErrorKind, MooError};
use crate::fields::{
    decode_counted_bytes, decode_cycles, decode_hash, decode_name, decode_ram, decode_registers,
};
use crate::types::{CpuName, CpuState, MooDocument, MooHeader, TestRecord};
use crate::{HEADER_PAYLOAD_LEN, MOO_VERSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    ExpectTest { remaining: u32 },
    Done,
}

/// Streaming reader over an in-memory MOO file
///
/// Yields one [`TestRecord`] per `TEST` chunk announced by the header. After
/// the first error the reader is exhausted. Bytes following the last test
/// are ignored.
///
/// ```
/// use moo_format::{MooReader, MooWriter, TestRecord};
///
/// let tests = vec![TestRecord::default(); 3];
/// let bytes = MooWriter::new("8086")?.encode(&tests)?;
/// let reader = MooReader::new(&bytes)?;
/// assert_eq!(reader.header().test_count, 3);
/// assert_eq!(reader.count(), 3);
/// # Ok::<(), moo_format::MooError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MooReader<'a> {
    cursor: ByteCursor<'a>,
    header: MooHeader,
    state: ReadState,
}

impl<'a> MooReader<'a> {
    /// Parse the `MOO ` header and position the reader on the first test
    pub fn new(data: &'a [u8]) -> Result<Self, MooError> {
        let mut cursor = ByteCursor::new(data);
        let header = read_header(&mut cursor)?;

        tracing::debug!(
            "MOO v{} header: {} tests for {}",
            header.version,
            header.test_count,
            header.cpu_name
        );

        Ok(Self {
            cursor,
            header,
            state: ReadState::ExpectTest {
                remaining: header.test_count,
            },
        })
    }

    pub fn header(&self) -> &MooHeader {
        &self.header
    }

    /// Number of tests not yet read
    pub fn remaining(&self) -> u32 {
        match self.state {
            ReadState::ExpectTest { remaining } => remaining,
            ReadState::Done => 0,
        }
    }

    /// Absolute offset of the next unread byte
    pub fn position(&self) -> usize {
        self.cursor.offset()
    }

    fn read_test(&mut self) -> Result<TestRecord, FormatError> {
        let frame = read_frame(&mut self.cursor)?;
        decode_test(frame)
    }
}

impl Iterator for MooReader<'_> {
    type Item = Result<TestRecord, MooError>;

    fn next(&mut self) -> Option<Self::Item> {
        let ReadState::ExpectTest { remaining } = self.state else {
            return None;
        };
        if remaining == 0 {
            self.state = ReadState::Done;
            return None;
        }

        let result = self.read_test();
        self.state = match result {
            Ok(_) if remaining > 1 => ReadState::ExpectTest {
                remaining: remaining - 1,
            },
            _ => ReadState::Done,
        };
        Some(result.map_err(MooError::from))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining() as usize))
    }
}

/// Decode a complete document, failing on the first malformed test
pub fn decode_document(data: &[u8]) -> Result<MooDocument, MooError> {
    let reader = MooReader::new(data)?;
    let header = *reader.header();
    let tests = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(MooDocument { header, tests })
}

// =============================================================================
// Chunk decoders
// =============================================================================

fn read_header(cursor: &mut ByteCursor<'_>) -> Result<MooHeader, FormatError> {
    // Check the tag before trusting the length of a possibly foreign file
    let offset = cursor.offset();
    let found = ChunkTag::from_bytes(cursor.clone().read_array("chunk tag")?);
    if found != ChunkTag::Moo {
        return Err(FormatError::new(
            offset,
            FormatErrorKind::UnexpectedTag {
                expected: ChunkTag::Moo,
                found,
            },
        ));
    }

    let frame = read_frame(cursor)?;
    frame.expect_len(HEADER_PAYLOAD_LEN as u64)?;

    let mut payload = frame.cursor();
    let version_offset = payload.offset();
    let version = payload.read_u32("version")?;
    if version != MOO_VERSION {
        return Err(FormatError::new(
            version_offset,
            FormatErrorKind::UnsupportedVersion(version),
        ));
    }
    let test_count = payload.read_u32("test count")?;
    let cpu_name = CpuName::from_bytes(payload.read_array("cpu name")?);

    Ok(MooHeader {
        version,
        test_count,
        cpu_name,
    })
}

fn decode_test(frame: Frame<'_>) -> Result<TestRecord, FormatError> {
    let frame = frame.expect(ChunkTag::Test)?;
    let mut cursor = frame.cursor();
    let index = cursor.read_u32("test index")?;

    let mut name = None;
    let mut instruction_bytes = None;
    let mut initial_state = None;
    let mut final_state = None;
    let mut cycles = None;
    let mut hash = None;

    for child in Frames::new(cursor) {
        let child = child?;
        match child.tag {
            ChunkTag::Name => store(&mut name, &frame, &child, decode_name(&child)?)?,
            ChunkTag::Bytes => store(
                &mut instruction_bytes,
                &frame,
                &child,
                decode_counted_bytes(&child)?.to_vec(),
            )?,
            ChunkTag::Init => store(&mut initial_state, &frame, &child, decode_cpu_state(&child)?)?,
            ChunkTag::Final => store(&mut final_state, &frame, &child, decode_cpu_state(&child)?)?,
            ChunkTag::Cycles => store(&mut cycles, &frame, &child, decode_cycles(&child)?)?,
            ChunkTag::Hash => store(&mut hash, &frame, &child, decode_hash(&child)?)?,
            other => skip(&frame, &child, other),
        }
    }

    Ok(TestRecord {
        index,
        name: require(name, &frame, ChunkTag::Name)?,
        instruction_bytes: require(instruction_bytes, &frame, ChunkTag::Bytes)?,
        initial_state: require(initial_state, &frame, ChunkTag::Init)?,
        final_state: require(final_state, &frame, ChunkTag::Final)?,
        cycles: require(cycles, &frame, ChunkTag::Cycles)?,
        hash,
    })
}

/// INIT / FINA
fn decode_cpu_state(frame: &Frame<'_>) -> Result<CpuState, FormatError> {
    let mut registers = None;
    let mut ram = None;
    let mut queue = None;

    for child in frame.children() {
        let child = child?;
        match child.tag {
            ChunkTag::Regs => store(&mut registers, frame, &child, decode_registers(&child)?)?,
            ChunkTag::Ram => store(&mut ram, frame, &child, decode_ram(&child)?)?,
            ChunkTag::Queue => store(
                &mut queue,
                frame,
                &child,
                decode_counted_bytes(&child)?.to_vec(),
            )?,
            other => skip(frame, &child, other),
        }
    }

    Ok(CpuState {
        registers: require(registers, frame, ChunkTag::Regs)?,
        ram: require(ram, frame, ChunkTag::Ram)?,
        queue: require(queue, frame, ChunkTag::Queue)?,
    })
}

// =============================================================================
// Helpers
// =============================================================================

/// Fill a required-once slot, rejecting repeats
fn store<T>(
    slot: &mut Option<T>,
    parent: &Frame<'_>,
    child: &Frame<'_>,
    value: T,
) -> Result<(), FormatError> {
    if slot.is_some() {
        return Err(FormatError::new(
            child.offset,
            FormatErrorKind::DuplicateChunk {
                parent: parent.tag,
                tag: child.tag,
            },
        ));
    }
    *slot = Some(value);
    Ok(())
}

fn require<T>(slot: Option<T>, parent: &Frame<'_>, missing: ChunkTag) -> Result<T, FormatError> {
    slot.ok_or_else(|| {
        FormatError::new(
            parent.offset,
            FormatErrorKind::MissingChunk {
                parent: parent.tag,
                missing,
            },
        )
    })
}

/// Chunks not defined for this parent are skipped using their length
fn skip(parent: &Frame<'_>, child: &Frame<'_>, tag: ChunkTag) {
    tracing::trace!(
        "Skipping {} chunk ({} bytes) in {} at {:#x}",
        tag,
        child.payload.len(),
        parent.tag,
        child.offset
    );
}
