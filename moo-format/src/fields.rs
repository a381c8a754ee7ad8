//! Leaf chunk payload encoders and decoders
//!
//! Encoders append a payload (without its frame header) to a buffer.
//! Decoders take the whole frame and require its declared length to match
//! exactly what the contents need.

use crate::chunk::Frame;
use crate::codec::{ByteCursor, len_u32, write_counted_bytes, write_u8, write_u16, write_u32};
use crate::error::{FormatError, FormatErrorKind, MooError};
use crate::tables::{BusStatus, QueueOp, Segment, TState};
use crate::types::{BusFlags, CycleEntry, RamEntry, Register, RegisterFile};
use crate::{CYCLE_RECORD_LEN, HASH_LEN};

/// Size of one RAM entry (u32 address + u8 value)
const RAM_ENTRY_LEN: u64 = 5;

/// Size of a u32 count prefix
const COUNT_LEN: u64 = 4;

// =============================================================================
// REGS
// =============================================================================

pub(crate) fn encode_registers(out: &mut Vec<u8>, regs: &RegisterFile) {
    write_u16(out, regs.bitmask());
    for (_, value) in regs.iter() {
        write_u16(out, value);
    }
}

/// Bits above the last register are ignored.
pub(crate) fn decode_registers(frame: &Frame<'_>) -> Result<RegisterFile, FormatError> {
    if frame.payload.len() < 2 {
        frame.expect_len(2)?;
    }
    let mut cursor = frame.cursor();
    let mask = cursor.read_u16("register bitmask")?;

    let present: Vec<Register> = Register::ALL
        .into_iter()
        .filter(|reg| mask & reg.bit() != 0)
        .collect();
    frame.expect_len(2 + 2 * present.len() as u64)?;

    let mut regs = RegisterFile::new();
    for reg in present {
        regs.set(reg, cursor.read_u16("register value")?);
    }
    Ok(regs)
}

// =============================================================================
// RAM / QUEU / BYTS / NAME
// =============================================================================

pub(crate) fn encode_ram(out: &mut Vec<u8>, ram: &[RamEntry]) -> Result<(), MooError> {
    write_u32(out, len_u32(ram.len(), "ram")?);
    out.reserve(ram.len() * RAM_ENTRY_LEN as usize);
    for entry in ram {
        write_u32(out, entry.address);
        write_u8(out, entry.value);
    }
    Ok(())
}

pub(crate) fn decode_ram(frame: &Frame<'_>) -> Result<Vec<RamEntry>, FormatError> {
    let (mut cursor, count) = read_count(frame, RAM_ENTRY_LEN)?;
    let mut ram = Vec::with_capacity(count);
    for _ in 0..count {
        let address = cursor.read_u32("ram address")?;
        let value = cursor.read_u8("ram value")?;
        ram.push(RamEntry { address, value });
    }
    Ok(ram)
}

pub(crate) fn encode_queue(out: &mut Vec<u8>, queue: &[u8]) -> Result<(), MooError> {
    write_counted_bytes(out, queue, "queue")
}

pub(crate) fn encode_instruction_bytes(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), MooError> {
    write_counted_bytes(out, bytes, "instruction bytes")
}

pub(crate) fn encode_name(out: &mut Vec<u8>, name: &str) -> Result<(), MooError> {
    write_counted_bytes(out, name.as_bytes(), "name")
}

/// Decode a `u32 count + bytes` payload (QUEU, BYTS, NAME)
pub(crate) fn decode_counted_bytes<'a>(frame: &Frame<'a>) -> Result<&'a [u8], FormatError> {
    let (mut cursor, count) = read_count(frame, 1)?;
    cursor.read_bytes(count, "byte list")
}

pub(crate) fn decode_name(frame: &Frame<'_>) -> Result<String, FormatError> {
    let bytes = decode_counted_bytes(frame)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|_| FormatError::new(frame.offset, FormatErrorKind::InvalidUtf8))
}

// =============================================================================
// HASH
// =============================================================================

pub(crate) fn decode_hash(frame: &Frame<'_>) -> Result<[u8; HASH_LEN], FormatError> {
    frame.expect_len(HASH_LEN as u64)?;
    frame.cursor().read_array("hash")
}

// =============================================================================
// CYCL
// =============================================================================

/// Append one fixed 15-byte cycle record
pub fn encode_cycle(out: &mut Vec<u8>, cycle: &CycleEntry) {
    write_u8(out, cycle.pins);
    write_u32(out, cycle.address);
    write_u8(out, cycle.segment.to_byte());
    write_u8(out, cycle.memory.bits());
    write_u8(out, cycle.io.bits());
    write_u8(out, cycle.bhe);
    write_u16(out, cycle.data);
    write_u8(out, cycle.bus.to_byte());
    write_u8(out, cycle.t_state.to_byte());
    write_u8(out, cycle.queue_op.to_byte());
    write_u8(out, cycle.queue_byte);
}

/// Decode one fixed 15-byte cycle record
pub fn decode_cycle(record: &[u8; CYCLE_RECORD_LEN]) -> CycleEntry {
    let u32_at = |i: usize| u32::from_le_bytes([record[i], record[i + 1], record[i + 2], record[i + 3]]);
    CycleEntry {
        pins: record[0],
        address: u32_at(1),
        segment: Segment::from_byte(record[5]),
        memory: BusFlags::from_bits(record[6]),
        io: BusFlags::from_bits(record[7]),
        bhe: record[8],
        data: u16::from_le_bytes([record[9], record[10]]),
        bus: BusStatus::from_byte(record[11]),
        t_state: TState::from_byte(record[12]),
        queue_op: QueueOp::from_byte(record[13]),
        queue_byte: record[14],
    }
}

pub(crate) fn encode_cycles(out: &mut Vec<u8>, cycles: &[CycleEntry]) -> Result<(), MooError> {
    write_u32(out, len_u32(cycles.len(), "cycles")?);
    out.reserve(cycles.len() * CYCLE_RECORD_LEN);
    for cycle in cycles {
        encode_cycle(out, cycle);
    }
    Ok(())
}

pub(crate) fn decode_cycles(frame: &Frame<'_>) -> Result<Vec<CycleEntry>, FormatError> {
    let (mut cursor, count) = read_count(frame, CYCLE_RECORD_LEN as u64)?;
    let mut cycles = Vec::with_capacity(count);
    for _ in 0..count {
        cycles.push(decode_cycle(&cursor.read_array("cycle record")?));
    }
    Ok(cycles)
}

// =============================================================================
// Helpers
// =============================================================================

/// Read a leading u32 count and check the payload holds exactly
/// `count` items of `item_len` bytes after it
fn read_count<'a>(frame: &Frame<'a>, item_len: u64) -> Result<(ByteCursor<'a>, usize), FormatError> {
    if (frame.payload.len() as u64) < COUNT_LEN {
        frame.expect_len(COUNT_LEN)?;
    }
    let mut cursor = frame.cursor();
    let count = cursor.read_u32("item count")?;
    frame.expect_len(COUNT_LEN + u64::from(count) * item_len)?;
    Ok((cursor, count as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::{ChunkTag, read_frame, write_frame};

    fn frame_of(tag: ChunkTag, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        write_frame(&mut out, tag, payload).unwrap();
        out
    }

    fn sample_cycle() -> CycleEntry {
        CycleEntry {
            pins: 0b001,
            address: 0x000F_FFF0,
            segment: Segment::Cs,
            memory: BusFlags::parse("R--"),
            io: BusFlags::parse("---"),
            bhe: 1,
            data: 0xBEEF,
            bus: BusStatus::Code,
            t_state: TState::T3,
            queue_op: QueueOp::Fetch,
            queue_byte: 0x90,
        }
    }

    #[test]
    fn test_encode_registers_layout() {
        let regs: RegisterFile = [(Register::Bx, 0x0002), (Register::Ax, 0x0001)]
            .into_iter()
            .collect();
        let mut out = Vec::new();
        encode_registers(&mut out, &regs);
        // bitmask 0b11, then ax, bx in fixed order
        assert_eq!(out, [0x03, 0x00, 0x01, 0x00, 0x02, 0x00]);
    }

    #[test]
    fn test_encode_empty_registers() {
        let mut out = Vec::new();
        encode_registers(&mut out, &RegisterFile::new());
        assert_eq!(out, [0x00, 0x00]);
    }

    #[test]
    fn test_decode_registers() {
        let data = frame_of(ChunkTag::Regs, &[0x01, 0x20, 0x34, 0x12, 0x00, 0x01]);
        let frame = read_frame(&mut ByteCursor::new(&data)).unwrap();
        let regs = decode_registers(&frame).unwrap();

        assert_eq!(regs.len(), 2);
        assert_eq!(regs.get(Register::Ax), Some(0x1234));
        assert_eq!(regs.get(Register::Flags), Some(0x0100));
    }

    #[test]
    fn test_decode_registers_length_mismatch() {
        // Bitmask announces 2 registers but only one value follows
        let data = frame_of(ChunkTag::Regs, &[0x03, 0x00, 0x34, 0x12]);
        let frame = read_frame(&mut ByteCursor::new(&data)).unwrap();
        assert_eq!(
            decode_registers(&frame).unwrap_err().kind,
            FormatErrorKind::LengthMismatch {
                tag: ChunkTag::Regs,
                declared: 4,
                expected: 6,
            }
        );

        let data = frame_of(ChunkTag::Regs, &[0x00]);
        let frame = read_frame(&mut ByteCursor::new(&data)).unwrap();
        assert!(decode_registers(&frame).is_err());
    }

    #[test]
    fn test_ram_keeps_order_and_duplicates() {
        let ram = vec![
            RamEntry::new(0xFFFF0, 0xEA),
            RamEntry::new(0x00010, 0x01),
            RamEntry::new(0xFFFF0, 0x90),
        ];
        let mut payload = Vec::new();
        encode_ram(&mut payload, &ram).unwrap();
        assert_eq!(payload.len(), 4 + 3 * 5);
        assert_eq!(&payload[..9], [3, 0, 0, 0, 0xF0, 0xFF, 0x0F, 0x00, 0xEA]);

        let data = frame_of(ChunkTag::Ram, &payload);
        let frame = read_frame(&mut ByteCursor::new(&data)).unwrap();
        assert_eq!(decode_ram(&frame).unwrap(), ram);
    }

    #[test]
    fn test_ram_count_mismatch() {
        let mut payload = Vec::new();
        encode_ram(&mut payload, &[RamEntry::new(1, 2)]).unwrap();
        payload.push(0); // stray byte

        let data = frame_of(ChunkTag::Ram, &payload);
        let frame = read_frame(&mut ByteCursor::new(&data)).unwrap();
        assert_eq!(
            decode_ram(&frame).unwrap_err().kind,
            FormatErrorKind::LengthMismatch {
                tag: ChunkTag::Ram,
                declared: 10,
                expected: 9,
            }
        );
    }

    #[test]
    fn test_huge_count_is_mismatch_not_allocation() {
        let data = frame_of(ChunkTag::Cycles, &[0xFF, 0xFF, 0xFF, 0xFF]);
        let frame = read_frame(&mut ByteCursor::new(&data)).unwrap();
        assert!(matches!(
            decode_cycles(&frame).unwrap_err().kind,
            FormatErrorKind::LengthMismatch { .. }
        ));
    }

    #[test]
    fn test_counted_bytes() {
        let mut payload = Vec::new();
        encode_name(&mut payload, "ADD ax, bx").unwrap();
        assert_eq!(payload.len(), 4 + 10);

        let data = frame_of(ChunkTag::Name, &payload);
        let frame = read_frame(&mut ByteCursor::new(&data)).unwrap();
        assert_eq!(decode_name(&frame).unwrap(), "ADD ax, bx");
    }

    #[test]
    fn test_name_invalid_utf8() {
        let data = frame_of(ChunkTag::Name, &[2, 0, 0, 0, 0xC3, 0x28]);
        let frame = read_frame(&mut ByteCursor::new(&data)).unwrap();
        assert_eq!(
            decode_name(&frame).unwrap_err().kind,
            FormatErrorKind::InvalidUtf8
        );
    }

    #[test]
    fn test_cycle_is_fixed_width() {
        let mut out = Vec::new();
        encode_cycle(&mut out, &sample_cycle());
        assert_eq!(out.len(), CYCLE_RECORD_LEN);
        assert_eq!(
            out,
            [
                0x01, // pins
                0xF0, 0xFF, 0x0F, 0x00, // address
                0x02, // CS
                0b100, // R--
                0b000, // ---
                0x01, // bhe
                0xEF, 0xBE, // data
                0x06, // CODE
                0x03, // T3
                0x01, // F
                0x90, // queue byte
            ]
        );

        let record: [u8; CYCLE_RECORD_LEN] = out.try_into().unwrap();
        assert_eq!(decode_cycle(&record), sample_cycle());
    }

    #[test]
    fn test_cycles_chunk() {
        let cycles = vec![sample_cycle(), CycleEntry::default()];
        let mut payload = Vec::new();
        encode_cycles(&mut payload, &cycles).unwrap();
        assert_eq!(payload.len(), 4 + 2 * CYCLE_RECORD_LEN);

        let data = frame_of(ChunkTag::Cycles, &payload);
        let frame = read_frame(&mut ByteCursor::new(&data)).unwrap();
        assert_eq!(decode_cycles(&frame).unwrap(), cycles);
    }

    #[test]
    fn test_hash_length() {
        let data = frame_of(ChunkTag::Hash, &[0xAB; HASH_LEN]);
        let frame = read_frame(&mut ByteCursor::new(&data)).unwrap();
        assert_eq!(decode_hash(&frame).unwrap(), [0xAB; HASH_LEN]);

        let data = frame_of(ChunkTag::Hash, &[0xAB; 20]);
        let frame = read_frame(&mut ByteCursor::new(&data)).unwrap();
        assert!(decode_hash(&frame).is_err());
    }
}
