//! MOO document builder

use std::io::Write;

use rayon::prelude::*;

use crate::chunk::{ChunkTag, write_frame, write_frame_with};
use crate::codec::{len_u32, write_u32};
use crate::error::MooError;
use crate::fields::{
    encode_cycles, encode_instruction_bytes, encode_name, encode_queue, encode_ram,
    encode_registers,
};
use crate::types::{CpuName, CpuState, MooHeader, StateRole, TestRecord};
use crate::HEADER_PAYLOAD_LEN;

/// Builds MOO documents for one CPU
///
/// ```
/// use moo_format::{MooWriter, TestRecord};
///
/// let writer = MooWriter::new("i86")?;
/// let bytes = writer.encode(&[TestRecord::default()])?;
/// assert_eq!(&bytes[0..4], b"MOO ");
/// assert_eq!(&bytes[16..20], b"i86 ");
/// # Ok::<(), moo_format::MooError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MooWriter {
    cpu_name: CpuName,
    parallel: bool,
}

impl MooWriter {
    /// Create a writer, validating the CPU name (at most 4 ASCII characters)
    pub fn new(cpu_name: &str) -> Result<Self, MooError> {
        Ok(Self {
            cpu_name: CpuName::new(cpu_name)?,
            parallel: false,
        })
    }

    /// Encode tests on the rayon thread pool
    ///
    /// Output is byte-identical to the sequential encoder.
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    pub fn cpu_name(&self) -> CpuName {
        self.cpu_name
    }

    /// Encode a complete document into memory
    pub fn encode(&self, tests: &[TestRecord]) -> Result<Vec<u8>, MooError> {
        let header = self.header_for(tests)?;
        let mut out = Vec::new();
        encode_header(&mut out, &header);

        if self.parallel {
            for chunk in encode_tests_parallel(tests)? {
                out.extend_from_slice(&chunk);
            }
        } else {
            for test in tests {
                encode_test(&mut out, test)?;
            }
        }

        tracing::debug!(
            "Encoded {} tests for {} ({} bytes)",
            tests.len(),
            self.cpu_name,
            out.len()
        );
        Ok(out)
    }

    /// Stream a document to `w`
    ///
    /// Each TEST chunk is completely encoded before any of it is written.
    pub fn write<W: Write>(&self, w: &mut W, tests: &[TestRecord]) -> Result<(), MooError> {
        let header = self.header_for(tests)?;
        let mut buf = Vec::with_capacity(HEADER_PAYLOAD_LEN + 8);
        encode_header(&mut buf, &header);
        w.write_all(&buf)?;

        if self.parallel {
            for chunk in encode_tests_parallel(tests)? {
                w.write_all(&chunk)?;
            }
        } else {
            for test in tests {
                buf.clear();
                encode_test(&mut buf, test)?;
                w.write_all(&buf)?;
            }
        }
        Ok(())
    }

    fn header_for(&self, tests: &[TestRecord]) -> Result<MooHeader, MooError> {
        let test_count = len_u32(tests.len(), "test count")?;
        Ok(MooHeader::new(test_count, self.cpu_name))
    }
}

/// Encode a document with the sequential builder
pub fn encode_document(cpu_name: &str, tests: &[TestRecord]) -> Result<Vec<u8>, MooError> {
    MooWriter::new(cpu_name)?.encode(tests)
}

/// Append the `MOO ` header chunk
pub fn encode_header(out: &mut Vec<u8>, header: &MooHeader) {
    out.extend_from_slice(&ChunkTag::Moo.to_bytes());
    write_u32(out, HEADER_PAYLOAD_LEN as u32);
    write_u32(out, header.version);
    write_u32(out, header.test_count);
    out.extend_from_slice(header.cpu_name.as_bytes());
}

/// Append one complete `TEST` chunk
///
/// On error `out` is left unchanged.
pub fn encode_test(out: &mut Vec<u8>, test: &TestRecord) -> Result<(), MooError> {
    write_frame_with(out, ChunkTag::Test, |out| {
        write_u32(out, test.index);
        write_frame_with(out, ChunkTag::Name, |out| encode_name(out, &test.name))?;
        write_frame_with(out, ChunkTag::Bytes, |out| {
            encode_instruction_bytes(out, &test.instruction_bytes)
        })?;
        encode_cpu_state(out, StateRole::Initial, &test.initial_state)?;
        encode_cpu_state(out, StateRole::Final, &test.final_state)?;
        write_frame_with(out, ChunkTag::Cycles, |out| encode_cycles(out, &test.cycles))?;
        if let Some(hash) = &test.hash {
            write_frame(out, ChunkTag::Hash, hash)?;
        }
        Ok(())
    })
}

/// INIT/FINA: REGS, RAM and QUEU, always in that order
fn encode_cpu_state(out: &mut Vec<u8>, role: StateRole, state: &CpuState) -> Result<(), MooError> {
    write_frame_with(out, role.tag(), |out| {
        write_frame_with(out, ChunkTag::Regs, |out| {
            encode_registers(out, &state.registers);
            Ok(())
        })?;
        write_frame_with(out, ChunkTag::Ram, |out| encode_ram(out, &state.ram))?;
        write_frame_with(out, ChunkTag::Queue, |out| encode_queue(out, &state.queue))
    })
}

/// One buffer per test, in input order
fn encode_tests_parallel(tests: &[TestRecord]) -> Result<Vec<Vec<u8>>, MooError> {
    tests
        .par_iter()
        .map(|test| {
            let mut buf = Vec::new();
            encode_test(&mut buf, test)?;
            Ok(buf)
        })
        .collect()
}
