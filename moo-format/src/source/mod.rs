//! JSON test corpus model and normalization into [`TestRecord`]s
//!
//! The corpus is a JSON array of objects:
//!
//! ```json
//! {
//!   "idx": 0,
//!   "name": "add ax, bx",
//!   "bytes": [1, 216],
//!   "initial": { "regs": { "ax": 1, "bx": 2 }, "ram": [[256, 1]], "queue": [] },
//!   "final":   { "regs": { "ax": 3 }, "ram": [], "queue": [] },
//!   "cycles":  [[1, 256, "CS", "R--", "---", 0, 1, "CODE", "T1", "F", 1]],
//!   "hash": "00112233445566778899aabbccddeeff"
//! }
//! ```
//!
//! Normalization is forgiving about per-test state: a malformed `initial` or
//! `final` object, or a malformed RAM entry, produces a [`SourceWarning`] and
//! a documented default instead of failing the whole suite.

use core::fmt;
use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::HASH_LEN;
use crate::codec::pack_flags;
use crate::error::{MooError, SourceErrorKind};
use crate::tables::{BusStatus, QueueOp, Segment, TState};
use crate::types::{BusFlags, CpuState, CycleEntry, RamEntry, Register, StateRole, TestRecord};

// =============================================================================
// Serde model
// =============================================================================

/// One test object as stored in the JSON corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceTest {
    #[serde(default)]
    pub idx: u32,
    pub name: String,
    #[serde(default)]
    pub bytes: Vec<u8>,
    /// Kept untyped so a malformed state can be reported instead of failing
    /// the whole file
    #[serde(default)]
    pub initial: Value,
    #[serde(default)]
    pub r#final: Value,
    #[serde(default)]
    pub cycles: Vec<SourceCycle>,
    /// Hex digest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// Well-formed contents of an `initial` / `final` object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceState {
    #[serde(default)]
    pub regs: BTreeMap<String, u16>,
    /// `[address, value]` pairs, validated one by one
    #[serde(default)]
    pub ram: Vec<Value>,
    #[serde(default)]
    pub queue: Vec<u8>,
}

/// 11-element cycle array
///
/// `[pins, address, segment, memory, io, bhe, data, bus, t_state, queue_op,
/// queue_byte]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCycle(
    pub SourcePins,
    pub u32,
    pub SourceCode,
    pub SourceCode,
    pub SourceCode,
    pub u8,
    pub u16,
    pub SourceCode,
    pub SourceCode,
    pub SourceCode,
    pub u8,
);

/// Text code column of a cycle
///
/// Anything that is not a string (`null`, a number) is kept as-is and
/// resolves to the column's fallback during normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceCode {
    Code(String),
    Other(Value),
}

impl SourceCode {
    /// The code text, if this column holds a string
    pub fn as_code(&self) -> Option<&str> {
        match self {
            SourceCode::Code(code) => Some(code),
            SourceCode::Other(_) => None,
        }
    }
}

impl From<&str> for SourceCode {
    fn from(code: &str) -> Self {
        SourceCode::Code(code.to_string())
    }
}

impl PartialEq<&str> for SourceCode {
    fn eq(&self, other: &&str) -> bool {
        self.as_code() == Some(*other)
    }
}

/// Pin status column: a packed integer, or a 3-character flag string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourcePins {
    Bits(u8),
    Flags(String),
}

impl SourcePins {
    pub fn bits(&self) -> u8 {
        match self {
            SourcePins::Bits(bits) => *bits,
            SourcePins::Flags(flags) => pack_flags(flags),
        }
    }
}

// =============================================================================
// Options and warnings
// =============================================================================

/// Normalization settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceOptions {
    /// Reject register names outside the fixed set instead of dropping them
    pub strict_registers: bool,
}

/// Non-fatal problem found while normalizing one test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceWarning {
    /// `idx` of the offending test
    pub index: u32,
    pub kind: SourceWarningKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceWarningKind {
    /// State is not an object of the expected shape; an empty state was used
    MalformedState { role: StateRole },
    /// Register name outside the fixed set; the value was dropped
    UnknownRegister { role: StateRole, name: String },
    /// RAM entry that is not an `[address, byte]` pair; the entry was skipped
    MalformedRamEntry { role: StateRole, position: usize },
}

impl fmt::Display for SourceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "test {}: ", self.index)?;
        match &self.kind {
            SourceWarningKind::MalformedState { role } => {
                write!(f, "'{role}' state is malformed, using an empty state")
            }
            SourceWarningKind::UnknownRegister { role, name } => {
                write!(f, "dropping unknown register '{name}' in '{role}' state")
            }
            SourceWarningKind::MalformedRamEntry { role, position } => {
                write!(f, "skipping malformed ram entry #{position} in '{role}' state")
            }
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Parse a JSON array of tests
pub fn parse_source_tests(json: &str) -> Result<Vec<SourceTest>, MooError> {
    Ok(serde_json::from_str(json)?)
}

/// Read a JSON array of tests
pub fn read_source_tests<R: Read>(reader: R) -> Result<Vec<SourceTest>, MooError> {
    Ok(serde_json::from_reader(reader)?)
}

// =============================================================================
// Normalization
// =============================================================================

/// Convert one corpus test into a [`TestRecord`]
///
/// Unrecognized or non-string enumerated codes take their table's fallback
/// value. Fails on an invalid hash or, with `strict_registers`, an unknown
/// register name.
pub fn normalize_test(
    test: &SourceTest,
    options: &SourceOptions,
) -> Result<(TestRecord, Vec<SourceWarning>), MooError> {
    let mut warnings = Vec::new();
    let mut normalizer = Normalizer {
        index: test.idx,
        options,
        warnings: &mut warnings,
    };

    let initial_state = normalizer.state(StateRole::Initial, &test.initial)?;
    let final_state = normalizer.state(StateRole::Final, &test.r#final)?;
    let hash = test
        .hash
        .as_deref()
        .map(|text| decode_hash_hex(test.idx, text))
        .transpose()?;

    let record = TestRecord {
        index: test.idx,
        name: test.name.clone(),
        instruction_bytes: test.bytes.clone(),
        initial_state,
        final_state,
        cycles: test.cycles.iter().map(normalize_cycle).collect(),
        hash,
    };
    Ok((record, warnings))
}

/// Normalize a whole suite, keeping source order
pub fn normalize_tests(
    tests: &[SourceTest],
    options: &SourceOptions,
) -> Result<(Vec<TestRecord>, Vec<SourceWarning>), MooError> {
    let mut records = Vec::with_capacity(tests.len());
    let mut warnings = Vec::new();
    for test in tests {
        let (record, test_warnings) = normalize_test(test, options)?;
        records.push(record);
        warnings.extend(test_warnings);
    }
    tracing::debug!(
        "Normalized {} tests ({} warnings)",
        records.len(),
        warnings.len()
    );
    Ok((records, warnings))
}

struct Normalizer<'a> {
    index: u32,
    options: &'a SourceOptions,
    warnings: &'a mut Vec<SourceWarning>,
}

impl Normalizer<'_> {
    fn warn(&mut self, kind: SourceWarningKind) {
        self.warnings.push(SourceWarning {
            index: self.index,
            kind,
        });
    }

    fn state(&mut self, role: StateRole, value: &Value) -> Result<CpuState, MooError> {
        let source = match value {
            Value::Object(_) => SourceState::deserialize(value).ok(),
            _ => None,
        };
        let Some(source) = source else {
            self.warn(SourceWarningKind::MalformedState { role });
            return Ok(CpuState::default());
        };

        let mut state = CpuState {
            queue: source.queue,
            ..Default::default()
        };

        for (name, &value) in &source.regs {
            match Register::from_name(name) {
                Some(reg) => {
                    state.registers.set(reg, value);
                }
                None if self.options.strict_registers => {
                    return Err(MooError::Source {
                        index: self.index,
                        kind: SourceErrorKind::UnknownRegister(name.clone()),
                    });
                }
                None => self.warn(SourceWarningKind::UnknownRegister {
                    role,
                    name: name.clone(),
                }),
            }
        }

        for (position, entry) in source.ram.iter().enumerate() {
            match <(u32, u8)>::deserialize(entry) {
                Ok((address, value)) => state.ram.push(RamEntry::new(address, value)),
                Err(_) => self.warn(SourceWarningKind::MalformedRamEntry { role, position }),
            }
        }

        Ok(state)
    }
}

fn normalize_cycle(cycle: &SourceCycle) -> CycleEntry {
    CycleEntry {
        pins: cycle.0.bits(),
        address: cycle.1,
        segment: cycle.2.as_code().map_or(Segment::FALLBACK, Segment::from_code),
        memory: cycle.3.as_code().map_or(BusFlags::default(), BusFlags::parse),
        io: cycle.4.as_code().map_or(BusFlags::default(), BusFlags::parse),
        bhe: cycle.5,
        data: cycle.6,
        bus: cycle.7.as_code().map_or(BusStatus::FALLBACK, BusStatus::from_code),
        t_state: cycle.8.as_code().map_or(TState::FALLBACK, TState::from_code),
        queue_op: cycle.9.as_code().map_or(QueueOp::FALLBACK, QueueOp::from_code),
        queue_byte: cycle.10,
    }
}

fn decode_hash_hex(index: u32, text: &str) -> Result<[u8; HASH_LEN], MooError> {
    let mut hash = [0u8; HASH_LEN];
    hex::decode_to_slice(text, &mut hash).map_err(|_| MooError::Source {
        index,
        kind: SourceErrorKind::InvalidHash(text.to_string()),
    })?;
    Ok(hash)
}

// =============================================================================
// Export
// =============================================================================

/// Render a record back into corpus form
///
/// Enumerated fields use their canonical codes and pins are written as an
/// integer.
pub fn to_source_test(record: &TestRecord) -> SourceTest {
    SourceTest {
        idx: record.index,
        name: record.name.clone(),
        bytes: record.instruction_bytes.clone(),
        initial: state_to_value(&record.initial_state),
        r#final: state_to_value(&record.final_state),
        cycles: record.cycles.iter().map(cycle_to_source).collect(),
        hash: record.hash.map(hex::encode),
    }
}

fn state_to_value(state: &CpuState) -> Value {
    let regs: Map<String, Value> = state
        .registers
        .iter()
        .map(|(reg, value)| (reg.name().to_string(), Value::from(value)))
        .collect();
    let ram: Vec<Value> = state
        .ram
        .iter()
        .map(|entry| json!([entry.address, entry.value]))
        .collect();
    json!({
        "regs": regs,
        "ram": ram,
        "queue": state.queue,
    })
}

fn cycle_to_source(cycle: &CycleEntry) -> SourceCycle {
    SourceCycle(
        SourcePins::Bits(cycle.pins),
        cycle.address,
        cycle.segment.code().into(),
        SourceCode::Code(cycle.memory.to_string()),
        SourceCode::Code(cycle.io.to_string()),
        cycle.bhe,
        cycle.data,
        cycle.bus.code().into(),
        cycle.t_state.code().into(),
        cycle.queue_op.code().into(),
        cycle.queue_byte,
    )
}

#[cfg(test)]
mod tests;
