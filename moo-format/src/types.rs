//! In-memory test records

use core::fmt;

use crate::chunk::ChunkTag;
use crate::codec::{pack_flags, unpack_flags};
use crate::error::ConfigError;
use crate::tables::{BusStatus, QueueOp, Segment, TState};
use crate::{CPU_NAME_LEN, HASH_LEN, MOO_VERSION, REGISTER_COUNT};

// =============================================================================
// Registers
// =============================================================================

/// CPU register, in the fixed order used by the REGS bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Register {
    Ax,
    Bx,
    Cx,
    Dx,
    Cs,
    Ss,
    Ds,
    Es,
    Sp,
    Bp,
    Si,
    Di,
    Ip,
    Flags,
}

impl Register {
    /// All registers in bitmask order
    pub const ALL: [Register; REGISTER_COUNT] = [
        Register::Ax,
        Register::Bx,
        Register::Cx,
        Register::Dx,
        Register::Cs,
        Register::Ss,
        Register::Ds,
        Register::Es,
        Register::Sp,
        Register::Bp,
        Register::Si,
        Register::Di,
        Register::Ip,
        Register::Flags,
    ];

    /// Lowercase name as used by the JSON corpus
    pub const fn name(self) -> &'static str {
        match self {
            Register::Ax => "ax",
            Register::Bx => "bx",
            Register::Cx => "cx",
            Register::Dx => "dx",
            Register::Cs => "cs",
            Register::Ss => "ss",
            Register::Ds => "ds",
            Register::Es => "es",
            Register::Sp => "sp",
            Register::Bp => "bp",
            Register::Si => "si",
            Register::Di => "di",
            Register::Ip => "ip",
            Register::Flags => "flags",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }

    /// Bitmask bit marking this register as present
    pub const fn bit(self) -> u16 {
        1 << self as u16
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Sparse register bank: any subset of the fixed registers may be present
///
/// An absent register is distinct from a register holding zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RegisterFile {
    values: [Option<u16>; REGISTER_COUNT],
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, reg: Register) -> Option<u16> {
        self.values[reg as usize]
    }

    /// Set a register, returning its previous value
    pub fn set(&mut self, reg: Register, value: u16) -> Option<u16> {
        self.values[reg as usize].replace(value)
    }

    pub fn remove(&mut self, reg: Register) -> Option<u16> {
        self.values[reg as usize].take()
    }

    pub fn contains(&self, reg: Register) -> bool {
        self.get(reg).is_some()
    }

    /// Number of registers present
    pub fn len(&self) -> usize {
        self.values.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(Option::is_none)
    }

    /// Present registers in bitmask order
    pub fn iter(&self) -> impl Iterator<Item = (Register, u16)> + '_ {
        Register::ALL
            .into_iter()
            .filter_map(|reg| self.get(reg).map(|value| (reg, value)))
    }

    /// Presence bitmask (bit i set iff register i is present)
    pub fn bitmask(&self) -> u16 {
        self.iter().fold(0, |mask, (reg, _)| mask | reg.bit())
    }
}

impl FromIterator<(Register, u16)> for RegisterFile {
    fn from_iter<T: IntoIterator<Item = (Register, u16)>>(iter: T) -> Self {
        let mut regs = Self::new();
        for (reg, value) in iter {
            regs.set(reg, value);
        }
        regs
    }
}

// =============================================================================
// CPU state
// =============================================================================

/// One byte of sparse memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RamEntry {
    pub address: u32,
    pub value: u8,
}

impl RamEntry {
    pub const fn new(address: u32, value: u8) -> Self {
        Self { address, value }
    }
}

/// Which snapshot of the CPU a state describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateRole {
    Initial,
    Final,
}

impl StateRole {
    /// Chunk tag wrapping a state with this role
    pub const fn tag(self) -> ChunkTag {
        match self {
            StateRole::Initial => ChunkTag::Init,
            StateRole::Final => ChunkTag::Final,
        }
    }

    /// Key of the state object in the JSON corpus
    pub const fn json_key(self) -> &'static str {
        match self {
            StateRole::Initial => "initial",
            StateRole::Final => "final",
        }
    }
}

impl fmt::Display for StateRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.json_key())
    }
}

/// CPU snapshot before or after a test
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpuState {
    pub registers: RegisterFile,
    /// Sparse memory in source order (unsorted, duplicates kept)
    pub ram: Vec<RamEntry>,
    /// Prefetch queue contents
    pub queue: Vec<u8>,
}

// =============================================================================
// Cycles
// =============================================================================

/// Three status flags packed into the low 3 bits of a byte
///
/// Used for the memory and I/O status columns (read, advanced write, write).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BusFlags(u8);

impl BusFlags {
    /// Letters shown for set bits, most significant first
    pub const LETTERS: [char; 3] = ['R', 'A', 'W'];

    /// Wrap raw bits (only the low 3 are kept)
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0b111)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Parse a 3-character flag string such as `"R--"`
    pub fn parse(flags: &str) -> Self {
        Self(pack_flags(flags))
    }
}

impl fmt::Display for BusFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&unpack_flags(self.0, Self::LETTERS))
    }
}

/// One bus cycle of a test trace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CycleEntry {
    /// Pin status bitfield (ALE and other strobes)
    pub pins: u8,
    /// Address latch value
    pub address: u32,
    pub segment: Segment,
    pub memory: BusFlags,
    pub io: BusFlags,
    /// Bus high enable
    pub bhe: u8,
    pub data: u16,
    pub bus: BusStatus,
    pub t_state: TState,
    pub queue_op: QueueOp,
    /// Byte read from the queue this cycle
    pub queue_byte: u8,
}

// =============================================================================
// Tests and documents
// =============================================================================

/// One executed instruction test
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestRecord {
    /// Position in the source suite (not necessarily contiguous or unique)
    pub index: u32,
    /// Disassembly of the instruction
    pub name: String,
    pub instruction_bytes: Vec<u8>,
    pub initial_state: CpuState,
    pub final_state: CpuState,
    /// Bus cycles in execution order
    pub cycles: Vec<CycleEntry>,
    pub hash: Option<[u8; HASH_LEN]>,
}

impl TestRecord {
    pub fn state(&self, role: StateRole) -> &CpuState {
        match role {
            StateRole::Initial => &self.initial_state,
            StateRole::Final => &self.final_state,
        }
    }
}

/// 4-byte CPU identifier stored in the file header, space padded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CpuName([u8; CPU_NAME_LEN]);

impl CpuName {
    /// Validate and pad a configured CPU name
    ///
    /// Names shorter than 4 characters are right-padded with spaces; longer
    /// or non-ASCII names are rejected.
    pub fn new(name: &str) -> Result<Self, ConfigError> {
        if !name.is_ascii() {
            return Err(ConfigError::CpuNameNotAscii(name.to_string()));
        }
        if name.len() > CPU_NAME_LEN {
            return Err(ConfigError::CpuNameTooLong(name.to_string()));
        }
        let mut bytes = [b' '; CPU_NAME_LEN];
        bytes[..name.len()].copy_from_slice(name.as_bytes());
        Ok(Self(bytes))
    }

    /// Wrap the raw header bytes without validation
    pub const fn from_bytes(bytes: [u8; CPU_NAME_LEN]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; CPU_NAME_LEN] {
        &self.0
    }

    /// Header bytes with the space padding removed
    pub fn trimmed(&self) -> &[u8] {
        let len = self.0.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
        &self.0[..len]
    }
}

impl fmt::Display for CpuName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&String::from_utf8_lossy(self.trimmed()))
    }
}

/// Contents of the `MOO ` header chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MooHeader {
    pub version: u32,
    pub test_count: u32,
    pub cpu_name: CpuName,
}

impl MooHeader {
    /// Header for a document of the current version
    pub fn new(test_count: u32, cpu_name: CpuName) -> Self {
        Self {
            version: MOO_VERSION,
            test_count,
            cpu_name,
        }
    }
}

/// A fully decoded MOO file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MooDocument {
    pub header: MooHeader,
    pub tests: Vec<TestRecord>,
}
