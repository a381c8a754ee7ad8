//! MOO: binary container format for CPU instruction test suites
//!
//! A MOO file carries the same information as a JSON single-step test corpus
//! (one object per executed instruction: initial state, final state and a
//! per-bus-cycle trace) in a nested, tagged, length-prefixed chunk layout that
//! loads without any text parsing.
//!
//! # Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ "MOO " len=12  version:u32  test_count:u32  cpu:[u8; 4]  │
//! ├──────────────────────────────────────────────────────────┤
//! │ "TEST" len     index:u32                                 │
//! │   ├── "NAME"   len:u32 + UTF-8 disassembly               │
//! │   ├── "BYTS"   len:u32 + instruction bytes               │
//! │   ├── "INIT"   ─┬─ "REGS"  bitmask:u16 + values:u16[]    │
//! │   │             ├─ "RAM "  count:u32 + (addr:u32, u8)[]  │
//! │   │             └─ "QUEU"  count:u32 + bytes             │
//! │   ├── "FINA"   (same as INIT)                            │
//! │   ├── "CYCL"   count:u32 + 15-byte cycle records         │
//! │   └── "HASH"   16 raw bytes (optional)                   │
//! ├──────────────────────────────────────────────────────────┤
//! │ "TEST" ...  (test_count times)                           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Every chunk is `tag (4 ASCII bytes) | length (u32 LE) | payload`. All
//! integers are little-endian. Readers skip chunks with unknown tags, so new
//! chunk kinds can be added without breaking existing consumers.
//!
//! # Usage
//!
//! ```
//! use moo_format::{MooWriter, TestRecord, decode_document};
//!
//! let record = TestRecord {
//!     name: "nop".into(),
//!     instruction_bytes: vec![0x90],
//!     ..Default::default()
//! };
//!
//! let bytes = MooWriter::new("8088")?.encode(std::slice::from_ref(&record))?;
//! let document = decode_document(&bytes)?;
//!
//! assert_eq!(document.header.cpu_name.to_string(), "8088");
//! assert_eq!(document.tests, vec![record]);
//! # Ok::<(), moo_format::MooError>(())
//! ```

mod chunk;
mod codec;
mod error;
mod fields;
mod reader;
mod source;
mod tables;
mod types;
mod writer;

pub use chunk::{ChunkTag, Frame, Frames, FRAME_HEADER_LEN, read_frame, write_frame, write_frame_with};
pub use codec::{ByteCursor, FLAG_FILLER, pack_flags, unpack_flags};
pub use error::{ConfigError, FormatError, FormatErrorKind, MooError, SourceErrorKind};
pub use fields::{decode_cycle, encode_cycle};
pub use reader::{MooReader, decode_document};
pub use source::{
    SourceCode, SourceCycle, SourceOptions, SourcePins, SourceState, SourceTest, SourceWarning,
    SourceWarningKind, normalize_test, normalize_tests, parse_source_tests, read_source_tests,
    to_source_test,
};
pub use tables::{BusStatus, QueueOp, Segment, TState};
pub use types::{
    BusFlags, CpuName, CpuState, CycleEntry, MooDocument, MooHeader, RamEntry, Register,
    RegisterFile, StateRole, TestRecord,
};
pub use writer::{MooWriter, encode_document, encode_header, encode_test};

// =============================================================================
// Constants
// =============================================================================

/// Format version written by this crate and accepted by the reader
pub const MOO_VERSION: u32 = 1;

/// Width of the CPU name field in the `MOO ` header
pub const CPU_NAME_LEN: usize = 4;

/// Size of the `MOO ` header payload (version + test count + CPU name)
pub const HEADER_PAYLOAD_LEN: usize = 12;

/// Size of a decoded test hash
pub const HASH_LEN: usize = 16;

/// Size of one encoded cycle record
pub const CYCLE_RECORD_LEN: usize = 15;

/// Number of registers in the fixed register order
pub const REGISTER_COUNT: usize = 14;
