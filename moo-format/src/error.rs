//! MOO encoding and decoding error types

use crate::MOO_VERSION;
use crate::chunk::ChunkTag;

/// Errors produced while building or reading MOO documents
#[derive(Debug, thiserror::Error)]
pub enum MooError {
    /// Invalid conversion settings, detected before any output is produced
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Structurally malformed MOO data
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A source test that cannot be represented in the format
    #[error("test {index}: {kind}")]
    Source { index: u32, kind: SourceErrorKind },

    /// A list or payload longer than its u32 length field can describe
    #[error("{field} length {len} does not fit in a u32 length field")]
    TooLarge { field: &'static str, len: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MooError {
    /// The structural error, if this is a decode failure
    pub fn as_format(&self) -> Option<&FormatError> {
        match self {
            MooError::Format(e) => Some(e),
            _ => None,
        }
    }
}

/// Invalid builder configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("CPU name '{0}' exceeds 4 characters")]
    CpuNameTooLong(String),

    #[error("CPU name '{0}' must be ASCII")]
    CpuNameNotAscii(String),
}

/// Malformed MOO data at a known byte offset
///
/// `offset` is the absolute position (from the start of the buffer) of the
/// chunk or field that failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed MOO data at offset {offset:#x}: {kind}")]
pub struct FormatError {
    pub offset: usize,
    pub kind: FormatErrorKind,
}

impl FormatError {
    pub fn new(offset: usize, kind: FormatErrorKind) -> Self {
        Self { offset, kind }
    }
}

/// Classification of structural decode failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatErrorKind {
    /// Fewer bytes remain than a field or frame declares
    #[error("{context} needs {needed} bytes but only {available} remain")]
    Truncated {
        context: &'static str,
        needed: u64,
        available: u64,
    },

    /// A chunk's declared length disagrees with the size its contents require
    #[error("{tag} chunk declares {declared} bytes but its contents need {expected}")]
    LengthMismatch {
        tag: ChunkTag,
        declared: u64,
        expected: u64,
    },

    /// A required chunk was expected but a different tag was found
    #[error("expected {expected} chunk, found {found}")]
    UnexpectedTag { expected: ChunkTag, found: ChunkTag },

    /// A composite chunk ended without one of its required children
    #[error("{parent} chunk has no {missing} chunk")]
    MissingChunk { parent: ChunkTag, missing: ChunkTag },

    /// A composite chunk contains the same known child more than once
    #[error("{parent} chunk contains more than one {tag} chunk")]
    DuplicateChunk { parent: ChunkTag, tag: ChunkTag },

    #[error("unsupported MOO version {0} (expected {expected})", expected = MOO_VERSION)]
    UnsupportedVersion(u32),

    #[error("NAME chunk is not valid UTF-8")]
    InvalidUtf8,
}

/// Reasons a source test is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceErrorKind {
    /// Register name outside the fixed set (strict mode only)
    #[error("unknown register '{0}'")]
    UnknownRegister(String),

    #[error("hash '{0}' is not a 16-byte hex digest")]
    InvalidHash(String),
}
