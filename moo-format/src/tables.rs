//! Enumerated cycle fields and their code tables
//!
//! Each table maps a short text code (as found in the JSON corpus) to the
//! byte stored in a cycle record. Unrecognized codes are not an error: they
//! resolve to the table's fallback value, and so do out-of-range bytes met
//! while decoding.

use core::fmt;

macro_rules! code_table {
    (
        $(#[$meta:meta])*
        pub enum $name:ident (fallback = $fallback:ident) {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:literal => $code:literal $(| $alias:literal)*
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant = $value,
            )+
        }

        impl $name {
            /// Value substituted for unrecognized codes and bytes
            pub const FALLBACK: Self = Self::$fallback;

            /// Every variant in byte order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Look up a text code, falling back on anything unrecognized
            pub fn from_code(code: &str) -> Self {
                match code {
                    $($code $(| $alias)* => Self::$variant,)+
                    _ => Self::FALLBACK,
                }
            }

            /// Canonical text code
            pub const fn code(self) -> &'static str {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            pub const fn to_byte(self) -> u8 {
                self as u8
            }

            /// Decode a stored byte, falling back on out-of-range values
            pub const fn from_byte(byte: u8) -> Self {
                match byte {
                    $($value => Self::$variant,)+
                    _ => Self::FALLBACK,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::FALLBACK
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.code())
            }
        }
    };
}

code_table! {
    /// Segment register driving the current bus cycle
    pub enum Segment (fallback = Unknown) {
        Es = 0 => "ES",
        Ss = 1 => "SS",
        Cs = 2 => "CS",
        Ds = 3 => "DS",
        /// No segment / unknown
        Unknown = 4 => "--",
    }
}

code_table! {
    /// Bus status lines (S0-S2) decoded to a bus cycle type
    pub enum BusStatus (fallback = Passive) {
        InterruptAck = 0 => "INTA",
        IoRead = 1 => "IOR",
        IoWrite = 2 => "IOW",
        MemoryRead = 3 => "MEMR",
        MemoryWrite = 4 => "MEMW",
        Halt = 5 => "HALT",
        Code = 6 => "CODE",
        Passive = 7 => "PASV",
    }
}

code_table! {
    /// Bus T-state of a cycle
    pub enum TState (fallback = Ti) {
        Ti = 0 => "Ti",
        T1 = 1 => "T1",
        T2 = 2 => "T2",
        T3 = 3 => "T3",
        T4 = 4 => "T4",
    }
}

code_table! {
    /// Prefetch queue operation reported by the QS0/QS1 status lines
    pub enum QueueOp (fallback = Idle) {
        Idle = 0 => "-" | "none",
        /// A byte was fetched from the queue
        Fetch = 1 => "F" | "fetch",
        /// Queue was emptied
        Empty = 2 => "E" | "empty",
        /// Queue operation suppressed
        Suppress = 3 => "S" | "suppress",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_match_table_order() {
        for (i, segment) in Segment::ALL.iter().enumerate() {
            assert_eq!(segment.to_byte() as usize, i);
            assert_eq!(Segment::from_byte(i as u8), *segment);
        }
        for (i, status) in BusStatus::ALL.iter().enumerate() {
            assert_eq!(status.to_byte() as usize, i);
        }
        assert_eq!(TState::ALL.len(), 5);
        assert_eq!(QueueOp::ALL.len(), 4);
    }

    #[test]
    fn test_code_lookup() {
        assert_eq!(Segment::from_code("CS"), Segment::Cs);
        assert_eq!(BusStatus::from_code("MEMW"), BusStatus::MemoryWrite);
        assert_eq!(TState::from_code("T3"), TState::T3);
        assert_eq!(QueueOp::from_code("F"), QueueOp::Fetch);
        assert_eq!(QueueOp::from_code("fetch"), QueueOp::Fetch);
        assert_eq!(QueueOp::from_code("suppress"), QueueOp::Suppress);
        assert_eq!(QueueOp::from_code("E"), QueueOp::Empty);
        assert_eq!(QueueOp::Empty.to_byte(), 2);
    }

    #[test]
    fn test_unknown_codes_fall_back() {
        assert_eq!(Segment::from_code("ZZ").to_byte(), 4);
        assert_eq!(Segment::from_code("ZZ"), Segment::from_code("--"));
        assert_eq!(BusStatus::from_code("BOGUS").to_byte(), 7);
        assert_eq!(TState::from_code("T9").to_byte(), 0);
        assert_eq!(QueueOp::from_code("?").to_byte(), 0);
        // Codes are case sensitive
        assert_eq!(Segment::from_code("cs"), Segment::Unknown);
    }

    #[test]
    fn test_out_of_range_bytes_fall_back() {
        assert_eq!(Segment::from_byte(5), Segment::Unknown);
        assert_eq!(BusStatus::from_byte(0xFF), BusStatus::Passive);
        assert_eq!(TState::from_byte(9), TState::Ti);
        assert_eq!(QueueOp::from_byte(4), QueueOp::Idle);
    }

    #[test]
    fn test_codes_round_trip() {
        for status in BusStatus::ALL {
            assert_eq!(BusStatus::from_code(status.code()), *status);
        }
        for op in QueueOp::ALL {
            assert_eq!(QueueOp::from_code(&op.to_string()), *op);
        }
    }
}
