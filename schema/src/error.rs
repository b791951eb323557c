use thiserror::Error;

/// Errors raised while reading polyglot-encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("unexpected end of buffer at offset {offset}: needed {needed} more byte(s)")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
    },

    #[error("invalid boolean byte {value:#04x} at offset {offset}")]
    InvalidBool {
        offset: usize,
        value:  u8,
    },

    #[error("varint at offset {offset} overflows {bits} bits")]
    VarintOverflow {
        offset: usize,
        bits:   u8,
    },

    #[error("string at offset {offset} is not valid UTF-8")]
    InvalidUtf8 {
        offset: usize,
    },

    #[error("message at offset {offset} is nested deeper than {limit} levels")]
    RecursionLimit {
        offset: usize,
        limit:  usize,
    },

    #[error("length {len} at offset {offset} exceeds the {remaining} remaining byte(s)")]
    LengthOutOfBounds {
        offset:    usize,
        len:       u64,
        remaining: usize,
    },
}
