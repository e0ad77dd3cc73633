//! Error types for the DfTx decode pipeline.

use thiserror::Error;

/// Errors raised while decoding the payload of a recognized operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unexpected end of payload at offset {offset}: needed {needed} bytes, {remaining} left")]
    UnexpectedEnd {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("Invalid boolean byte 0x{value:02x} at offset {offset}")]
    InvalidBool { offset: usize, value: u8 },

    #[error("Invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("Length {length} at offset {offset} exceeds the remaining payload")]
    InvalidLength { offset: usize, length: u64 },

    #[error("VARINT overflow at offset {offset}")]
    VarIntOverflow { offset: usize },

    #[error("Opcode '{opcode}' payload: {reason}")]
    InvalidPayload { opcode: char, reason: String },
}

pub type DecodeResult<T> = Result<T, DecodeError>;
