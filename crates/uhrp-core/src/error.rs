//! Error types for the UHRP overlay core

use thiserror::Error;

/// Errors produced while decoding a PushDrop locking script
///
/// These are always recoverable: a script that fails to decode is simply
/// not a commitment token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Empty script")]
    Empty,

    #[error("Push at offset {offset} needs {needed} bytes, only {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Script does not start with a locking key push")]
    MissingLockingKey,

    #[error("Locking key is {len} bytes, expected 33 or 65")]
    InvalidLockingKey { len: usize },

    #[error("Locking key is not followed by OP_CHECKSIG")]
    MissingChecksig,

    #[error("Token carries no fields")]
    NoFields,

    #[error("Unexpected opcode 0x{opcode:02x} at offset {offset}")]
    UnexpectedOpcode { opcode: u8, offset: usize },

    #[error("Field list is not terminated by OP_DROP or OP_2DROP")]
    MissingDrop,
}

/// Errors produced while interpreting decoded fields as a commitment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Too few fields: expected at least {expected}, got {actual}")]
    TooFewFields { expected: usize, actual: usize },

    #[error("Field `{0}` is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("Field `{0}` is empty")]
    EmptyField(&'static str),

    #[error("Invalid content hash length: expected {expected}, got {actual}")]
    InvalidHashLength { expected: usize, actual: usize },

    #[error("Field `{field}` is not a decimal integer: {value:?}")]
    InvalidInteger { field: &'static str, value: String },

    #[error("Expiry must be positive, got {0}")]
    NonPositiveExpiry(i64),
}

/// Errors produced by the raw transaction codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("Unexpected end of transaction at offset {offset}: needed {needed} more bytes")]
    UnexpectedEof { offset: usize, needed: usize },

    #[error("{0} trailing bytes after lock time")]
    TrailingBytes(usize),

    #[error("Length {0} does not fit in memory")]
    LengthOverflow(u64),

    #[error("Invalid hex: {0}")]
    InvalidHex(String),
}

/// Errors related to outpoint identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutpointError {
    #[error("Invalid txid: {0}")]
    InvalidTxid(String),

    #[error("Invalid outpoint: {0}")]
    InvalidOutpoint(String),
}

/// Transaction-level admission failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("This transaction does not publish a valid UHRP token")]
    NoValidToken,
}
