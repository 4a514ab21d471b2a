//! # Decode Error Handling
//!
//! This module defines the DecodeError enum, which represents the different
//! error types that can occur while decoding sensor payloads.

use thiserror::Error;

/// Represents the different error types that can occur during payload decoding.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Indicates a payload that is too short for the expected layout.
    #[error("Invalid payload length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Indicates a field that could not be decoded at a specific offset.
    #[error("Invalid data at offset {offset}: {reason}")]
    InvalidData { offset: usize, reason: String },

    /// Indicates an error while walking the M-Bus data record container.
    #[error("Error parsing M-Bus record: {0}")]
    RecordParse(String),

    /// Indicates a BCD field with non-decimal nibbles.
    #[error("Invalid BCD data")]
    InvalidBcd,

    /// Indicates an M-Bus date/time field that does not decode to a valid
    /// calendar date.
    #[error("Invalid date/time data")]
    InvalidDateTime,

    /// Indicates a data record without a unit where one is mandatory. The
    /// record container guarantees a unit for every non-specialized
    /// descriptor, so this is a contract violation.
    #[error("Record without unit for descriptor {0}")]
    MissingUnit(String),

    /// Indicates an error flag record whose data is neither one nor two
    /// bytes wide.
    #[error("Error flag record has invalid width: {0} bytes")]
    ErrorFlagWidth(usize),

    /// Indicates an unsupported payload format version byte.
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u8),
}
