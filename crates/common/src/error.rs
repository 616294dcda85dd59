//! Encode and decode errors for ABCO ROM images.

use thiserror::Error;

/// Errors that occur while decoding a ROM image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The image is not exactly [`ROM_SIZE`](crate::rom::ROM_SIZE) bytes long.
    #[error("invalid image length: {0} (must be 32768 bytes)")]
    InvalidLength(usize),

    /// A byte slice handed to the instruction decoder was not 6 bytes.
    #[error("invalid instruction length: {0} (must be 6 bytes)")]
    Misaligned(usize),

    /// No halt sentinel was found on an instruction boundary.
    #[error("no halt sentinel found")]
    MissingHalt,
}

/// Errors that occur while writing instructions into a ROM image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The instruction area (32760 bytes) is already full.
    #[error("too many instructions")]
    TooManyInstructions,
}
