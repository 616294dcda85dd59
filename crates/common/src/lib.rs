//! ABCO common types and ROM encoding.
//!
//! This crate provides the machine-level data structures shared by the
//! assembler and anything that consumes its output:
//!
//! - [`Instruction`] — the 6-byte `A, B, C` instruction with encode/decode
//! - [`Program`] — a sequence of instructions, convertible to and from a ROM image
//! - [`RomWriter`] — a bounds-checked image buffer with an explicit `ip`
//! - [`DecodeError`] / [`EncodeError`] — errors from the image codec

pub mod error;
pub mod instruction;
pub mod program;
pub mod rom;

// Re-export commonly used types at the crate root.
pub use error::{DecodeError, EncodeError};
pub use instruction::{Instruction, INSTRUCTION_SIZE};
pub use program::Program;
pub use rom::{RomWriter, MAX_CODE_BYTES, MAX_INSTRUCTIONS, ROM_SIZE};
