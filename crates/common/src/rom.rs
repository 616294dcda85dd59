//! ROM image layout.
//!
//! An image is always exactly 32768 bytes: the encoded instructions,
//! then the 6-byte halt sentinel, then zero padding. The instruction
//! area is capped at 32760 bytes so the sentinel always fits.

use crate::error::EncodeError;
use crate::instruction::{Instruction, INSTRUCTION_SIZE};

/// Total size of a ROM image in bytes.
pub const ROM_SIZE: usize = 32768;

/// Maximum number of bytes of instruction data before the halt sentinel.
pub const MAX_CODE_BYTES: usize = 32760;

/// Maximum number of instructions in one image.
pub const MAX_INSTRUCTIONS: usize = MAX_CODE_BYTES / INSTRUCTION_SIZE;

/// Writes instructions into a pre-sized image buffer.
#[derive(Debug, Clone)]
pub struct RomWriter {
    bytes: Vec<u8>,
    ip: usize,
}

impl RomWriter {
    /// Create a writer over a zeroed 32768-byte image.
    pub fn new() -> Self {
        Self {
            bytes: vec![0; ROM_SIZE],
            ip: 0,
        }
    }

    /// Byte address the next instruction will be written to.
    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Append one instruction at `ip` and advance by 6 bytes.
    pub fn push(&mut self, instr: &Instruction) -> Result<(), EncodeError> {
        if self.ip >= MAX_CODE_BYTES {
            return Err(EncodeError::TooManyInstructions);
        }
        self.bytes[self.ip..self.ip + INSTRUCTION_SIZE].copy_from_slice(&instr.encode());
        self.ip += INSTRUCTION_SIZE;
        Ok(())
    }

    /// Write the halt sentinel and return the finished image.
    pub fn finish(mut self) -> Vec<u8> {
        self.bytes[self.ip..self.ip + INSTRUCTION_SIZE]
            .copy_from_slice(&Instruction::HALT.encode());
        self.bytes
    }
}

impl Default for RomWriter {
    fn default() -> Self {
        Self::new()
    }
}
