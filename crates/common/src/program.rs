//! Program representation for ABCO instruction streams.
//!
//! A program is the ordered list of resolved instructions. On disk it is
//! a fixed-size ROM image (see [`crate::rom`]); there is no header.

use crate::error::{DecodeError, EncodeError};
use crate::instruction::{Instruction, INSTRUCTION_SIZE};
use crate::rom::{RomWriter, ROM_SIZE};

/// An ABCO program: a sequence of instructions, halt sentinel excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    /// The instruction stream.
    pub instructions: Vec<Instruction>,
}

impl Program {
    /// Create a new program from a vector of instructions.
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Encode the program to a 32768-byte ROM image.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut rom = RomWriter::new();
        for instr in &self.instructions {
            rom.push(instr)?;
        }
        Ok(rom.finish())
    }

    /// Decode a ROM image into a program.
    ///
    /// The image must be exactly 32768 bytes. Decoding stops at the first
    /// halt sentinel on an instruction boundary; the padding after it is
    /// not inspected.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() != ROM_SIZE {
            return Err(DecodeError::InvalidLength(bytes.len()));
        }

        let mut instructions = Vec::new();
        for chunk in bytes.chunks_exact(INSTRUCTION_SIZE) {
            let instr = Instruction::from_slice(chunk)?;
            if instr.is_halt() {
                return Ok(Self { instructions });
            }
            instructions.push(instr);
        }

        Err(DecodeError::MissingHalt)
    }

    /// Number of instructions in the program.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if the program has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The instructions as `[A, B, C]` triples, in order.
    pub fn triples(&self) -> Vec<[u16; 3]> {
        self.instructions.iter().map(|&i| i.into()).collect()
    }
}
