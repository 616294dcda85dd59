//! Instruction encoding and decoding for the ABCO machine.
//!
//! The machine has a single instruction, `A, B, C`: add `mem[B]` into
//! `mem[A]`; if the sum exceeds 255, wrap it and jump to byte address `C`.
//! Every instruction is exactly 6 bytes, three big-endian words:
//! ```text
//! Bytes 0-1: A (u16, big-endian)
//! Bytes 2-3: B (u16, big-endian)
//! Bytes 4-5: C (u16, big-endian)
//! ```

use std::fmt;

use crate::error::DecodeError;

/// Size of one encoded instruction in bytes.
pub const INSTRUCTION_SIZE: usize = 6;

/// A single ABCO instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    /// Destination address.
    pub a: u16,
    /// Source address.
    pub b: u16,
    /// Branch target taken on overflow.
    pub c: u16,
}

impl Instruction {
    /// The halt sentinel, `00 00 00 00 7F FF`.
    ///
    /// Its C is not a multiple of 6, so the assembler can never emit it as
    /// an ordinary instruction.
    pub const HALT: Instruction = Instruction::new(0, 0, 0x7FFF);

    /// Create a new instruction.
    pub const fn new(a: u16, b: u16, c: u16) -> Self {
        Self { a, b, c }
    }

    /// Encode this instruction to 6 bytes (big-endian).
    pub fn encode(&self) -> [u8; INSTRUCTION_SIZE] {
        let mut bytes = [0u8; INSTRUCTION_SIZE];
        bytes[0..2].copy_from_slice(&self.a.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.b.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.c.to_be_bytes());
        bytes
    }

    /// Decode 6 bytes into an instruction (big-endian).
    pub fn decode(bytes: [u8; INSTRUCTION_SIZE]) -> Self {
        Self {
            a: u16::from_be_bytes([bytes[0], bytes[1]]),
            b: u16::from_be_bytes([bytes[2], bytes[3]]),
            c: u16::from_be_bytes([bytes[4], bytes[5]]),
        }
    }

    /// Decode an instruction from a slice that must be exactly 6 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, DecodeError> {
        let arr: [u8; INSTRUCTION_SIZE] = bytes
            .try_into()
            .map_err(|_| DecodeError::Misaligned(bytes.len()))?;
        Ok(Self::decode(arr))
    }

    /// Returns true if this is the halt sentinel.
    pub fn is_halt(&self) -> bool {
        *self == Self::HALT
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.a, self.b, self.c)
    }
}

impl From<[u16; 3]> for Instruction {
    fn from([a, b, c]: [u16; 3]) -> Self {
        Self::new(a, b, c)
    }
}

impl From<Instruction> for [u16; 3] {
    fn from(instr: Instruction) -> Self {
        [instr.a, instr.b, instr.c]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip_simple() {
        let instr = Instruction::new(1, 0, 6);
        assert_eq!(Instruction::decode(instr.encode()), instr);
    }

    #[test]
    fn encode_decode_roundtrip_max_args() {
        let instr = Instruction::new(0xFFFF, 0xFFFF, 0xFFFF);
        assert_eq!(Instruction::decode(instr.encode()), instr);
    }

    // --- Big-endian byte order ---

    #[test]
    fn small_values_have_zero_high_byte() {
        let instr = Instruction::new(1, 255, 6);
        assert_eq!(instr.encode(), [0x00, 0x01, 0x00, 0xFF, 0x00, 0x06]);
    }

    #[test]
    fn large_values_split_high_then_low() {
        let instr = Instruction::new(256, 0x1234, 32766);
        assert_eq!(instr.encode(), [0x01, 0x00, 0x12, 0x34, 0x7F, 0xFE]);
    }

    #[test]
    fn halt_sentinel_bytes() {
        assert_eq!(Instruction::HALT.encode(), [0, 0, 0, 0, 0x7F, 0xFF]);
        assert!(Instruction::HALT.is_halt());
        assert!(!Instruction::new(0, 0, 0).is_halt());
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        assert_eq!(
            Instruction::from_slice(&[0, 1, 2]),
            Err(DecodeError::Misaligned(3))
        );
        assert_eq!(
            Instruction::from_slice(&[0, 1, 0, 2, 0, 6]),
            Ok(Instruction::new(1, 2, 6))
        );
    }

    #[test]
    fn display_is_comma_separated() {
        assert_eq!(Instruction::new(10, 10, 6).to_string(), "10, 10, 6");
    }

    #[test]
    fn array_conversions() {
        let instr: Instruction = [1, 2, 12].into();
        assert_eq!(instr, Instruction::new(1, 2, 12));
        assert_eq!(<[u16; 3]>::from(instr), [1, 2, 12]);
    }
}
