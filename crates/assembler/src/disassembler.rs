//! Disassembler: ROM image → canonical assembly text.
//!
//! Output format is flat text, one `A, B, C` instruction per line with
//! every argument in decimal and C always written out. No labels, no
//! comments, no blank lines.

use abco_common::{DecodeError, Program};

/// Disassemble a ROM image into canonical assembly text.
///
/// Decoding stops at the halt sentinel. For any image the assembler
/// produced, assembling the output yields an identical image.
pub fn disassemble(rom: &[u8]) -> Result<String, DecodeError> {
    let program = Program::decode(rom)?;
    Ok(render(&program))
}

/// Render a decoded program.
pub(crate) fn render(program: &Program) -> String {
    program
        .instructions
        .iter()
        .map(|instr| format!("{instr}\n"))
        .collect()
}
