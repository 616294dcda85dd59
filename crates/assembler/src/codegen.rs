//! Instruction encoding.
//!
//! Turns the expanded, label-resolved line stream into instructions and
//! writes them into a ROM image.

use tracing::debug;

use abco_common::{Instruction, Program, RomWriter, INSTRUCTION_SIZE};

use crate::context::Context;
use crate::error::{AsmError, ErrorKind};
use crate::lexer::{Line, LineKind, Operand};

/// Emit every instruction line. A missing C branches to the next
/// instruction.
pub(crate) fn emit(ctx: &Context, lines: &[Line]) -> Result<(Program, Vec<u8>), AsmError> {
    let mut rom = RomWriter::new();
    let mut instructions = Vec::with_capacity(lines.len());

    for line in lines {
        let LineKind::Instruction(ops) = &line.kind else {
            continue;
        };
        let instr = resolve(ctx, ops, rom.ip()).map_err(|kind| ctx.located(kind, line))?;
        rom.push(&instr)
            .map_err(|err| ctx.located(ErrorKind::from(err), line))?;
        instructions.push(instr);
    }

    debug!(
        instructions = instructions.len(),
        bytes = rom.ip(),
        "emitted"
    );
    Ok((Program::new(instructions), rom.finish()))
}

fn resolve(ctx: &Context, ops: &[Operand], ip: usize) -> Result<Instruction, ErrorKind> {
    let value = |op: &Operand, name: char| match op {
        Operand::Number(n) => Ok(*n),
        Operand::Label(label) => match ctx.labels.get(label) {
            Some(Some(address)) => Ok(*address),
            _ => Err(ErrorKind::UndefinedLabel(label.clone())),
        },
        Operand::Param(_) => Err(ErrorKind::InvalidArgument(name)),
    };

    match ops {
        [a, b] => {
            let next = u16::try_from(ip + INSTRUCTION_SIZE)
                .map_err(|_| ErrorKind::TooManyInstructions)?;
            Ok(Instruction::new(value(a, 'A')?, value(b, 'B')?, next))
        }
        [a, b, c] => Ok(Instruction::new(value(a, 'A')?, value(b, 'B')?, value(c, 'C')?)),
        _ => Err(ErrorKind::WrongArgCount(ops.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::preprocess;
    use abco_common::{MAX_INSTRUCTIONS, ROM_SIZE};

    fn emit_text(ctx: &Context, text: &str) -> Result<(Program, Vec<u8>), AsmError> {
        emit(ctx, &preprocess(ctx, text, "[code]").unwrap())
    }

    #[test]
    fn default_branch_is_next_instruction() {
        let (program, rom) = emit_text(&Context::new(), "1, 0\n1, 1").unwrap();
        assert_eq!(program.triples(), vec![[1, 0, 6], [1, 1, 12]]);
        assert_eq!(rom.len(), ROM_SIZE);
        assert_eq!(&rom[..12], &[0, 1, 0, 0, 0, 6, 0, 1, 0, 1, 0, 12]);
        assert_eq!(&rom[12..18], &[0, 0, 0, 0, 0x7F, 0xFF]);
    }

    #[test]
    fn labels_resolve_to_addresses() {
        let mut ctx = Context::new();
        ctx.labels.insert("top".to_string(), Some(6));
        let (program, _) = emit_text(&ctx, "1, 0\n0, 0, top").unwrap();
        assert_eq!(program.triples()[1], [0, 0, 6]);
    }

    #[test]
    fn unresolved_label() {
        let mut ctx = Context::new();
        ctx.labels.insert("top".to_string(), None);
        let err = emit_text(&ctx, "0, 0, top").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::UndefinedLabel("top".to_string()));
    }

    #[test]
    fn image_capacity() {
        let full = "1, 0\n".repeat(MAX_INSTRUCTIONS);
        let (program, rom) = emit_text(&Context::new(), &full).unwrap();
        assert_eq!(program.len(), MAX_INSTRUCTIONS);
        assert_eq!(&rom[ROM_SIZE - 8..ROM_SIZE - 2], &[0, 0, 0, 0, 0x7F, 0xFF]);

        let over = "1, 0\n".repeat(MAX_INSTRUCTIONS + 1);
        let err = emit_text(&Context::new(), &over).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::TooManyInstructions);
        assert_eq!(err.line(), Some(MAX_INSTRUCTIONS + 1));
    }
}
