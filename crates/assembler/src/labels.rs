//! Label registration and address assignment.

use tracing::debug;

use abco_common::INSTRUCTION_SIZE;

use crate::context::Context;
use crate::error::{AsmError, ErrorKind};
use crate::lexer::{is_identifier, Line, LineKind, MNEMONIC};
use crate::macros::MacroBlock;

/// Prefix reserved for renamed macro-local labels.
pub(crate) const RESERVED_PREFIX: &str = "M";

/// Register the program's label declarations with unresolved addresses.
///
/// `pending` are the macro blocks about to be defined; a label sharing a
/// name with any macro only draws a warning.
pub(crate) fn prep(ctx: &mut Context, lines: &[Line], pending: &[MacroBlock]) -> Result<(), AsmError> {
    let last = lines.iter().map(|line| line.number).max().unwrap_or(0);

    for line in lines {
        let LineKind::Label(name) = &line.kind else {
            continue;
        };

        let kind = if name.starts_with(RESERVED_PREFIX) {
            Some(ErrorKind::ReservedLabelPrefix(name.clone()))
        } else if line.number == last {
            Some(ErrorKind::LabelAtEnd(name.clone()))
        } else if name == MNEMONIC {
            Some(ErrorKind::ReservedLabelName)
        } else if !is_identifier(name) {
            Some(ErrorKind::InvalidLabelName(name.clone()))
        } else if ctx.labels.contains_key(name) {
            Some(ErrorKind::LabelInUse(name.clone()))
        } else {
            None
        };
        if let Some(kind) = kind {
            return Err(ctx.located(kind, line));
        }

        if ctx.macros.contains_key(name) || pending.iter().any(|block| &block.name == name) {
            ctx.warn(
                line,
                format!("label \"{name}\" shares its name with a macro; this is not recommended"),
            );
        }
        ctx.labels.insert(name.clone(), None);
    }

    debug!(labels = ctx.labels.len(), "labels registered");
    Ok(())
}

/// Give every label the address of the instruction that follows it and
/// drop the declarations.
///
/// `lines` must be fully expanded: labels and instructions only.
pub(crate) fn assign(ctx: &mut Context, lines: Vec<Line>) -> Result<Vec<Line>, AsmError> {
    let mut code = Vec::with_capacity(lines.len());

    for line in lines {
        match &line.kind {
            LineKind::Label(name) => {
                let address = u16::try_from(code.len() * INSTRUCTION_SIZE)
                    .map_err(|_| ctx.located(ErrorKind::TooManyInstructions, &line))?;
                ctx.labels.insert(name.clone(), Some(address));
            }
            _ => code.push(line),
        }
    }

    Ok(code)
}
