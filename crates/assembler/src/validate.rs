//! Argument validation for instructions and macro invocations.

use std::collections::BTreeSet;

use crate::context::Context;
use crate::error::ErrorKind;
use crate::lexer::{Operand, MNEMONIC};

/// Where a line is being validated.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Scope<'a> {
    /// Program code. Parameters are not allowed.
    TopLevel,
    /// A macro body with `params` parameters and its own local labels.
    Macro {
        params: usize,
        locals: &'a BTreeSet<String>,
    },
}

impl Scope<'_> {
    fn knows_label(&self, ctx: &Context, name: &str) -> bool {
        ctx.labels.contains_key(name)
            || matches!(self, Scope::Macro { locals, .. } if locals.contains(name))
    }

    fn check_param(&self, op: &Operand) -> Result<(), ErrorKind> {
        match (op, self) {
            (Operand::Param(_), Scope::TopLevel) => Err(ErrorKind::ParamAtTopLevel),
            (Operand::Param(i), Scope::Macro { params, .. }) if i >= params => {
                Err(ErrorKind::ParamOutOfRange)
            }
            _ => Ok(()),
        }
    }
}

/// Validate a primitive `A, B[, C]` instruction.
pub(crate) fn instruction(ctx: &Context, ops: &[Operand], scope: &Scope) -> Result<(), ErrorKind> {
    for op in ops {
        scope.check_param(op)?;
    }

    let (a, b, c) = match ops {
        [a, b] => (a, b, None),
        [a, b, c] => (a, b, Some(c)),
        _ => return Err(ErrorKind::WrongArgCount(ops.len())),
    };

    for (op, name) in [(a, 'A'), (b, 'B')] {
        if let Operand::Label(_) = op {
            return Err(ErrorKind::InvalidArgument(name));
        }
    }

    match c {
        Some(Operand::Number(n)) if n % 6 != 0 => Err(ErrorKind::InvalidArgument('C')),
        Some(Operand::Label(name)) if !scope.knows_label(ctx, name) => {
            Err(ErrorKind::UndefinedLabel(name.clone()))
        }
        _ => Ok(()),
    }
}

/// Validate a macro invocation `name arg0, arg1, ...`.
pub(crate) fn invocation(
    ctx: &Context,
    name: &str,
    args: &[Operand],
    scope: &Scope,
) -> Result<(), ErrorKind> {
    if name == MNEMONIC {
        return Err(ErrorKind::WrongArgCount(args.len()));
    }

    for arg in args {
        scope.check_param(arg)?;
        if let Operand::Label(label) = arg {
            if !scope.knows_label(ctx, label) {
                return Err(ErrorKind::UndefinedLabel(label.clone()));
            }
        }
    }

    let mac = ctx
        .macros
        .get(name)
        .ok_or_else(|| ErrorKind::UndefinedMacro(name.to_string()))?;
    if args.len() != mac.params {
        return Err(ErrorKind::WrongArgCount(args.len()));
    }
    Ok(())
}
