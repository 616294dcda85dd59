//! Macro definition, validation and expansion.
//!
//! Macros are defined with `%macro name count` ... `%endmacro` and may
//! not nest. A macro body is stored fully expanded: invocations of other
//! macros inside it are spliced in at definition time, so expanding a
//! macro never recurses.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::{debug, instrument, trace};

use crate::context::{Context, Macro};
use crate::error::{AsmError, ErrorKind};
use crate::lexer::{is_identifier, Line, LineKind, Operand, MNEMONIC};
use crate::validate::{self, Scope};

/// A `%macro` ... `%endmacro` block, markers excluded from `body`.
#[derive(Debug, Clone)]
pub(crate) struct MacroBlock {
    pub open: Line,
    pub name: String,
    pub params: Option<usize>,
    pub body: Vec<Line>,
}

/// Check that macro openings and closings are balanced and never nested.
pub(crate) fn prep(ctx: &Context, lines: &[Line]) -> Result<(), AsmError> {
    let mut open: Vec<&Line> = Vec::new();
    let mut openings: HashSet<&str> = HashSet::new();
    let mut nested: Option<&Line> = None;

    for line in lines {
        match &line.kind {
            LineKind::MacroOpen { .. } => {
                if !openings.insert(&line.text) {
                    return Err(ctx.located(ErrorKind::DuplicateMacroOpening, line));
                }
                if nested.is_none() {
                    nested = open.first().copied();
                }
                open.push(line);
            }
            LineKind::MacroClose => {
                if open.pop().is_none() {
                    return Err(ctx.located(ErrorKind::UnmatchedMacroClose, line));
                }
            }
            LineKind::Directive => return Err(ctx.located(ErrorKind::InvalidPercent, line)),
            _ => {}
        }
    }

    if let Some(line) = open.last() {
        return Err(ctx.located(ErrorKind::UnmatchedMacroOpen, line));
    }
    if let Some(outer) = nested {
        return Err(ctx.located(ErrorKind::NestedMacro, outer));
    }
    Ok(())
}

/// Split prepped lines into macro blocks and the remaining program lines.
///
/// Lines belonging to a block are replaced by blanks in the program so
/// line positions are preserved.
pub(crate) fn blocks(lines: &[Line]) -> (Vec<MacroBlock>, Vec<Line>) {
    let mut blocks = Vec::new();
    let mut program = Vec::with_capacity(lines.len());
    let mut current: Option<MacroBlock> = None;

    for line in lines {
        let blank = Line {
            kind: LineKind::Blank,
            text: String::new(),
            ..line.clone()
        };
        match (&line.kind, current.as_mut()) {
            (LineKind::MacroOpen { name, params }, None) => {
                current = Some(MacroBlock {
                    open: line.clone(),
                    name: name.clone(),
                    params: *params,
                    body: Vec::new(),
                });
                program.push(blank);
            }
            (LineKind::MacroClose, Some(_)) => {
                blocks.extend(current.take());
                program.push(blank);
            }
            (_, Some(block)) => {
                block.body.push(line.clone());
                program.push(blank);
            }
            (_, None) => program.push(line.clone()),
        }
    }

    (blocks, program)
}

/// Define a macro from its block.
#[instrument(level = "debug", skip_all, fields(name = %block.name))]
pub(crate) fn create(ctx: &mut Context, block: &MacroBlock) -> Result<(), AsmError> {
    let name = block.name.as_str();
    let fail = |ctx: &Context, kind, line: &Line| Err(ctx.located(kind, line));

    if !is_identifier(name) {
        return fail(ctx, ErrorKind::InvalidMacroName(name.to_string()), &block.open);
    }
    if name == MNEMONIC {
        return fail(ctx, ErrorKind::ReservedMacroName, &block.open);
    }
    if ctx.macros.contains_key(name) {
        return fail(ctx, ErrorKind::MacroAlreadyDefined(name.to_string()), &block.open);
    }
    let Some(params) = block.params else {
        return fail(ctx, ErrorKind::InvalidParamCount, &block.open);
    };

    if let Some(line) = block
        .body
        .iter()
        .find(|line| matches!(&line.kind, LineKind::Invocation { name: callee, .. } if callee == name))
    {
        return fail(ctx, ErrorKind::SelfReference(name.to_string()), line);
    }

    let mut locals = BTreeSet::new();
    for line in &block.body {
        if let LineKind::Label(label) = &line.kind {
            if label == MNEMONIC {
                return fail(ctx, ErrorKind::ReservedLabelName, line);
            }
            if !is_identifier(label) {
                return fail(ctx, ErrorKind::InvalidLabelName(label.clone()), line);
            }
            if !locals.insert(label.clone()) {
                return fail(ctx, ErrorKind::LabelInUse(label.clone()), line);
            }
        }
    }

    let mut body = Vec::with_capacity(block.body.len());
    let mut dependencies = BTreeSet::new();

    for line in &block.body {
        let scope = Scope::Macro {
            params,
            locals: &locals,
        };
        match &line.kind {
            LineKind::Blank => {}
            LineKind::Label(_) => body.push(line.clone()),
            LineKind::Instruction(ops) => {
                validate::instruction(ctx, ops, &scope).map_err(|k| ctx.located(k, line))?;
                body.push(line.clone());
            }
            LineKind::Invocation { name: callee, args } => {
                validate::invocation(ctx, callee, args, &scope).map_err(|k| ctx.located(k, line))?;
                let expanded = expand(ctx, line, callee, args, scope)?;
                dependencies.insert(callee.clone());
                for line in &expanded {
                    if let LineKind::Label(mangled) = &line.kind {
                        locals.insert(mangled.clone());
                    }
                }
                body.extend(expanded);
            }
            LineKind::Import => return fail(ctx, ErrorKind::InvalidAt, line),
            LineKind::MacroOpen { .. } => return fail(ctx, ErrorKind::NestedMacro, &block.open),
            LineKind::MacroClose | LineKind::Directive => {
                return fail(ctx, ErrorKind::InvalidPercent, line)
            }
        }
    }

    debug!(
        params,
        lines = body.len(),
        locals = locals.len(),
        ?dependencies,
        "macro defined"
    );
    ctx.macros.insert(
        name.to_string(),
        Macro {
            params,
            body,
            dependencies,
            locals,
            calls: 0,
            top_level_calls: 0,
        },
    );
    Ok(())
}

/// Name of a macro-local label for one expansion.
pub(crate) fn mangle(name: &str, label: &str, call: usize) -> String {
    format!("M{name}_{label}_{call}")
}

/// Pick a new name for every local label of one expansion.
///
/// `_` may appear in both macro and label names, so `mangle` alone can
/// give two expansions the same name. A name for which `taken` holds, or
/// one already picked here, gets a numeric suffix until it is free.
fn fresh_names(
    name: &str,
    mac: &Macro,
    call: usize,
    taken: impl Fn(&str) -> bool,
) -> HashMap<String, String> {
    let mut picked: HashSet<String> = HashSet::new();
    let mut renames = HashMap::with_capacity(mac.locals.len());

    for label in &mac.locals {
        let base = mangle(name, label, call);
        let mut fresh = base.clone();
        let mut suffix = 0;
        while taken(&fresh) || picked.contains(&fresh) {
            suffix += 1;
            fresh = format!("{base}_{suffix}");
        }
        picked.insert(fresh.clone());
        renames.insert(label.clone(), fresh);
    }
    renames
}

/// Substitute arguments into a macro body and rename its local labels.
///
/// Each parameter slot is replaced exactly once, so an argument is never
/// re-substituted even if its text looks like another placeholder.
pub(crate) fn substitute(
    mac: &Macro,
    args: &[Operand],
    renames: &HashMap<String, String>,
    site: &Line,
) -> Vec<Line> {
    let rename = |op: &Operand| match op {
        Operand::Param(i) => args.get(*i).cloned().unwrap_or_else(|| op.clone()),
        Operand::Label(label) => match renames.get(label) {
            Some(fresh) => Operand::Label(fresh.clone()),
            None => op.clone(),
        },
        _ => op.clone(),
    };

    mac.body
        .iter()
        .map(|line| {
            let kind = match &line.kind {
                LineKind::Label(label) => {
                    LineKind::Label(renames.get(label).cloned().unwrap_or_else(|| label.clone()))
                }
                LineKind::Instruction(ops) => LineKind::Instruction(ops.iter().map(rename).collect()),
                other => other.clone(),
            };
            Line::expanded(kind, site)
        })
        .collect()
}

/// Bump the call counters of `name`, and of its dependencies for a call
/// from program code.
fn record_call(ctx: &mut Context, name: &str, scope: Scope) {
    let Some(mac) = ctx.macros.get_mut(name) else {
        return;
    };
    mac.calls += 1;
    if let Scope::Macro { .. } = scope {
        return;
    }
    mac.top_level_calls += 1;

    let dependencies: Vec<String> = mac.dependencies.iter().cloned().collect();
    for dep in dependencies {
        if let Some(dep) = ctx.macros.get_mut(&dep) {
            dep.calls += 1;
        }
    }
}

/// Expand one invocation of an already validated macro.
///
/// A call from program code is numbered by its position among the
/// macro's top-level calls, and its local labels become global labels.
/// Inside another macro's body the call is numbered by the macro's total
/// expansions, and its labels become that macro's locals (the caller
/// records them). Every resulting instruction is re-validated.
pub(crate) fn expand(
    ctx: &mut Context,
    site: &Line,
    name: &str,
    args: &[Operand],
    scope: Scope,
) -> Result<Vec<Line>, AsmError> {
    let Some(mac) = ctx.macros.get(name) else {
        return Err(ctx.located(ErrorKind::UndefinedMacro(name.to_string()), site));
    };
    let call = match scope {
        Scope::TopLevel => mac.top_level_calls + 1,
        Scope::Macro { .. } => mac.calls + 1,
    };
    let renames = fresh_names(name, mac, call, |label| match scope {
        Scope::TopLevel => ctx.labels.contains_key(label),
        Scope::Macro { locals, .. } => locals.contains(label),
    });
    let lines = substitute(mac, args, &renames, site);
    record_call(ctx, name, scope);

    let mut known = match scope {
        Scope::Macro { locals, .. } => locals.clone(),
        Scope::TopLevel => BTreeSet::new(),
    };
    for line in &lines {
        if let LineKind::Label(label) = &line.kind {
            match scope {
                Scope::TopLevel => {
                    ctx.labels.insert(label.clone(), None);
                }
                Scope::Macro { .. } => {
                    known.insert(label.clone());
                }
            }
        }
    }
    let check = match scope {
        Scope::Macro { params, .. } => Scope::Macro {
            params,
            locals: &known,
        },
        Scope::TopLevel => Scope::TopLevel,
    };

    for line in &lines {
        if let LineKind::Instruction(ops) = &line.kind {
            if validate::instruction(ctx, ops, &check).is_err() {
                return Err(ctx.located(ErrorKind::ParamRenderedInvalid, site));
            }
        }
    }

    trace!(name, call, lines = lines.len(), "expanded");
    Ok(lines)
}

/// Validate every program line and expand top-level invocations.
///
/// The result holds only label declarations and primitive instructions.
pub(crate) fn expand_program(ctx: &mut Context, lines: Vec<Line>) -> Result<Vec<Line>, AsmError> {
    let mut out = Vec::with_capacity(lines.len());

    for line in lines {
        match &line.kind {
            LineKind::Blank | LineKind::Import => {}
            LineKind::Label(_) => out.push(line),
            LineKind::Instruction(ops) => {
                validate::instruction(ctx, ops, &Scope::TopLevel)
                    .map_err(|k| ctx.located(k, &line))?;
                out.push(line);
            }
            LineKind::Invocation { name, args } => {
                validate::invocation(ctx, name, args, &Scope::TopLevel)
                    .map_err(|k| ctx.located(k, &line))?;
                let expanded = expand(ctx, &line, name, args, Scope::TopLevel)?;
                out.extend(expanded);
            }
            LineKind::MacroOpen { .. } | LineKind::MacroClose | LineKind::Directive => {
                return Err(ctx.located(ErrorKind::InvalidPercent, &line));
            }
        }
    }

    debug!(lines = out.len(), "program expanded");
    Ok(out)
}
