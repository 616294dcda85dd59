//! `@import` statements.
//!
//! `@import a, b from lib` reads `lib.abcout` next to the importing file,
//! checks it like any other source and defines the requested macros in
//! the importing scope. `@import * from lib` takes every macro of the file
//! itself. Imported files may import in turn, but what they import stays
//! private to them. A file importing itself, directly or through others,
//! is rejected.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::{debug, instrument};

use crate::config::EXTENSION;
use crate::context::Context;
use crate::error::{AsmError, ErrorKind, Frame};
use crate::lexer::{self, Line, LineKind};
use crate::macros::{self, MacroBlock};

/// Which macros an import statement asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Selection {
    All,
    Names(Vec<String>),
}

/// A validated `@import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportStatement {
    pub selection: Selection,
    /// File name as written, without extension.
    pub file: String,
}

impl ImportStatement {
    /// Name of the imported file in diagnostics.
    pub(crate) fn display_name(&self) -> String {
        format!("{}.{EXTENSION}", self.file)
    }
}

/// Parse one `@`-line.
pub(crate) fn parse(text: &str) -> Result<ImportStatement, ErrorKind> {
    let Some(rest) = text.strip_prefix("@import ") else {
        return Err(ErrorKind::InvalidAt);
    };

    let words: Vec<&str> = text.split(' ').collect();
    let n = words.len();
    if words[n - 1] == "from" {
        return Err(ErrorKind::MissingImportFile);
    }
    if n < 3 || words[n - 2] != "from" {
        return Err(ErrorKind::MalformedImport);
    }

    let star_form = rest
        .strip_prefix("* from ")
        .is_some_and(|file| !file.contains('*'));
    if text.contains('*') && !star_form {
        return Err(ErrorKind::MalformedImport);
    }

    let names = &words[1..n - 2];
    if !is_separated(names) {
        return Err(ErrorKind::ImportNotSeparated);
    }
    if words[n - 2..].iter().any(|word| word.contains(',')) || names.is_empty() {
        return Err(ErrorKind::MalformedImport);
    }

    let selection = if star_form {
        Selection::All
    } else {
        Selection::Names(
            names
                .iter()
                .map(|name| name.trim_end_matches(',').to_string())
                .collect(),
        )
    };
    Ok(ImportStatement {
        selection,
        file: words[n - 1].to_string(),
    })
}

/// Every word but the last ends in exactly one comma; the last has none.
fn is_separated(words: &[&str]) -> bool {
    let Some((last, init)) = words.split_last() else {
        return true;
    };
    let plain = |word: &str| !word.is_empty() && !word.contains(',');
    plain(*last)
        && init
            .iter()
            .all(|word| word.strip_suffix(',').is_some_and(plain))
}

/// Check every import statement of one file.
pub(crate) fn prep(ctx: &Context, lines: &[Line]) -> Result<(), AsmError> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut in_macro = false;

    for line in lines {
        match &line.kind {
            LineKind::MacroOpen { .. } => in_macro = true,
            LineKind::MacroClose => in_macro = false,
            LineKind::Import => {
                if in_macro {
                    return Err(ctx.located(ErrorKind::InvalidAt, line));
                }
                if line.text.starts_with("@import ") && !seen.insert(&line.text) {
                    return Err(ctx.located(ErrorKind::DuplicateImport, line));
                }
                parse(&line.text).map_err(|kind| ctx.located(kind, line))?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Preprocess one file, check it, and resolve its imports.
///
/// `dir` is the directory the file's own imports resolve against.
pub(crate) fn load(
    ctx: &mut Context,
    text: &str,
    file: &str,
    dir: &Path,
) -> Result<Vec<Line>, AsmError> {
    let lines = lexer::preprocess(ctx, text, file)?;
    prep(ctx, &lines)?;
    macros::prep(ctx, &lines)?;

    for line in lines.iter().filter(|line| line.kind == LineKind::Import) {
        add(ctx, line, dir)?;
    }
    Ok(lines)
}

/// Resolve one import statement and define the macros it selects.
///
/// The imported file is assembled in a child scope, so its own imports
/// and unselected macros stay out of the importing file. Only the
/// selected macros, already expanded, are copied back.
#[instrument(level = "debug", skip_all, fields(file = %line.file, line = line.number))]
pub(crate) fn add(ctx: &mut Context, line: &Line, dir: &Path) -> Result<(), AsmError> {
    let statement = parse(&line.text).map_err(|kind| ctx.located(kind, line))?;
    let name = statement.display_name();
    let path = dir.join(&name);

    let text = fs::read_to_string(&path)
        .map_err(|_| ctx.located(ErrorKind::FileNotFound(name.clone()), line))?;
    let child_dir = path.parent().unwrap_or(dir).to_path_buf();
    let frame = Frame {
        file: line.file.to_string(),
        line: line.number,
    };

    ctx.with_file(&path, line, &name, |ctx| {
        let mut scope = ctx.child();
        let lines = scope.with_frame(frame.clone(), |scope| {
            load(scope, &text, &name, &child_dir)
        })?;
        let (blocks, _) = macros::blocks(&lines);
        let selected = select(blocks, &statement.selection)
            .map_err(|kind| ctx.located(kind, line))?;

        debug!(
            file = %name,
            macros = selected.len(),
            depth = ctx.depth(),
            "importing"
        );
        ctx.with_frame(frame.clone(), |ctx| {
            match selected.iter().find(|block| ctx.macros.contains_key(&block.name)) {
                Some(block) => Err(ctx.located(
                    ErrorKind::MacroAlreadyDefined(block.name.clone()),
                    &block.open,
                )),
                None => Ok(()),
            }
        })?;
        scope.with_frame(frame, |scope| {
            selected
                .iter()
                .try_for_each(|block| macros::create(scope, block))
        })?;

        for block in &selected {
            if let Some(mac) = scope.macros.remove(&block.name) {
                ctx.macros.insert(block.name.clone(), mac);
            }
        }
        ctx.warnings.append(&mut scope.warnings);
        Ok(())
    })
}

/// Keep the blocks an import asks for, in file order.
fn select(blocks: Vec<MacroBlock>, selection: &Selection) -> Result<Vec<MacroBlock>, ErrorKind> {
    let Selection::Names(names) = selection else {
        return Ok(blocks);
    };
    if let Some(missing) = names
        .iter()
        .find(|name| !blocks.iter().any(|block| &block.name == *name))
    {
        return Err(ErrorKind::MacroNotFound(missing.clone()));
    }
    Ok(blocks
        .into_iter()
        .filter(|block| names.contains(&block.name))
        .collect())
}
