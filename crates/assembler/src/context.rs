//! Assembly context: all mutable state of one `assemble` call.
//!
//! A fresh [`Context`] is built for every invocation and threaded through
//! each pass, so repeated assemblies in one process never observe each
//! other's labels, macros or call stack.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{AsmError, ErrorKind, Frame, Warning};
use crate::lexer::Line;

/// A defined macro.
#[derive(Debug, Clone)]
pub(crate) struct Macro {
    /// Declared parameter count.
    pub params: usize,
    /// Primitive instructions and local label declarations only. Nested
    /// invocations were expanded when the macro was created.
    pub body: Vec<Line>,
    /// Macros this body invoked.
    pub dependencies: BTreeSet<String>,
    /// Labels declared inside the body, renamed on every expansion.
    pub locals: BTreeSet<String>,
    /// Number of expansions so far, nested ones and dependency
    /// bookkeeping included.
    pub calls: usize,
    /// Number of expansions from program code. Numbers the renamed local
    /// labels of a top-level call.
    pub top_level_calls: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Context {
    /// Global labels. `None` until addresses are assigned.
    pub labels: HashMap<String, Option<u16>>,
    pub macros: HashMap<String, Macro>,
    pub warnings: Vec<Warning>,
    stack: Vec<Frame>,
    /// Files on the active import chain.
    chain: Vec<PathBuf>,
}

impl Context {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A scope for one imported file: no labels or macros of its own yet,
    /// but the same call stack and import chain.
    pub(crate) fn child(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            chain: self.chain.clone(),
            ..Self::default()
        }
    }

    /// Build a located error at `line`, capturing the current call stack.
    pub(crate) fn located(&self, kind: ErrorKind, line: &Line) -> AsmError {
        self.located_at(kind, &line.file, line.number)
    }

    pub(crate) fn located_at(&self, kind: ErrorKind, file: &str, line: usize) -> AsmError {
        AsmError::Located {
            kind,
            file: file.to_string(),
            line,
            trace: self.stack.clone(),
        }
    }

    /// Run `f` with `frame` pushed on the call stack. The frame is popped
    /// whether or not `f` fails.
    pub(crate) fn with_frame<T>(
        &mut self,
        frame: Frame,
        f: impl FnOnce(&mut Self) -> Result<T, AsmError>,
    ) -> Result<T, AsmError> {
        self.stack.push(frame);
        let result = f(self);
        self.stack.pop();
        result
    }

    /// Run `f` with `path` on the import chain. Fails if the file is
    /// already being imported further up the chain.
    pub(crate) fn with_file<T>(
        &mut self,
        path: &Path,
        line: &Line,
        name: &str,
        f: impl FnOnce(&mut Self) -> Result<T, AsmError>,
    ) -> Result<T, AsmError> {
        let key = chain_key(path);
        if self.chain.contains(&key) {
            return Err(self.located(ErrorKind::CircularImport(name.to_string()), line));
        }
        self.chain.push(key);
        let result = f(self);
        self.chain.pop();
        result
    }

    /// Mark the root file as being assembled.
    pub(crate) fn enter_root(&mut self, path: &Path) {
        self.chain.push(chain_key(path));
    }

    /// Record a non-fatal diagnostic.
    pub(crate) fn warn(&mut self, line: &Line, message: String) {
        warn!(file = &*line.file, line = line.number, "{message}");
        self.warnings.push(Warning {
            file: line.file.to_string(),
            line: line.number,
            message,
        });
    }

    pub(crate) fn depth(&self) -> usize {
        self.stack.len()
    }
}

fn chain_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::LineKind;
    use std::rc::Rc;

    fn line(number: usize) -> Line {
        Line {
            text: String::new(),
            number,
            file: Rc::from("main.abcout"),
            kind: LineKind::Blank,
        }
    }

    fn frame(file: &str, line: usize) -> Frame {
        Frame {
            file: file.to_string(),
            line,
        }
    }

    #[test]
    fn located_captures_stack() {
        let mut ctx = Context::new();
        let err = ctx
            .with_frame(frame("main.abcout", 1), |ctx| {
                Err::<(), _>(ctx.located_at(ErrorKind::NestedMacro, "lib.abcout", 4))
            })
            .unwrap_err();
        assert_eq!(err.trace(), &[frame("main.abcout", 1)]);
        assert_eq!(err.file(), Some("lib.abcout"));
        assert_eq!(err.line(), Some(4));
    }

    #[test]
    fn frame_is_popped_on_failure() {
        let mut ctx = Context::new();
        let _ = ctx.with_frame(frame("a", 1), |ctx| {
            assert_eq!(ctx.depth(), 1);
            Err::<(), _>(ctx.located(ErrorKind::InvalidAt, &line(1)))
        });
        assert_eq!(ctx.depth(), 0);
        let err = ctx.located(ErrorKind::InvalidAt, &line(2));
        assert!(err.trace().is_empty());
    }

    #[test]
    fn nested_file_is_circular() {
        let mut ctx = Context::new();
        let path = Path::new("lib.abcout");
        let err = ctx
            .with_file(path, &line(1), "lib.abcout", |ctx| {
                ctx.with_file(path, &line(3), "lib.abcout", |_| Ok(()))
            })
            .unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::CircularImport("lib.abcout".to_string())
        );
        assert_eq!(err.line(), Some(3));

        // The chain unwinds, so a sibling import of the same file is fine.
        assert!(ctx.with_file(path, &line(5), "lib.abcout", |_| Ok(())).is_ok());
    }

    #[test]
    fn child_shares_stack_but_not_tables() {
        let mut ctx = Context::new();
        ctx.labels.insert("top".to_string(), None);
        let child = ctx
            .with_frame(frame("main.abcout", 2), |ctx| Ok(ctx.child()))
            .unwrap();
        assert!(child.labels.is_empty());
        assert!(child.macros.is_empty());
        assert_eq!(child.depth(), 1);
    }

    #[test_log::test]
    fn warnings_are_collected() {
        let mut ctx = Context::new();
        ctx.warn(&line(7), "heads up".to_string());
        assert_eq!(ctx.warnings.len(), 1);
        assert_eq!(ctx.warnings[0].line, 7);
        assert_eq!(ctx.warnings[0].file, "main.abcout");
    }
}
