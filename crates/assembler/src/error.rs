//! Error types for the ABCO assembler.

use std::fmt;

use abco_common::EncodeError;
use thiserror::Error;

/// Every diagnostic the assembler can raise.
///
/// The `Display` text is exactly the user-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    // --- Preprocessing ---
    #[error("invalid hex literal")]
    InvalidHexLiteral,

    #[error("file \"{0}\" not found")]
    FileNotFound(String),

    // --- Imports ---
    #[error("invalid use of @")]
    InvalidAt,

    #[error("a file to import from must be given")]
    MissingImportFile,

    #[error("malformed import statement")]
    MalformedImport,

    #[error("macros to import must be comma-separated")]
    ImportNotSeparated,

    #[error("an identical import statement already exists")]
    DuplicateImport,

    #[error("macro \"{0}\" not found")]
    MacroNotFound(String),

    #[error("circular import of file \"{0}\"")]
    CircularImport(String),

    // --- Macros ---
    #[error("invalid use of %")]
    InvalidPercent,

    #[error("unmatched macro opening statement")]
    UnmatchedMacroOpen,

    #[error("unmatched macro closing statement")]
    UnmatchedMacroClose,

    #[error("macros cannot define other macros")]
    NestedMacro,

    #[error("an identical macro opening statement already exists")]
    DuplicateMacroOpening,

    #[error("\"abcout\" cannot be used as a macro name")]
    ReservedMacroName,

    #[error("invalid macro name \"{0}\"")]
    InvalidMacroName(String),

    #[error("macro \"{0}\" already defined")]
    MacroAlreadyDefined(String),

    #[error("macro parameter count missing or invalid")]
    InvalidParamCount,

    #[error("macro \"{0}\" cannot call itself")]
    SelfReference(String),

    #[error("macro \"{0}\" is undefined")]
    UndefinedMacro(String),

    #[error("parameter out of range")]
    ParamOutOfRange,

    #[error("parameters cannot be used at the top level")]
    ParamAtTopLevel,

    #[error("parameter rendered invalid after expansion")]
    ParamRenderedInvalid,

    // --- Labels ---
    #[error("label \"{0}\" begins with the reserved prefix \"M\"")]
    ReservedLabelPrefix(String),

    #[error("\"abcout\" cannot be used as a label name")]
    ReservedLabelName,

    #[error("label \"{0}\" must be followed by an instruction")]
    LabelAtEnd(String),

    #[error("invalid label name \"{0}\"")]
    InvalidLabelName(String),

    #[error("label \"{0}\" already in use")]
    LabelInUse(String),

    #[error("label \"{0}\" is undefined")]
    UndefinedLabel(String),

    // --- Instructions ---
    #[error("arguments must be comma-separated")]
    NotSeparated,

    #[error("wrong number of arguments ({0} given)")]
    WrongArgCount(usize),

    #[error("argument too big")]
    ArgumentTooBig,

    #[error("argument cannot be negative")]
    NegativeArgument,

    #[error("argument must be a whole number")]
    FractionalArgument,

    #[error("invalid value for argument {0}")]
    InvalidArgument(char),

    #[error("too many instructions")]
    TooManyInstructions,
}

impl From<EncodeError> for ErrorKind {
    fn from(err: EncodeError) -> Self {
        match err {
            EncodeError::TooManyInstructions => ErrorKind::TooManyInstructions,
        }
    }
}

/// One entry of the import call stack: the file and line that pulled the
/// failing code in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub file: String,
    pub line: usize,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Errors produced during assembly. Every error aborts the whole run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    /// A failure that is not tied to a source line.
    #[error("{0}")]
    Failure(ErrorKind),

    /// A failure at a specific line, with the import chain that led there.
    #[error("{kind}\n  at {file}:{line}{}", render_trace(.trace))]
    Located {
        kind: ErrorKind,
        file: String,
        line: usize,
        /// Outermost frame first.
        trace: Vec<Frame>,
    },
}

impl AsmError {
    /// The diagnostic behind this error.
    pub fn kind(&self) -> &ErrorKind {
        match self {
            Self::Failure(kind) => kind,
            Self::Located { kind, .. } => kind,
        }
    }

    /// The 1-based line the error was raised at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Failure(_) => None,
            Self::Located { line, .. } => Some(*line),
        }
    }

    /// The file the error was raised in, if any.
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::Failure(_) => None,
            Self::Located { file, .. } => Some(file),
        }
    }

    /// The import frames active when the error was raised.
    pub fn trace(&self) -> &[Frame] {
        match self {
            Self::Failure(_) => &[],
            Self::Located { trace, .. } => trace,
        }
    }
}

impl From<ErrorKind> for AsmError {
    fn from(kind: ErrorKind) -> Self {
        Self::Failure(kind)
    }
}

fn render_trace(trace: &[Frame]) -> String {
    trace
        .iter()
        .rev()
        .map(|frame| format!("\n  imported from {frame}"))
        .collect()
}

/// A non-fatal diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub file: String,
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n  at {}:{}", self.message, self.file, self.line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display_is_the_message() {
        assert_eq!(
            ErrorKind::LabelInUse("start".to_string()).to_string(),
            "label \"start\" already in use"
        );
        assert_eq!(
            ErrorKind::FileNotFound("lib.abcout".to_string()).to_string(),
            "file \"lib.abcout\" not found"
        );
        assert_eq!(
            ErrorKind::WrongArgCount(4).to_string(),
            "wrong number of arguments (4 given)"
        );
        assert_eq!(
            ErrorKind::InvalidArgument('C').to_string(),
            "invalid value for argument C"
        );
    }

    #[test]
    fn failure_display() {
        let e = AsmError::Failure(ErrorKind::TooManyInstructions);
        assert_eq!(e.to_string(), "too many instructions");
        assert_eq!(e.line(), None);
        assert_eq!(e.file(), None);
        assert!(e.trace().is_empty());
    }

    #[test]
    fn located_display_without_trace() {
        let e = AsmError::Located {
            kind: ErrorKind::InvalidHexLiteral,
            file: "[code]".to_string(),
            line: 3,
            trace: vec![],
        };
        assert_eq!(e.to_string(), "invalid hex literal\n  at [code]:3");
        assert_eq!(e.line(), Some(3));
        assert_eq!(e.kind(), &ErrorKind::InvalidHexLiteral);
    }

    #[test]
    fn located_display_lists_innermost_frame_first() {
        let e = AsmError::Located {
            kind: ErrorKind::NestedMacro,
            file: "inner.abcout".to_string(),
            line: 2,
            trace: vec![
                Frame {
                    file: "main.abcout".to_string(),
                    line: 1,
                },
                Frame {
                    file: "outer.abcout".to_string(),
                    line: 4,
                },
            ],
        };
        assert_eq!(
            e.to_string(),
            "macros cannot define other macros\n  at inner.abcout:2\n  imported from outer.abcout:4\n  imported from main.abcout:1"
        );
    }

    #[test]
    fn encode_error_converts() {
        assert_eq!(
            ErrorKind::from(EncodeError::TooManyInstructions),
            ErrorKind::TooManyInstructions
        );
    }

    #[test]
    fn warning_display() {
        let w = Warning {
            file: "[code]".to_string(),
            line: 5,
            message: "careful".to_string(),
        };
        assert_eq!(w.to_string(), "careful\n  at [code]:5");
    }
}
