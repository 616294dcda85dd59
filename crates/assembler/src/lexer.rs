//! Preprocessor and line classifier for ABCO assembly text.
//!
//! Each physical line is cleaned (comments, hex literals, whitespace, the
//! optional mnemonic) and then classified into a [`LineKind`], so later
//! passes match on the variant instead of re-inspecting text.

use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::context::Context;
use crate::error::{AsmError, ErrorKind};

/// The machine's only mnemonic. Optional in source.
pub(crate) const MNEMONIC: &str = "abcout";

/// Largest value a numeric argument may take.
pub(crate) const MAX_VALUE: u64 = 32767;

/// One argument of an instruction or macro invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Operand {
    /// A numeric literal, already range-checked.
    Number(u16),
    /// A label reference.
    Label(String),
    /// A macro parameter placeholder `%n`.
    Param(usize),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Label(name) => write!(f, "{name}"),
            Self::Param(i) => write!(f, "%{i}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineKind {
    Blank,
    /// `name:`
    Label(String),
    /// `%macro name count`. `params` is `None` when the count is missing
    /// or not a non-negative integer.
    MacroOpen { name: String, params: Option<usize> },
    /// `%endmacro`
    MacroClose,
    /// Any other `%`-line.
    Directive,
    /// Any `@`-line; validated by the import resolver.
    Import,
    /// `A, B[, C]`
    Instruction(Vec<Operand>),
    /// `name arg0, arg1, ...`
    Invocation { name: String, args: Vec<Operand> },
}

/// A logical source line after preprocessing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Line {
    /// Cleaned text.
    pub text: String,
    /// 1-based line number in `file`.
    pub number: usize,
    /// Owning file (namespace).
    pub file: Rc<str>,
    pub kind: LineKind,
}

impl Line {
    /// A line produced by macro expansion, attributed to the call site.
    pub(crate) fn expanded(kind: LineKind, site: &Line) -> Self {
        Self {
            text: render(&kind),
            number: site.number,
            file: Rc::clone(&site.file),
            kind,
        }
    }
}

fn render(kind: &LineKind) -> String {
    let join = |ops: &[Operand]| {
        ops.iter()
            .map(Operand::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    match kind {
        LineKind::Label(name) => format!("{name}:"),
        LineKind::Instruction(ops) => join(ops),
        LineKind::Invocation { name, args } if args.is_empty() => name.clone(),
        LineKind::Invocation { name, args } => format!("{name} {}", join(args)),
        _ => String::new(),
    }
}

/// Returns true if `s` matches `[a-z_][a-z0-9_]*`.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Preprocess and classify the source text of one file.
///
/// Lines are numbered from 1. A trailing newline does not produce a
/// trailing blank line.
pub(crate) fn preprocess(ctx: &Context, text: &str, file: &str) -> Result<Vec<Line>, AsmError> {
    let file: Rc<str> = Rc::from(file);
    let mut lines = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let number = idx + 1;
        let fail = |kind| ctx.located_at(kind, &file, number);

        let text = clean(raw).map_err(fail)?;
        let kind = classify(&text).map_err(fail)?;
        trace!(file = &*file, number, ?kind, "classified");
        lines.push(Line {
            text,
            number,
            file: Rc::clone(&file),
            kind,
        });
    }

    debug!(file = &*file, lines = lines.len(), "preprocessed");
    Ok(lines)
}

/// Strip the comment, rewrite hex literals, normalize whitespace and drop
/// the optional mnemonic.
fn clean(raw: &str) -> Result<String, ErrorKind> {
    let code = strip_comment(raw).replace('$', "0x");
    let code = convert_hex(&code)?;
    let code = code.split_whitespace().collect::<Vec<_>>().join(" ");

    match code.strip_prefix(MNEMONIC).and_then(|rest| rest.strip_prefix(' ')) {
        Some(rest) if !code.ends_with(':') => Ok(rest.to_string()),
        _ => Ok(code),
    }
}

/// Everything before the first unescaped `;`. `\;` stands for a literal `;`.
fn strip_comment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&';') => {
                out.push(';');
                chars.next();
            }
            ';' => break,
            _ => out.push(c),
        }
    }
    out
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || c == ','
}

/// Replace every `0x`-prefixed word with its decimal value.
fn convert_hex(code: &str) -> Result<String, ErrorKind> {
    let mut out = String::with_capacity(code.len());
    let mut rest = code;

    while !rest.is_empty() {
        let end = rest.find(is_delimiter).unwrap_or(rest.len());
        let (word, tail) = rest.split_at(end);
        match word.strip_prefix("0x") {
            Some(digits) => {
                if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(ErrorKind::InvalidHexLiteral);
                }
                let value =
                    u64::from_str_radix(digits, 16).map_err(|_| ErrorKind::ArgumentTooBig)?;
                out.push_str(&value.to_string());
            }
            None => out.push_str(word),
        }

        let delims = tail.find(|c| !is_delimiter(c)).unwrap_or(tail.len());
        out.push_str(&tail[..delims]);
        rest = &tail[delims..];
    }

    Ok(out)
}

/// Classify one cleaned line.
fn classify(text: &str) -> Result<LineKind, ErrorKind> {
    if text.is_empty() {
        return Ok(LineKind::Blank);
    }
    if let Some(name) = text.strip_suffix(':') {
        return Ok(LineKind::Label(name.to_string()));
    }
    if text.starts_with('@') {
        return Ok(LineKind::Import);
    }
    if let Some(directive) = text.strip_prefix('%') {
        if directive == "endmacro" {
            return Ok(LineKind::MacroClose);
        }
        if directive == "macro" || directive.starts_with("macro ") {
            return Ok(macro_open(directive));
        }
        if !directive.starts_with(|c: char| c.is_ascii_digit()) {
            return Ok(LineKind::Directive);
        }
        // An instruction whose first argument is a parameter.
        return Ok(LineKind::Instruction(parse_operands(text)?));
    }

    let head_end = text.find([' ', ',']).unwrap_or(text.len());
    let (head, rest) = text.split_at(head_end);
    if is_identifier(head) && !rest.starts_with(',') {
        return Ok(LineKind::Invocation {
            name: head.to_string(),
            args: parse_operands(rest.trim_start())?,
        });
    }

    Ok(LineKind::Instruction(parse_operands(text)?))
}

fn macro_open(directive: &str) -> LineKind {
    let mut parts = directive.split(' ').skip(1);
    let name = parts.next().unwrap_or_default().to_string();
    let params = match (parts.next(), parts.next()) {
        (Some(count), None) => count.parse::<usize>().ok(),
        _ => None,
    };
    LineKind::MacroOpen { name, params }
}

/// Split a comma-separated argument list. Arguments separated only by
/// whitespace, or empty arguments, are rejected.
pub(crate) fn parse_operands(list: &str) -> Result<Vec<Operand>, ErrorKind> {
    if list.is_empty() {
        return Ok(Vec::new());
    }
    list.split(',')
        .map(str::trim)
        .map(|arg| {
            if arg.is_empty() || arg.contains(' ') {
                Err(ErrorKind::NotSeparated)
            } else {
                parse_operand(arg)
            }
        })
        .collect()
}

fn parse_operand(arg: &str) -> Result<Operand, ErrorKind> {
    if let Some(index) = arg.strip_prefix('%') {
        return index
            .parse::<usize>()
            .map(Operand::Param)
            .map_err(|_| ErrorKind::InvalidPercent);
    }
    if arg.starts_with('-') && arg[1..].starts_with(|c: char| c.is_ascii_digit()) {
        return Err(ErrorKind::NegativeArgument);
    }
    if !arg.starts_with(|c: char| c.is_ascii_digit()) {
        return Ok(Operand::Label(arg.to_string()));
    }

    let value = if arg.contains('.') {
        match arg.parse::<f64>() {
            Ok(v) if v.fract() != 0.0 => return Err(ErrorKind::FractionalArgument),
            Ok(v) if v > MAX_VALUE as f64 => return Err(ErrorKind::ArgumentTooBig),
            Ok(v) => v as u64,
            Err(_) => return Ok(Operand::Label(arg.to_string())),
        }
    } else {
        match arg.parse::<u64>() {
            Ok(v) => v,
            Err(_) if arg.chars().all(|c| c.is_ascii_digit()) => {
                return Err(ErrorKind::ArgumentTooBig)
            }
            Err(_) => return Ok(Operand::Label(arg.to_string())),
        }
    };

    u16::try_from(value)
        .ok()
        .filter(|&v| u64::from(v) <= MAX_VALUE)
        .map(Operand::Number)
        .ok_or(ErrorKind::ArgumentTooBig)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<LineKind> {
        preprocess(&Context::new(), text, "[code]")
            .unwrap()
            .into_iter()
            .map(|line| line.kind)
            .collect()
    }

    fn kind(text: &str) -> LineKind {
        classify(&clean(text).unwrap()).unwrap()
    }

    fn num(n: u16) -> Operand {
        Operand::Number(n)
    }

    #[test]
    fn blank_and_comment_only() {
        assert_eq!(kind(""), LineKind::Blank);
        assert_eq!(kind("   \t  "), LineKind::Blank);
        assert_eq!(kind("; just a comment"), LineKind::Blank);
    }

    #[test]
    fn instruction_with_comment() {
        assert_eq!(
            kind("  1,  0, 0   ; add"),
            LineKind::Instruction(vec![num(1), num(0), num(0)])
        );
    }

    #[test]
    fn escaped_semicolon_is_kept() {
        assert_eq!(strip_comment(r"a\;b ; c"), "a;b ");
    }

    #[test]
    fn dollar_hex_becomes_decimal() {
        assert_eq!(clean("$100, 0, $ff").unwrap(), "256, 0, 255");
        assert_eq!(clean("0x10, 0").unwrap(), "16, 0");
    }

    #[test]
    fn invalid_hex_literal() {
        assert_eq!(clean("$invalid, 0"), Err(ErrorKind::InvalidHexLiteral));
        assert_eq!(clean("0x, 0"), Err(ErrorKind::InvalidHexLiteral));
    }

    #[test]
    fn hex_inside_identifier_is_untouched() {
        assert_eq!(clean("a0x1:").unwrap(), "a0x1:");
    }

    #[test]
    fn mnemonic_is_stripped() {
        assert_eq!(clean("abcout 1, 2, 6").unwrap(), "1, 2, 6");
        assert_eq!(clean("abcout:").unwrap(), "abcout:");
        assert_eq!(clean("abcout").unwrap(), "abcout");
    }

    #[test]
    fn label_declaration() {
        assert_eq!(kind("loop:"), LineKind::Label("loop".to_string()));
        assert_eq!(kind("  Start:"), LineKind::Label("Start".to_string()));
    }

    #[test]
    fn macro_markers() {
        assert_eq!(
            kind("%macro double 1"),
            LineKind::MacroOpen {
                name: "double".to_string(),
                params: Some(1)
            }
        );
        assert_eq!(
            kind("%macro double x"),
            LineKind::MacroOpen {
                name: "double".to_string(),
                params: None
            }
        );
        assert_eq!(
            kind("%macro double"),
            LineKind::MacroOpen {
                name: "double".to_string(),
                params: None
            }
        );
        assert_eq!(kind("%endmacro"), LineKind::MacroClose);
        assert_eq!(kind("%define x"), LineKind::Directive);
    }

    #[test]
    fn parameter_first_is_instruction() {
        assert_eq!(
            kind("%0, %0"),
            LineKind::Instruction(vec![Operand::Param(0), Operand::Param(0)])
        );
    }

    #[test]
    fn invocation_with_and_without_args() {
        assert_eq!(
            kind("start"),
            LineKind::Invocation {
                name: "start".to_string(),
                args: vec![]
            }
        );
        assert_eq!(
            kind("double 10"),
            LineKind::Invocation {
                name: "double".to_string(),
                args: vec![num(10)]
            }
        );
        assert_eq!(
            kind("jmp 1, target"),
            LineKind::Invocation {
                name: "jmp".to_string(),
                args: vec![num(1), Operand::Label("target".to_string())]
            }
        );
    }

    #[test]
    fn label_operand_in_c() {
        assert_eq!(
            kind("1, 1, label"),
            LineKind::Instruction(vec![num(1), num(1), Operand::Label("label".to_string())])
        );
    }

    #[test]
    fn import_line() {
        assert_eq!(kind("@import a from b"), LineKind::Import);
        assert_eq!(kind("@whatever"), LineKind::Import);
    }

    #[test]
    fn arguments_must_be_comma_separated() {
        assert_eq!(parse_operands("1 0"), Err(ErrorKind::NotSeparated));
        assert_eq!(parse_operands("1,,0"), Err(ErrorKind::NotSeparated));
        assert_eq!(parse_operands("1, 0,"), Err(ErrorKind::NotSeparated));
        assert_eq!(classify("1 0"), Err(ErrorKind::NotSeparated));
        assert_eq!(classify("Foo 1"), Err(ErrorKind::NotSeparated));
    }

    #[test]
    fn tight_commas_are_accepted() {
        assert_eq!(parse_operands("1,0"), Ok(vec![num(1), num(0)]));
    }

    #[test]
    fn numeric_range() {
        assert_eq!(parse_operand("32767"), Ok(num(32767)));
        assert_eq!(parse_operand("32768"), Err(ErrorKind::ArgumentTooBig));
        assert_eq!(
            parse_operand("99999999999999999999999"),
            Err(ErrorKind::ArgumentTooBig)
        );
        assert_eq!(parse_operand("-1"), Err(ErrorKind::NegativeArgument));
        assert_eq!(parse_operand("1.5"), Err(ErrorKind::FractionalArgument));
        assert_eq!(parse_operand("6.0"), Ok(num(6)));
    }

    #[test]
    fn bad_parameter_marker() {
        assert_eq!(parse_operand("%x"), Err(ErrorKind::InvalidPercent));
    }

    #[test]
    fn identifier_pattern() {
        assert!(is_identifier("start"));
        assert!(is_identifier("_tmp9"));
        assert!(!is_identifier("Start"));
        assert!(!is_identifier("9lives"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn lines_are_numbered_from_one() {
        let lines = preprocess(&Context::new(), "1, 0\n\n1, 1\n", "[code]").unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[2].number, 3);
        assert_eq!(&*lines[2].file, "[code]");
    }

    #[test]
    fn trailing_newline_is_dropped() {
        assert_eq!(kinds("1, 0\n").len(), 1);
        assert_eq!(kinds("1, 0\r\n1, 1\r\n").len(), 2);
    }

    #[test]
    fn preprocess_reports_line() {
        let err = preprocess(&Context::new(), "1, 0\n$zz, 0\n", "[code]").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::InvalidHexLiteral);
        assert_eq!(err.line(), Some(2));
        assert_eq!(err.file(), Some("[code]"));
    }

    #[test]
    fn expanded_line_renders_text() {
        let site = preprocess(&Context::new(), "double 10", "[code]").unwrap().remove(0);
        let line = Line::expanded(LineKind::Instruction(vec![num(10), num(10)]), &site);
        assert_eq!(line.text, "10, 10");
        assert_eq!(line.number, 1);
    }
}
