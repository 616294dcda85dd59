//! ABCO assembler — source text → 32 KiB ROM image.
//!
//! Every ABCO instruction has the form `A, B, C`: add the byte at B into
//! the byte at A, and if the sum wraps past 255, jump to byte address C.
//! The assembler adds labels, parameterized macros with hygienic local
//! labels, and macro imports from other files on top of that.
//!
//! # Usage
//!
//! ```
//! use abco_assembler::{assemble, disassemble};
//!
//! let text = "start:\n1, 0\n1, 1, start\n";
//! let assembly = assemble(text).unwrap();
//! assert_eq!(assembly.program.triples(), vec![[1, 0, 6], [1, 1, 0]]);
//! assert_eq!(assembly.rom.len(), 32768);
//!
//! let listing = disassemble(&assembly.rom).unwrap();
//! assert_eq!(listing, "1, 0, 6\n1, 1, 0\n");
//! ```
//!
//! # Pipeline
//!
//! 1. Preprocess: strip comments, rewrite hex literals, classify lines.
//! 2. Check import statements and macro balance, then resolve imports.
//! 3. Register labels, define macros, expand invocations.
//! 4. Assign label addresses and emit the image.
//!
//! The first error aborts the run. Warnings never do.

pub mod config;
pub mod error;

mod codegen;
mod context;
mod disassembler;
mod imports;
mod labels;
mod lexer;
mod macros;
mod validate;

pub use config::Config;
pub use disassembler::disassemble;
pub use error::{AsmError, ErrorKind, Frame, Warning};

use std::fs;
use std::path::Path;

use abco_common::Program;
use tracing::{debug, instrument};

use context::Context;

/// The result of a successful assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// Resolved instructions in source order.
    pub program: Program,
    /// The 32768-byte image.
    pub rom: Vec<u8>,
    /// Non-fatal diagnostics, in the order they were raised.
    pub warnings: Vec<Warning>,
}

/// Assemble source text with the default configuration.
///
/// Imports resolve against the current directory.
pub fn assemble(text: &str) -> Result<Assembly, AsmError> {
    assemble_with(text, &Config::default())
}

/// Assemble source text.
#[instrument(level = "debug", skip_all, fields(file = %config.file_name))]
pub fn assemble_with(text: &str, config: &Config) -> Result<Assembly, AsmError> {
    let mut ctx = Context::new();
    ctx.enter_root(&config.root_path());

    let lines = imports::load(&mut ctx, text, &config.file_name, &config.import_dir)?;
    let (blocks, program) = macros::blocks(&lines);

    labels::prep(&mut ctx, &program, &blocks)?;
    for block in &blocks {
        macros::create(&mut ctx, block)?;
    }

    let expanded = macros::expand_program(&mut ctx, program)?;
    let code = labels::assign(&mut ctx, expanded)?;
    let (program, rom) = codegen::emit(&ctx, &code)?;

    debug!(
        instructions = program.len(),
        macros = ctx.macros.len(),
        labels = ctx.labels.len(),
        warnings = ctx.warnings.len(),
        "assembled"
    );
    Ok(Assembly {
        program,
        rom,
        warnings: ctx.warnings,
    })
}

/// Read and assemble the file at `path`. Its imports resolve relative to
/// its directory.
pub fn assemble_file(path: &Path) -> Result<Assembly, AsmError> {
    let text = fs::read_to_string(path)
        .map_err(|_| AsmError::Failure(ErrorKind::FileNotFound(path.display().to_string())))?;
    assemble_with(&text, &Config::for_file(path))
}
