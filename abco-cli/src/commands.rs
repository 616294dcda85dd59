//! CLI command implementations.

use std::fs;
use std::path::Path;

use abco_assembler::config::EXTENSION;

/// Default image path when `-o` is not given.
const DEFAULT_OUTPUT: &str = "rom.bin";

/// Assemble a .abcout source file to a ROM image.
pub fn assemble(args: &[String]) -> Result<(), i32> {
    if args.is_empty() {
        eprintln!("error: assemble requires an input file");
        eprintln!("Usage: abco assemble <input.abcout> [-o rom.bin]");
        return Err(1);
    }

    let input = Path::new(&args[0]);

    // Parse -o flag
    let output = if args.len() >= 3 && args[1] == "-o" {
        args[2].clone()
    } else {
        DEFAULT_OUTPUT.to_string()
    };

    if input.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
        eprintln!("error: improper file format");
        return Err(1);
    }

    let assembly = abco_assembler::assemble_file(input).map_err(|e| {
        eprintln!("error: {e}");
        1
    })?;

    fs::write(&output, &assembly.rom).map_err(|e| {
        eprintln!("error: cannot write '{output}': {e}");
        1
    })?;

    eprintln!(
        "assembled {} instructions -> {output}",
        assembly.program.len()
    );
    Ok(())
}

/// Print the canonical listing of a ROM image.
pub fn disassemble(args: &[String]) -> Result<(), i32> {
    if args.is_empty() {
        eprintln!("error: disassemble requires an input file");
        eprintln!("Usage: abco disassemble <rom.bin>");
        return Err(1);
    }

    let input = &args[0];
    let bytes = fs::read(input).map_err(|e| {
        eprintln!("error: cannot read '{input}': {e}");
        1
    })?;

    let text = abco_assembler::disassemble(&bytes).map_err(|e| {
        eprintln!("error: invalid image: {e}");
        1
    })?;
    print!("{text}");
    Ok(())
}
