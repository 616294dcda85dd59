//! ABCO CLI — assemble source to a ROM image and list images back as text.
//!
//! Exit codes:
//! - 0: Success
//! - 1: Usage, input, assembly or decode error

mod commands;

use std::process;

use tracing::Level;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "-v" || a == "--verbose");
    let args: Vec<String> = args
        .into_iter()
        .filter(|a| a != "-v" && a != "--verbose")
        .collect();

    init_logging(verbose);

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "assemble" => commands::assemble(&args[2..]),
        "disassemble" => commands::disassemble(&args[2..]),
        "--help" | "-h" | "help" => {
            print_usage();
            process::exit(0);
        }
        other => {
            eprintln!("error: unknown command '{other}'");
            eprintln!();
            print_usage();
            process::exit(1);
        }
    };

    if let Err(code) = result {
        process::exit(code);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .compact()
        .without_time()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn print_usage() {
    eprintln!("Usage: abco [-v] <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  assemble <input.abcout> [-o rom.bin]   Assemble source to a 32 KiB ROM image");
    eprintln!("  disassemble <rom.bin>                  List a ROM image as source text");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -v, --verbose                          Log each assembler pass");
}
