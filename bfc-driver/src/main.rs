//! CLI driver for the tape-machine compiler.
//!
//! Usage:
//!   bfc <input> <output>
//!
//! Reads the source file, compiles it to an ELF64 executable image,
//! writes the result, and marks it executable. All failures print a
//! single `<program-name>: <message>.` line to standard error and exit
//! nonzero.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

/// Derives the program name from `argv[0]`'s final path component,
/// falling back to `"bfc"` if that component is empty or absent.
fn program_name(argv0: &str) -> String {
    let name = Path::new(argv0)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    if name.is_empty() {
        "bfc".to_string()
    } else {
        name.to_string()
    }
}

fn run(progname: &str, args: &[String]) -> Result<()> {
    if args.len() < 2 {
        anyhow::bail!("insufficient arguments");
    }
    let input_path = &args[0];
    let output_path = &args[1];

    println!("{progname}: compiling {input_path}");

    let source = fs::read(input_path)
        .with_context(|| format!("cannot read '{input_path}'"))?;

    let image = bfc_core::compile(&source)?;

    fs::write(output_path, &image)
        .with_context(|| format!("cannot write '{output_path}'"))?;
    fs::set_permissions(output_path, fs::Permissions::from_mode(0o775))
        .with_context(|| format!("cannot set permissions on '{output_path}'"))?;

    println!("{progname}: wrote {output_path} ({} bytes)", image.len());
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let progname = program_name(args.first().map(String::as_str).unwrap_or(""));

    match run(&progname, &args[1..]) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{progname}: {e}.");
            ExitCode::FAILURE
        }
    }
}
