//! CLI front end: reads one tokenized QB/VBDOS save file and writes its
//! detokenized source text to standard output (§6 "CLI surface").
//!
//! A mid-file decode failure is logged to stderr but still exits 0 with
//! whatever was decoded before the failing opcode (§4.4 "Failure", §7).

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

/// Detokenize a QuickBASIC 4.0/4.5/7.0/7.1 or VBDOS save file to source text.
#[derive(Parser)]
#[command(name = "qb-detok")]
#[command(version = "1.0.0")]
struct Cli {
    /// Path to the tokenized .BAS/.FRM save file.
    file: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli.file) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::SUCCESS
        }
    }
}

fn run(path: &PathBuf) -> Result<()> {
    let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    let (file, decode_error) =
        qb_decoder::decode(&data).with_context(|| format!("{} is not a recognizable QB/VBDOS save file", path.display()))?;

    print!("{}", qb_syntax::print_file(&file));

    if let Some(err) = decode_error {
        eprintln!("decode stopped early: {err}");
    }

    Ok(())
}
