use std::fs;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};
use color_eyre::eyre::{Report, Result, WrapErr};
use log::*;
use simple_logger::SimpleLogger;

use yslvm::assemble;
use yslvm::memory::{Byte, DEFAULT_SIZE};
use yslvm::{Outcome, Processor, ProgramBuilder};

/// Runs a bytecode program. Without a file, runs a demo that prints every
/// character from 0x00 to 0xFF to the console.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Raw bytecode file to run
    path: Option<PathBuf>,
    /// Memory size in bytes
    #[arg(short, long, default_value_t = DEFAULT_SIZE)]
    memory: usize,
    /// Treat the file as assembler text instead of raw bytecode
    #[arg(short, long)]
    asm: bool,
    /// Log more, repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

/// Prints the character table, using the stack and memory address 0 as a
/// counter. Stops once the counter reaches 0x0101.
fn demo() -> Vec<Byte> {
    assemble!(
        /* 0x0000 */ SEL byte 0x00;
        /* 0x0002 */ LDC word 0x0000;
        /* 0x0005 */ PAC;
        /* 0x0006 */ LDC word 0x0001;
        /* 0x0009 */ LCA word 0x0000;
        /* 0x000C */ POP;
        /* 0x000D */ WAW;
        /* 0x000E */ INC;
        /* 0x000F */ PAC;
        /* 0x0010 */ CMA word 0x0000;
        /* 0x0013 */ NOT;
        /* 0x0014 */ JNZ word 0x000C;
        /* 0x0017 */ HLT
    )
}

/// Reads the whole file. Assembler text is assembled first.
fn load(path: &Path, asm: bool) -> Result<Vec<Byte>> {
    let bytes = fs::read(path)
        .wrap_err_with(|| format!("Failed to open program `{}`", path.display()))?;

    if !asm {
        return Ok(bytes);
    }

    let text = String::from_utf8(bytes).wrap_err("Assembler text is not valid UTF-8")?;
    let program = text
        .parse::<ProgramBuilder>()
        .wrap_err_with(|| format!("Failed to assemble `{}`", path.display()))?;

    Ok(program.into_bytes())
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    let args = Args::parse();

    SimpleLogger::new()
        .with_level(level(args.verbose))
        .init()
        .wrap_err("Failed to install logger")?; // logging

    let program = match &args.path {
        Some(path) => load(path, args.asm)?,
        None => demo(),
    };

    let mut cpu = Processor::new(args.memory);
    let outcome = cpu.run(&program);

    println!();
    println!("{}", cpu.dump());

    if cpu.incident_count() > 0 {
        warn!("{} incident(s) reported", cpu.incident_count());
    }

    match outcome {
        Outcome::Halted => Ok(()),
        Outcome::Faulted(fault) => Err(Report::new(fault).wrap_err("Run terminated abnormally")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_layout() -> Result<()> {
        let program = demo();

        assert_eq!(program.len(), 0x18);
        assert_eq!(&program[0x0C..0x0E], &[0x02, 0x0F]);
        assert_eq!(&program[0x14..], &[0x06, 0x0C, 0x00, 0xFF]);

        Ok(())
    }

    #[test]
    fn test_level() -> Result<()> {
        assert_eq!(level(0), LevelFilter::Warn);
        assert_eq!(level(2), LevelFilter::Debug);
        assert_eq!(level(9), LevelFilter::Trace);

        Ok(())
    }
}
