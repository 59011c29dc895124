use color_eyre::eyre::{eyre, Result};

use log::LevelFilter;
use simple_logger::SimpleLogger;
use yslvm::assemble;
use yslvm::processor::{Outcome, Processor};

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new()
        .with_level(LevelFilter::Debug)
        .init()?; // logging

    // Prints the digits 9 down to 1
    let program = assemble!(
        /* 0x0000 */ SEL byte 0x00;
        /* 0x0002 */ LDC word 0x0001;
        /* 0x0005 */ LCA word 0x0000;
        /* 0x0008 */ LDC word 0x0030;
        /* 0x000B */ LCA word 0x0002;
        /* 0x000E */ LDC word 0x0009;
        /* 0x0011 */ LCA word 0x0004;
        /* 0x0014 */ ADD word 0x0002;
        /* 0x0017 */ WAW;
        /* 0x0018 */ SCA word 0x0004;
        /* 0x001B */ SUB word 0x0000;
        /* 0x001E */ JNZ word 0x0011;
        /* 0x0021 */ HLT
    );

    let mut cpu = Processor::new(16);
    match cpu.run(&program) {
        Outcome::Halted => {
            println!();
            println!("{}", cpu.dump());
            Ok(())
        }
        Outcome::Faulted(fault) => Err(eyre!("countdown faulted: {}", fault)),
    }
}
