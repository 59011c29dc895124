use color_eyre::eyre::Result;

use simple_logger::SimpleLogger;
use yslvm::builder::ProgramBuilder;
use yslvm::processor::{Instruction, Processor};

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new().init()?; // logging

    let mut program = ProgramBuilder::new();
    program
        .add_instruction(Instruction::SEL)
        .add_byte_parameter(0x00)
        .add_instruction(Instruction::LDC)
        .add_word_parameter(0x0041)
        .add_instruction(Instruction::WAW)
        .add_instruction(Instruction::HLT);

    let mut cpu = Processor::new(256);
    let outcome = cpu.run(program.as_bytes());

    println!();
    println!("{}", cpu.dump());
    println!("{:?}", outcome);

    Ok(())
}
