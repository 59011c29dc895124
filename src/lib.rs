//! A small accumulator VM executing a byte-addressed bytecode with 16-bit words.

pub mod builder;
pub mod device;
pub mod memory;
pub mod processor;

pub use builder::ProgramBuilder;
pub use processor::{Instruction, Outcome, Processor, Registers};
