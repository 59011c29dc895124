use color_eyre::eyre::Result;

use simple_logger::SimpleLogger;
use yslvm::builder::ProgramBuilder;
use yslvm::processor::Processor;

const SOURCE: &str = r#"
    # Reads characters and echoes them until end of input
    LDC 0xFFFF
    LCA 0x02
    RAW
    LCA 0x00
    CMP 0x00, 0x02
    NOT
    JNZ 0x14
    HLT
    SCA 0x00
    WAW
    JMP 0x06
"#;

fn main() -> Result<()> {
    color_eyre::install()?; // rust error handling
    SimpleLogger::new().init()?; // logging

    let program: ProgramBuilder = SOURCE.parse()?;
    let mut cpu = Processor::new(16);
    let outcome = cpu.run(program.as_bytes());

    println!();
    println!("{}", cpu.dump());
    println!("{:?}", outcome);

    Ok(())
}
