use crate::memory::{Byte, Word};

pub mod parse;

/// A program under construction. Appends only; no check is made that the
/// operands follow the shape of the instruction before them.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct ProgramBuilder {
    bytes: Vec<Byte>,
}

impl ProgramBuilder {
    /// Creates an empty program
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an opcode
    pub fn add_instruction<I: Into<Byte>>(&mut self, instruction: I) -> &mut Self {
        self.bytes.push(instruction.into());
        self
    }

    /// Appends a byte operand
    pub fn add_byte_parameter(&mut self, param: Byte) -> &mut Self {
        self.bytes.push(param);
        self
    }

    /// Appends a word operand (little endian)
    pub fn add_word_parameter(&mut self, param: Word) -> &mut Self {
        self.bytes.extend_from_slice(&param.to_le_bytes());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[Byte] {
        &self.bytes
    }

    /// Consumes the builder, yielding the program
    pub fn into_bytes(self) -> Vec<Byte> {
        self.bytes
    }
}

impl AsRef<[Byte]> for ProgramBuilder {
    fn as_ref(&self) -> &[Byte] {
        self.as_bytes()
    }
}

/// Assembles a program inline. Operands are tagged `byte` or `word`.
///
/// ```
/// use yslvm::assemble;
///
/// let program = assemble!(SEL byte 0x00; LDC word 0x0041; WAW; HLT);
/// assert_eq!(program, vec![0x11, 0x00, 0x12, 0x41, 0x00, 0x0F, 0xFF]);
/// ```
#[macro_export]
macro_rules! assemble {
    (@param $builder:ident, byte, $arg:expr) => {
        $builder.add_byte_parameter($arg);
    };
    (@param $builder:ident, word, $arg:expr) => {
        $builder.add_word_parameter($arg);
    };
    ( $( $inst:ident $( $kind:ident $arg:expr ),* );* $(;)? ) => {{
        let mut builder = $crate::builder::ProgramBuilder::new();
        $(
            builder.add_instruction($crate::processor::Instruction::$inst);
            $( $crate::assemble!(@param builder, $kind, $arg); )*
        )*
        builder.into_bytes()
    }};
}

#[cfg(test)]
mod tests {
    use crate::processor::Instruction;

    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_empty() -> Result<()> {
        let builder = ProgramBuilder::new();
        assert!(builder.is_empty());
        assert_eq!(builder.into_bytes(), Vec::<Byte>::new());

        Ok(())
    }

    #[test]
    fn test_appends_in_order() -> Result<()> {
        let mut builder = ProgramBuilder::new();
        builder
            .add_instruction(Instruction::SEL)
            .add_byte_parameter(0x00)
            .add_instruction(Instruction::LDC)
            .add_word_parameter(0x0041)
            .add_instruction(Instruction::WAW)
            .add_instruction(0xFF);

        assert_eq!(builder.len(), 7);
        assert_eq!(
            builder.as_bytes(),
            &[0x11, 0x00, 0x12, 0x41, 0x00, 0x0F, 0xFF]
        );

        Ok(())
    }

    #[test]
    fn test_word_parameter_is_little_endian() -> Result<()> {
        for &word in &[0x0000, 0x0001, 0x1234, 0x8000, 0xFFFF] {
            let mut builder = ProgramBuilder::new();
            builder.add_word_parameter(word);

            let bytes = builder.into_bytes();
            assert_eq!(bytes, vec![(word & 0xFF) as Byte, (word >> 8) as Byte]);
            assert_eq!(Word::from_le_bytes([bytes[0], bytes[1]]), word);
        }

        Ok(())
    }

    #[test]
    fn test_assemble() -> Result<()> {
        let mut builder = ProgramBuilder::new();
        builder
            .add_instruction(Instruction::CMP)
            .add_word_parameter(0x0102)
            .add_word_parameter(0x0304)
            .add_instruction(Instruction::HLT);

        let program = assemble!(CMP word 0x0102, word 0x0304; HLT;);
        assert_eq!(program, builder.into_bytes());

        Ok(())
    }
}
