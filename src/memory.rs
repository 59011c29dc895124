use crate::processor::{Access, Fault};

pub type Byte = u8; // 1 byte
pub type Word = u16; // 2 bytes

/// Default memory size, in bytes
pub const DEFAULT_SIZE: usize = 256;

/// Emulates the data memory of the VM. Code lives in the program, not here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Memory {
    /// The actual data of the memory
    pub data: Vec<Byte>,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE)
    }
}

impl Memory {
    /// Allocates `size` zeroed bytes
    pub fn new(size: usize) -> Self {
        Memory {
            data: vec![0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Zeroes every byte
    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|byte| *byte = 0);
    }

    /// Returns true if a whole word fits at `position`
    pub fn holds_word(&self, position: usize) -> bool {
        position + 1 < self.data.len()
    }

    /// Reads a word from the memory (little endian)
    pub fn read_word(&self, position: Word) -> Result<Word, Fault> {
        let at = self.check(Access::Read, position)?;
        Ok(Word::from_le_bytes([self.data[at], self.data[at + 1]]))
    }

    /// Writes a word to the memory (little endian)
    pub fn write_word(&mut self, position: Word, value: Word) -> Result<(), Fault> {
        let at = self.check(Access::Write, position)?;
        self.data[at..at + 2].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn check(&self, access: Access, position: Word) -> Result<usize, Fault> {
        let at = position as usize;
        if self.holds_word(at) {
            Ok(at)
        } else {
            Err(Fault::OutOfBounds {
                access,
                address: position,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::eyre::Result;

    #[test]
    fn test_new_is_zeroed() -> Result<()> {
        let mem = Memory::new(16);
        assert_eq!(mem.size(), 16);
        assert!(mem.data.iter().all(|&byte| byte == 0));

        Ok(())
    }

    #[test]
    fn test_read_word() -> Result<()> {
        let mut mem = Memory::default();
        mem.data[0] = 0x12;
        mem.data[1] = 0x34;
        assert_eq!(mem.read_word(0)?, 0x3412); // little endian

        Ok(())
    }

    #[test]
    fn test_write_word() -> Result<()> {
        let mut mem = Memory::default();
        mem.write_word(0x44, 0x1234)?;
        assert_eq!(mem.data[0x44], 0x34); // little endian
        assert_eq!(mem.data[0x45], 0x12);

        Ok(())
    }

    #[test]
    fn test_word_extremes() -> Result<()> {
        let mut mem = Memory::new(4);
        for &value in &[0x0000, 0x00FF, 0xFF00, 0xFFFF] {
            mem.write_word(2, value)?;
            assert_eq!(mem.read_word(2)?, value);
        }

        Ok(())
    }

    #[test]
    fn test_last_byte_is_out_of_bounds() -> Result<()> {
        let mut mem = Memory::new(8);

        assert_eq!(
            mem.read_word(7),
            Err(Fault::OutOfBounds {
                access: Access::Read,
                address: 7
            })
        );
        assert_eq!(
            mem.write_word(7, 0xBEEF),
            Err(Fault::OutOfBounds {
                access: Access::Write,
                address: 7
            })
        );
        assert!(mem.read_word(0xFFFF).is_err());
        assert_eq!(mem, Memory::new(8));

        Ok(())
    }

    #[test]
    fn test_clear() -> Result<()> {
        let mut mem = Memory::new(4);
        mem.write_word(0, 0xFFFF)?;
        mem.clear();
        assert_eq!(mem, Memory::new(4));

        Ok(())
    }
}
