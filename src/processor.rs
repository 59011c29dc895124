use std::fmt;
use std::io;

use crate::device::{Devices, EOF_SENTINEL};
use crate::memory::{Byte, Memory, Word};
use log::*;
use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

/// Value `CMP` and `CMA` leave in the accumulator on equality
pub const TRUE: Word = 0xFFFF;
/// Value `CMP` and `CMA` leave in the accumulator on inequality
pub const FALSE: Word = 0x0000;

/// How many incidents are kept per run. Later ones are only counted.
pub const INCIDENT_LOG_LIMIT: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Read,
    Write,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => f.write_str("read"),
            Access::Write => f.write_str("write"),
        }
    }
}

/// Conditions that stop a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    /// The next instruction, or part of it, lies outside the program
    IpOverrun { ip: usize },
    /// A word access does not fit in memory
    OutOfBounds { access: Access, address: Word },
    /// A push would leave the stack pointer without room for a word
    StackOverflow { sp: Word },
    /// `DIV` or `MOD` by a zero word
    DivisionByZero { ip: usize },
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::IpOverrun { ip } => write!(f, "IP > program size (0x{:04X})", ip),
            Fault::OutOfBounds { access, address } => {
                write!(f, "out of bounds {} (0x{:04X})", access, address)
            }
            Fault::StackOverflow { sp } => write!(f, "stack overflow (SP 0x{:04X})", sp),
            Fault::DivisionByZero { ip } => write!(f, "division by zero at 0x{:04X}", ip),
        }
    }
}

impl std::error::Error for Fault {}

/// Problems that are reported but do not stop a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Incident {
    UnknownOpcode { ip: Word, opcode: Byte },
    UnknownDevice { access: Access, id: Byte },
    DeviceFailure {
        access: Access,
        id: Byte,
        kind: io::ErrorKind,
    },
}

impl fmt::Display for Incident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Incident::UnknownOpcode { ip, opcode } => {
                write!(f, "unknown opcode 0x{:02X} at 0x{:04X}", opcode, ip)
            }
            Incident::UnknownDevice { access, id } => {
                write!(f, "{} on unknown device 0x{:02X}", access, id)
            }
            Incident::DeviceFailure { access, id, kind } => {
                write!(f, "{} on device 0x{:02X} failed: {:?}", access, id, kind)
            }
        }
    }
}

/// How a run ended
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Reached `HLT`
    Halted,
    Faulted(Fault),
}

impl Outcome {
    pub fn is_halted(&self) -> bool {
        matches!(self, Outcome::Halted)
    }
}

/// Snapshot of the registers, for display after a run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registers {
    pub ip: Word,
    pub sp: Word,
    pub acc: Word,
    pub device: Byte,
}

impl fmt::Display for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "===VM Info===")?;
        writeln!(f, "==Registers==")?;
        writeln!(f, "IP:  0x{:04X}", self.ip)?;
        writeln!(f, "SP:  0x{:04X}", self.sp)?;
        writeln!(f, "ACC: 0x{:04X}", self.acc)?;
        write!(f, "DEV: 0x{:02X}", self.device)
    }
}

/// Emulates the VM: an accumulator, a stack pointer into memory and a selected device
#[derive(Debug)]
pub struct Processor {
    /// Instruction pointer, an offset into the program
    pub ip: Word,
    /// Stack pointer, an address in memory
    pub sp: Word,
    /// Accumulator
    pub acc: Word,
    /// Selected device id
    pub device: Byte,
    /// Termination flag. Set by `HLT`
    pub halted: bool,
    pub memory: Memory,
    pub devices: Devices,
    incidents: Vec<Incident>,
    incident_count: usize,
}

impl Processor {
    /// Initializes a VM with `memory_size` bytes of memory and the standard devices
    pub fn new(memory_size: usize) -> Self {
        Self::with_devices(memory_size, Devices::standard())
    }

    pub fn with_devices(memory_size: usize, devices: Devices) -> Self {
        Self {
            ip: 0,
            sp: 0,
            acc: 0,
            device: 0,
            halted: false,
            memory: Memory::new(memory_size),
            devices,
            incidents: Vec::new(),
            incident_count: 0,
        }
    }

    pub fn dump(&self) -> Registers {
        Registers {
            ip: self.ip,
            sp: self.sp,
            acc: self.acc,
            device: self.device,
        }
    }

    /// The first [`INCIDENT_LOG_LIMIT`] non-fatal incidents reported since the last reset
    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    /// Number of non-fatal incidents reported since the last reset
    pub fn incident_count(&self) -> usize {
        self.incident_count
    }

    /// Zeroes registers and memory and forgets past incidents
    pub fn reset(&mut self) {
        self.ip = 0;
        self.sp = 0;
        self.acc = 0;
        self.device = 0;
        self.halted = false;
        self.memory.clear();
        self.incidents.clear();
        self.incident_count = 0;
    }

    /// Executes a single instruction. `args` holds exactly the operand bytes
    /// of `instruction` and `end` is the offset right behind them.
    fn execute_instruction(
        &mut self,
        instruction: Instruction,
        args: &[Byte],
        end: usize,
    ) -> Result<(), Fault> {
        let mut jump = None;

        match instruction {
            Instruction::NOP => {
                debug!("NOP");
            }
            Instruction::PSH => {
                let value = word_operand(args, 0);
                self.push(value)?;

                debug!("PSH 0x{:04X}", value);
            }
            Instruction::POP => {
                self.acc = self.memory.read_word(self.sp)?;
                self.sp = self.sp.wrapping_sub(1);

                debug!("POP: 0x{:04X}", self.acc);
            }
            Instruction::LSP => {
                let addr = word_operand(args, 0);
                self.memory.write_word(addr, self.sp)?;

                debug!("LSP 0x{:04X}: 0x{:04X}", addr, self.sp);
            }
            Instruction::SSP => {
                let addr = word_operand(args, 0);
                self.sp = self.memory.read_word(addr)?;

                debug!("SSP 0x{:04X}: 0x{:04X}", addr, self.sp);
            }
            Instruction::JMP => {
                let addr = word_operand(args, 0);
                jump = Some(addr);

                debug!("JMP 0x{:04X}", addr);
            }
            Instruction::JNZ => {
                let addr = word_operand(args, 0);
                if self.acc != 0 {
                    jump = Some(addr);
                }

                debug!("JNZ 0x{:04X}: 0x{:04X}", addr, self.acc);
            }
            Instruction::LCA => {
                let addr = word_operand(args, 0);
                self.memory.write_word(addr, self.acc)?;

                debug!("LCA 0x{:04X}: 0x{:04X}", addr, self.acc);
            }
            Instruction::SCA => {
                let (addr, value) = self.read_operand(args)?;
                self.acc = value;

                debug!("SCA 0x{:04X}: 0x{:04X}", addr, self.acc);
            }
            Instruction::CMP => {
                let (a, b) = (word_operand(args, 0), word_operand(args, 2));
                let lhs = self.memory.read_word(a)?;
                let rhs = self.memory.read_word(b)?;
                self.acc = flag(lhs == rhs);

                debug!("CMP 0x{:04X} 0x{:04X}: 0x{:04X}", a, b, self.acc);
            }
            Instruction::ADD => {
                let (addr, value) = self.read_operand(args)?;
                self.acc = self.acc.wrapping_add(value);

                debug!("ADD 0x{:04X}: 0x{:04X}", addr, self.acc);
            }
            Instruction::SUB => {
                let (addr, value) = self.read_operand(args)?;
                self.acc = self.acc.wrapping_sub(value);

                debug!("SUB 0x{:04X}: 0x{:04X}", addr, self.acc);
            }
            Instruction::MUL => {
                let (addr, value) = self.read_operand(args)?;
                self.acc = self.acc.wrapping_mul(value);

                debug!("MUL 0x{:04X}: 0x{:04X}", addr, self.acc);
            }
            Instruction::DIV => {
                let (addr, value) = self.read_operand(args)?;
                self.acc = self
                    .acc
                    .checked_div(value)
                    .ok_or(Fault::DivisionByZero {
                        ip: self.ip as usize,
                    })?;

                debug!("DIV 0x{:04X}: 0x{:04X}", addr, self.acc);
            }
            Instruction::MOD => {
                let (addr, value) = self.read_operand(args)?;
                self.acc = self
                    .acc
                    .checked_rem(value)
                    .ok_or(Fault::DivisionByZero {
                        ip: self.ip as usize,
                    })?;

                debug!("MOD 0x{:04X}: 0x{:04X}", addr, self.acc);
            }
            Instruction::WAW => {
                self.write_device();

                debug!("WAW 0x{:02X}: 0x{:04X}", self.device, self.acc);
            }
            Instruction::RAW => {
                self.acc = self.read_device();

                debug!("RAW 0x{:02X}: 0x{:04X}", self.device, self.acc);
            }
            Instruction::SEL => {
                self.device = args[0];

                debug!("SEL 0x{:02X}", self.device);
            }
            Instruction::LDC => {
                self.acc = word_operand(args, 0);

                debug!("LDC 0x{:04X}", self.acc);
            }
            Instruction::INC => {
                self.acc = self.acc.wrapping_add(1);

                debug!("INC: 0x{:04X}", self.acc);
            }
            Instruction::DEC => {
                self.acc = self.acc.wrapping_sub(1);

                debug!("DEC: 0x{:04X}", self.acc);
            }
            Instruction::NOT => {
                self.acc = !self.acc;

                debug!("NOT: 0x{:04X}", self.acc);
            }
            Instruction::AND => {
                let (addr, value) = self.read_operand(args)?;
                self.acc &= value;

                debug!("AND 0x{:04X}: 0x{:04X}", addr, self.acc);
            }
            Instruction::BOR => {
                let (addr, value) = self.read_operand(args)?;
                self.acc |= value;

                debug!("BOR 0x{:04X}: 0x{:04X}", addr, self.acc);
            }
            Instruction::XOR => {
                let (addr, value) = self.read_operand(args)?;
                self.acc ^= value;

                debug!("XOR 0x{:04X}: 0x{:04X}", addr, self.acc);
            }
            Instruction::PAC => {
                self.push(self.acc)?;

                debug!("PAC 0x{:04X}", self.acc);
            }
            Instruction::CMA => {
                let (addr, value) = self.read_operand(args)?;
                self.acc = flag(value == self.acc);

                debug!("CMA 0x{:04X}: 0x{:04X}", addr, self.acc);
            }
            Instruction::HLT => {
                self.halted = true; // set termination flag, IP stays on HLT

                debug!("HLT");
                return Ok(());
            }
        }

        self.ip = match jump {
            Some(addr) => addr,
            None => to_ip(end)?,
        };

        Ok(())
    }

    /// Runs one execution step
    pub fn execute(&mut self, program: &[Byte]) -> Result<(), Fault> {
        let at = self.ip as usize;
        let opcode = *program.get(at).ok_or(Fault::IpOverrun { ip: at })?; // Read opcode where IP is

        let instruction = match Instruction::try_from(opcode) {
            Ok(instruction) => instruction,
            Err(_) => {
                self.report(Incident::UnknownOpcode {
                    ip: self.ip,
                    opcode,
                });
                self.ip = to_ip(at + 1)?;
                return Ok(());
            }
        };

        // Operands have to be part of the program before anything is touched
        let end = at + 1 + instruction.operand().size();
        if end > program.len() {
            return Err(Fault::IpOverrun { ip: end });
        }

        self.execute_instruction(instruction, &program[at + 1..end], end)
    }

    /// Runs `program` from a fresh state until `HLT` or a fault
    pub fn run(&mut self, program: &[Byte]) -> Outcome {
        self.reset();

        while !self.halted {
            if let Err(fault) = self.execute(program) {
                error!("[FATAL] {}", fault);
                return Outcome::Faulted(fault);
            }
        }

        info!("Program halted");
        Outcome::Halted
    }

    fn push(&mut self, value: Word) -> Result<(), Fault> {
        let overflow = Fault::StackOverflow { sp: self.sp };
        let sp = self.sp as usize + 1;
        if !self.memory.holds_word(sp) {
            return Err(overflow);
        }

        self.sp = Word::try_from(sp).map_err(|_| overflow)?;
        self.memory.write_word(self.sp, value)
    }

    fn read_operand(&self, args: &[Byte]) -> Result<(Word, Word), Fault> {
        let addr = word_operand(args, 0);
        Ok((addr, self.memory.read_word(addr)?))
    }

    fn write_device(&mut self) {
        let (id, value) = (self.device, self.acc);

        match self.devices.get_mut(id).map(|device| device.write(value)) {
            Some(Ok(())) => {}
            Some(Err(err)) => self.report(Incident::DeviceFailure {
                access: Access::Write,
                id,
                kind: err.kind(),
            }),
            None => self.report(Incident::UnknownDevice {
                access: Access::Write,
                id,
            }),
        }
    }

    fn read_device(&mut self) -> Word {
        let id = self.device;

        match self.devices.get_mut(id).map(|device| device.read()) {
            Some(Ok(value)) => value,
            Some(Err(err)) => {
                self.report(Incident::DeviceFailure {
                    access: Access::Read,
                    id,
                    kind: err.kind(),
                });
                EOF_SENTINEL
            }
            None => {
                self.report(Incident::UnknownDevice {
                    access: Access::Read,
                    id,
                });
                0
            }
        }
    }

    fn report(&mut self, incident: Incident) {
        error!("[ERROR] {}", incident);
        self.incident_count += 1;
        if self.incidents.len() < INCIDENT_LOG_LIMIT {
            self.incidents.push(incident);
        }
    }
}

fn word_operand(args: &[Byte], offset: usize) -> Word {
    Word::from_le_bytes([args[offset], args[offset + 1]])
}

fn flag(condition: bool) -> Word {
    if condition {
        TRUE
    } else {
        FALSE
    }
}

fn to_ip(position: usize) -> Result<Word, Fault> {
    Word::try_from(position).map_err(|_| Fault::IpOverrun { ip: position })
}

/// The bytes following an opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operand {
    None,
    Byte,
    Word,
    /// Two words, e.g. the addresses compared by `CMP`
    TwoWords,
}

impl Operand {
    /// Number of bytes taken by the operand
    pub fn size(&self) -> usize {
        match self {
            Operand::None => 0,
            Operand::Byte => 1,
            Operand::Word => 2,
            Operand::TwoWords => 4,
        }
    }
}

macro_rules! instructions {
    ( $( $( #[doc = $doc:expr] )+ $name:ident ( $operand:ident ) = $repr:literal , )+ ) => {
        /// Defines the instructions together with the shape of their operands
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Instruction {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Instruction {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];

            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name) , )+
                }
            }

            pub fn operand(&self) -> Operand {
                match self {
                    $( Self::$name => Operand::$operand , )+
                }
            }
        }

        impl ::std::fmt::Display for Instruction {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    $( Self::$name => f.write_str(stringify!($name)) , )+
                }
            }
        }
    }
}

instructions! {
    /// No operation
    NOP(None) = 0x00,
    /// Push a constant onto the stack
    /// @param value The value to push
    PSH(Word) = 0x01,
    /// Pop the top of the stack into the accumulator
    POP(None) = 0x02,
    /// Store the stack pointer
    /// @param address Where to write it
    LSP(Word) = 0x03,
    /// Load the stack pointer
    /// @param address Where to read it from
    SSP(Word) = 0x04,
    /// Jump to an address in the program
    /// @param address The address to jump to
    JMP(Word) = 0x05,
    /// Jump if the accumulator is not zero
    /// @param address The address to jump to
    JNZ(Word) = 0x06,
    /// Store the accumulator
    /// @param address Where to write it
    LCA(Word) = 0x07,
    /// Load the accumulator
    /// @param address Where to read it from
    SCA(Word) = 0x08,
    /// Compare two words in memory, accumulator becomes 0xFFFF if equal, 0 if not
    /// @param a The first address
    /// @param b The second address
    CMP(TwoWords) = 0x09,
    /// Add a word in memory to the accumulator
    ADD(Word) = 0x0A,
    /// Subtract a word in memory from the accumulator
    SUB(Word) = 0x0B,
    /// Multiply the accumulator by a word in memory
    MUL(Word) = 0x0C,
    /// Divide the accumulator by a word in memory
    DIV(Word) = 0x0D,
    /// Remainder of dividing the accumulator by a word in memory
    MOD(Word) = 0x0E,
    /// Write the accumulator to the selected device
    WAW(None) = 0x0F,
    /// Read from the selected device into the accumulator
    RAW(None) = 0x10,
    /// Select a device
    /// @param id The device id
    SEL(Byte) = 0x11,
    /// Load a constant into the accumulator
    /// @param value The value to load
    LDC(Word) = 0x12,
    /// Increment the accumulator
    INC(None) = 0x13,
    /// Decrement the accumulator
    DEC(None) = 0x14,
    /// Bitwise not of the accumulator
    NOT(None) = 0x15,
    /// Bitwise and with a word in memory
    AND(Word) = 0x16,
    /// Bitwise or with a word in memory
    BOR(Word) = 0x17,
    /// Bitwise xor with a word in memory
    XOR(Word) = 0x18,
    /// Push the accumulator onto the stack
    PAC(None) = 0x19,
    /// Compare the accumulator with a word in memory, 0xFFFF if equal, 0 if not
    CMA(Word) = 0x1A,
    /// Stop the execution of the program
    HLT(None) = 0xFF,
}
