//! Devices reachable through `SEL`, `WAW` and `RAW`.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Read, Stdin, Stdout, Write};

use crate::memory::{Byte, Word};

/// Id of the character console
pub const CONSOLE: Byte = 0x00;

/// Value a console read leaves in the accumulator once input is exhausted.
/// No character read from the host can produce it, since those are bytes.
pub const EOF_SENTINEL: Word = 0xFFFF;

/// A selectable I/O endpoint
pub trait Device {
    /// Produces a value for `RAW`
    fn read(&mut self) -> io::Result<Word>;

    /// Consumes the accumulator for `WAW`
    fn write(&mut self, value: Word) -> io::Result<()>;
}

/// Character console. Reads and writes one byte at a time.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<Stdin, Stdout> {
    /// Console bound to the host's standard input and output
    pub fn stdio() -> Self {
        Self::new(io::stdin(), io::stdout())
    }
}

impl<R: Read, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_inner(self) -> (R, W) {
        (self.input, self.output)
    }
}

impl<R: Read, W: Write> Device for Console<R, W> {
    /// Blocks until a byte is available. End of input yields [`EOF_SENTINEL`].
    fn read(&mut self) -> io::Result<Word> {
        let mut byte = [0; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => return Ok(EOF_SENTINEL),
                Ok(_) => return Ok(byte[0] as Word),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }

    /// Emits the low byte of `value`
    fn write(&mut self, value: Word) -> io::Result<()> {
        self.output.write_all(&[(value & 0xFF) as Byte])?;
        self.output.flush()
    }
}

/// Maps device ids to devices
#[derive(Default)]
pub struct Devices {
    table: BTreeMap<Byte, Box<dyn Device>>,
}

impl Devices {
    /// An empty table; every id is unknown
    pub fn new() -> Self {
        Self::default()
    }

    /// The base system: the console on stdin/stdout as device `0x00`
    pub fn standard() -> Self {
        let mut devices = Self::new();
        devices.attach(CONSOLE, Console::stdio());
        devices
    }

    /// Attaches `device` under `id`, returning whatever was there before
    pub fn attach<D>(&mut self, id: Byte, device: D) -> Option<Box<dyn Device>>
    where
        D: Device + 'static,
    {
        self.table.insert(id, Box::new(device))
    }

    pub fn detach(&mut self, id: Byte) -> Option<Box<dyn Device>> {
        self.table.remove(&id)
    }

    pub fn get_mut(&mut self, id: Byte) -> Option<&mut (dyn Device + 'static)> {
        self.table.get_mut(&id).map(|device| device.as_mut())
    }

    pub fn ids(&self) -> impl Iterator<Item = Byte> + '_ {
        self.table.keys().copied()
    }
}

impl fmt::Debug for Devices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.ids().map(|id| format!("0x{:02X}", id)))
            .finish()
    }
}
