//! [Emulator] for executing assembled SUBLEQ memory images.

use std::fmt;
use std::io::{self, Read, Write};

use slog::{debug, o, trace, Discard, Logger};

use crate::bytecode::Width;

/// Interface to the input and output channels of the machine.
pub trait InputOutput {
    /// Called when an input trap is executed.
    ///
    /// # Returns
    /// The next input byte, or `None` when the input is exhausted.
    fn input(&mut self) -> Option<i64>;

    /// Called when an output trap is executed.
    ///
    /// # Parameters
    /// - `value`: The value of the cell named by the trap's first operand.
    fn output(&mut self, value: i64);
}

/// Trait for implementing the memory of a SUBLEQ machine.
///
/// Code and data share the single address space; self-modification is legal.
pub trait Memory {
    /// Error type returned by all methods of this trait.
    type Error;

    /// Fetch the cell at the specified address.
    fn load(&mut self, address: i64) -> Result<i64, Self::Error>;

    /// Overwrite the cell at the specified address.
    fn store(&mut self, address: i64, value: i64) -> Result<(), Self::Error>;
}

/// The error type of the [Memory] implementation for cell vectors: an access
/// outside the loaded image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutOfRange {
    pub address: i64,
}

impl fmt::Display for OutOfRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "address {} is outside the loaded image", self.address)
    }
}

impl Memory for Vec<i64> {
    type Error = OutOfRange;

    fn load(&mut self, address: i64) -> Result<i64, OutOfRange> {
        if address < 0 || address >= self.len() as i64 {
            return Err(OutOfRange { address });
        }

        Ok(self[address as usize])
    }

    fn store(&mut self, address: i64, value: i64) -> Result<(), OutOfRange> {
        if address < 0 || address >= self.len() as i64 {
            return Err(OutOfRange { address });
        }

        self[address as usize] = value;
        Ok(())
    }
}

/// Runtime faults of the execution loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Fault<E> {
    /// A memory access outside the addressable image.
    SegFault {
        /// Address of the faulting instruction triple.
        pc: i64,
        /// The underlying memory error.
        source: E,
    },

    /// An input trap found the input channel empty.
    InputExhausted {
        pc: i64,
    },
}

impl<E: fmt::Display> fmt::Display for Fault<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Fault::SegFault { pc, source } =>
                write!(f, "segmentation fault at pc {}: {}", pc, source),
            Fault::InputExhausted { pc } =>
                write!(f, "input exhausted at pc {}", pc),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for Fault<E> {}

/// The emulator contains all context for executing a SUBLEQ program: the
/// memory image, the program counter and the I/O channels.
#[derive(Clone)]
pub struct Emulator<Mem, IO> {
    /// The memory of the emulated machine.
    /// Contains all the instructions and data of the program.
    /// Implements [Memory].
    pub memory: Mem,

    /// Address of the next instruction triple.
    pub pc: i64,

    /// True once a halt trap has executed.
    pub halted: bool,

    width: Width,
    io: IO,
    exit_status: i64,
    logger: Logger,
}

impl<Mem, IO> Emulator<Mem, IO> where Mem: Memory, IO: InputOutput {
    /// Create a new emulator.
    ///
    /// # Parameters
    /// - `memory`: A [Memory] object containing the loaded image.
    /// - `width`: The cell width the image was encoded with. All arithmetic,
    ///   including program counter increments, wraps to this width.
    /// - `io`: An [IO handler](InputOutput).
    pub fn new(memory: Mem, width: Width, io: IO) -> Emulator<Mem, IO> {
        Emulator::with_logger(memory, width, io, Logger::root(Discard, o!()))
    }

    /// Create a new emulator that logs trap dispatch to the given logger.
    pub fn with_logger(memory: Mem, width: Width, io: IO, logger: Logger) -> Emulator<Mem, IO> {
        Emulator {
            memory,
            pc: 0,
            halted: false,
            width,
            io,
            exit_status: 0,
            logger,
        }
    }

    /// The status operand of the halt trap. Meaningful once
    /// [halted](Emulator::halted) is true.
    pub fn exit_status(&self) -> i64 {
        self.exit_status
    }

    fn load(&mut self, address: i64) -> Result<i64, Fault<Mem::Error>> {
        let pc = self.pc;

        self.memory.load(address)
            .map_err(|source| Fault::SegFault { pc, source })
    }

    fn store(&mut self, address: i64, value: i64) -> Result<(), Fault<Mem::Error>> {
        let pc = self.pc;

        self.memory.store(address, value)
            .map_err(|source| Fault::SegFault { pc, source })
    }

    /// Executes a single SUBLEQ step: fetches the triple `A B C` at the
    /// program counter and dispatches on the `-1` trap sentinels.
    ///
    /// Does nothing if the machine has already halted.
    ///
    /// # Errors
    /// Returns a fault if the step accesses memory outside the image or
    /// drains an exhausted input channel.
    pub fn step(&mut self) -> Result<(), Fault<Mem::Error>> {
        if self.halted {
            return Ok(());
        }

        let a = self.load(self.pc)?;
        let b = self.load(self.pc + 1)?;
        let c = self.load(self.pc + 2)?;

        if a == -1 && b == -1 {
            debug!(self.logger, "halt trap"; "pc" => self.pc, "status" => c);
            self.halted = true;
            self.exit_status = c;

            return Ok(());
        }

        if a == -1 {
            let byte = match self.io.input() {
                Some(byte) => byte,
                None => return Err(Fault::InputExhausted { pc: self.pc }),
            };

            trace!(self.logger, "input trap"; "pc" => self.pc, "target" => b, "byte" => byte);
            self.store(b, self.width.wrap(byte))?;
        } else if b == -1 {
            let value = self.load(a)?;

            trace!(self.logger, "output trap"; "pc" => self.pc, "source" => a, "value" => value);
            self.io.output(value);
        } else {
            let result = self.width.wrap(self.load(b)?.wrapping_sub(self.load(a)?));
            self.store(b, result)?;

            if result <= 0 {
                self.pc = c;

                return Ok(());
            }
        }

        self.pc = self.width.wrap(self.pc + 3);

        Ok(())
    }

    /// Executes the program until the halt trap fires.
    ///
    /// # Returns
    /// The status operand of the halt trap.
    ///
    /// # Errors
    /// Returns the first fault encountered; the machine performs no further
    /// steps after a fault.
    pub fn run(&mut self) -> Result<i64, Fault<Mem::Error>> {
        while !self.halted {
            self.step()?;
        }

        Ok(self.exit_status)
    }
}

/// An IO handler connected to the standard streams of the process.
///
/// Input is read from standard input one byte at a time. At the end of the
/// input a single `0` is produced first if null-termination was requested;
/// afterwards the channel reports exhaustion. Output is written to standard
/// output, either as decimal lines or as raw bytes.
pub struct StdIo {
    ascii: bool,
    null_terminate: bool,
    null_sent: bool,
}

impl StdIo {
    /// # Parameters
    /// - `ascii`: Render each output value as one raw byte instead of a
    ///   decimal line.
    /// - `null_terminate`: Yield one `0` byte when standard input reaches
    ///   its end.
    pub fn new(ascii: bool, null_terminate: bool) -> StdIo {
        StdIo {
            ascii,
            null_terminate,
            null_sent: false,
        }
    }
}

impl InputOutput for StdIo {
    fn input(&mut self) -> Option<i64> {
        let mut buffer = [0u8; 1];

        match io::stdin().read(&mut buffer) {
            Ok(1) => Some(buffer[0] as i64),
            _ => {
                if self.null_terminate && !self.null_sent {
                    self.null_sent = true;
                    Some(0)
                } else {
                    None
                }
            },
        }
    }

    fn output(&mut self, value: i64) {
        if self.ascii {
            let stdout = io::stdout();
            let mut handle = stdout.lock();

            let _ = handle.write_all(&[value as u8]);
            let _ = handle.flush();
        } else {
            println!("{}", value);
        }
    }
}

/// An IO handler for testing purposes.
///
/// Reads input values from a pre-determined input buffer and appends output
/// values to an output buffer.
#[derive(Debug, Clone, Default)]
pub struct TestIo {
    input_buffer: Vec<i64>,
    output_buffer: Vec<i64>,
}

impl TestIo {
    pub fn new() -> TestIo {
        TestIo {
            input_buffer: Vec::new(),
            output_buffer: Vec::new(),
        }
    }

    pub fn with_input<I: IntoIterator<Item = i64>>(input: I) -> TestIo {
        TestIo {
            input_buffer: input.into_iter().collect(),
            output_buffer: Vec::new(),
        }
    }

    pub fn input(&mut self, value: i64) {
        self.input_buffer.push(value);
    }

    pub fn output(&self) -> &[i64] {
        &self.output_buffer[..]
    }

    pub fn into_output(self) -> Vec<i64> {
        self.output_buffer
    }
}

impl InputOutput for TestIo {
    fn input(&mut self) -> Option<i64> {
        if self.input_buffer.is_empty() {
            return None;
        }

        Some(self.input_buffer.remove(0))
    }

    fn output(&mut self, value: i64) {
        self.output_buffer.push(value);
    }
}

impl InputOutput for &mut TestIo {
    fn input(&mut self) -> Option<i64> {
        if self.input_buffer.is_empty() {
            return None;
        }

        Some(self.input_buffer.remove(0))
    }

    fn output(&mut self, value: i64) {
        self.output_buffer.push(value);
    }
}
