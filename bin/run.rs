use std::convert::TryFrom;
use std::io::Write;
use std::path::PathBuf;
use std::process::exit;

use slog::{o, Drain, Logger};

use subleq::bytecode::{self, Width};
use subleq::emulator::{Emulator, Fault, OutOfRange, StdIo};

enum Error {
    Usage,
    Image(bytecode::DecodeError),
    Execution(Fault<OutOfRange>),
    Io(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

fn print_usage() {
    println!("subleqrun: Execute SUBLEQ memory images");
    println!();
    println!("Usage: subleqrun [options] <image>");
    println!();
    println!("    <image>   The binary memory image to execute.");
    println!("  --null-terminate-input, -n");
    println!("              Append one \\0 byte to standard input.");
    println!("  --ascii, -a");
    println!("              Print each output value as one raw byte instead of a");
    println!("              decimal line.");
    println!("  --debugger, -d");
    println!("              Step through the program interactively.");
    println!("  --size, -s  Cell width in bytes: 1, 2, 4 or 8. Must match the");
    println!("              assembler's. Defaults to 4.");
    println!("  --help, -h  Display this help text.");
}

struct Options {
    image: PathBuf,
    width: Width,
    ascii: bool,
    null_terminate: bool,
    debugger: bool,
}

fn parse_args() -> Result<Options, Error> {
    let mut image = None;
    let mut width = Width::default();
    let mut ascii = false;
    let mut null_terminate = false;
    let mut debugger = false;

    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                exit(0);
            },
            "--null-terminate-input" | "-n" => null_terminate = true,
            "--ascii" | "-a" => ascii = true,
            "--debugger" | "-d" => debugger = true,
            "--size" | "-s" => {
                let bytes = args.next()
                    .ok_or(Error::Usage)?
                    .parse::<usize>()
                    .map_err(|_| Error::Usage)?;

                width = Width::try_from(bytes).map_err(|_| Error::Usage)?;
            },
            _ if image.is_none() => image = Some(PathBuf::from(arg)),
            _ => return Err(Error::Usage),
        }
    }

    Ok(Options {
        image: image.ok_or(Error::Usage)?,
        width,
        ascii,
        null_terminate,
        debugger,
    })
}

fn terminal_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Logger::root(drain, o!())
}

/// Interactive step-through loop: prints the triple at the program counter
/// and reads a command before every step.
fn debug_loop(emulator: &mut Emulator<Vec<i64>, StdIo>) -> Result<i64, Error> {
    while !emulator.halted {
        let pc = emulator.pc;

        if pc >= 0 && pc + 2 < emulator.memory.len() as i64 {
            let pc = pc as usize;

            eprintln!();
            eprintln!(
                "[{:04x}] {} {} {}",
                pc, emulator.memory[pc], emulator.memory[pc + 1], emulator.memory[pc + 2],
            );
        }

        eprint!("> ");
        let _ = std::io::stderr().flush();

        let mut line = String::new();

        if std::io::stdin().read_line(&mut line)? == 0 {
            // Input is gone; finish the program without prompting again.
            return emulator.run().map_err(Error::Execution);
        }

        let mut parts = line.trim().splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("").trim();

        match command {
            "" | "e" | "execute" => emulator.step().map_err(Error::Execution)?,
            "s" | "skip" => emulator.pc += 3,
            "m" | "modify" => {
                let mut halves = rest.splitn(2, ',');
                let address = halves.next().and_then(|s| s.trim().parse::<i64>().ok());
                let value = halves.next().and_then(|s| s.trim().parse::<i64>().ok());

                match (address, value) {
                    (Some(address), Some(value))
                        if address >= 0 && address < emulator.memory.len() as i64 =>
                    {
                        emulator.memory[address as usize] = value;
                    },
                    _ => eprintln!("usage: m <address>,<value>"),
                }
            },
            "q" | "quit" => exit(0),
            _ => eprintln!("commands: e[xecute], s[kip], m[odify] <address>,<value>, q[uit]"),
        }
    }

    eprintln!("Terminated with status {}.", emulator.exit_status());

    Ok(emulator.exit_status())
}

fn run(options: &Options) -> Result<i64, Error> {
    let bytes = std::fs::read(&options.image)?;
    let memory = bytecode::decode(&bytes, options.width).map_err(Error::Image)?;

    let io = StdIo::new(options.ascii, options.null_terminate);

    if options.debugger {
        let mut emulator = Emulator::with_logger(memory, options.width, io, terminal_logger());

        debug_loop(&mut emulator)
    } else {
        let mut emulator = Emulator::new(memory, options.width, io);

        emulator.run().map_err(Error::Execution)
    }
}

fn main() {
    let options = match parse_args() {
        Ok(options) => options,
        Err(_) => {
            print_usage();
            exit(1);
        },
    };

    match run(&options) {
        Ok(status) => exit((status & 0xFF) as i32),
        Err(Error::Image(err)) => {
            eprintln!("error: {}", err);
            exit(1);
        },
        Err(Error::Execution(fault)) => {
            eprintln!("error: {}", fault);
            exit(1);
        },
        Err(Error::Io(err)) => {
            eprintln!("IO error: {}", err);
            exit(2);
        },
        Err(Error::Usage) => {
            print_usage();
            exit(1);
        },
    }
}
