use std::convert::TryFrom;
use std::path::PathBuf;
use std::process::exit;

use subleq::bytecode::Width;
use subleq::symbolic;

enum Error {
    Usage,
    Source(String),
    Io(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::Io(e)
    }
}

fn print_usage() {
    println!("subleqasm: Assemble SUBLEQ programs");
    println!();
    println!("Usage: subleqasm [options] <source>");
    println!();
    println!("    <source>  The assembly source file.");
    println!("  --out, -o   Output path. Defaults to the source path with a .bin extension.");
    println!("  --size, -s  Cell width in bytes: 1, 2, 4 or 8. Defaults to 4.");
    println!("  --help, -h  Display this help text.");
}

struct Options {
    source: PathBuf,
    out: Option<PathBuf>,
    width: Width,
}

fn parse_args() -> Result<Options, Error> {
    let mut source = None;
    let mut out = None;
    let mut width = Width::default();

    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                exit(0);
            },
            "--out" | "-o" => {
                out = Some(PathBuf::from(args.next().ok_or(Error::Usage)?));
            },
            "--size" | "-s" => {
                let bytes = args.next()
                    .ok_or(Error::Usage)?
                    .parse::<usize>()
                    .map_err(|_| Error::Usage)?;

                width = Width::try_from(bytes).map_err(|_| Error::Usage)?;
            },
            _ if source.is_none() => source = Some(PathBuf::from(arg)),
            _ => return Err(Error::Usage),
        }
    }

    Ok(Options {
        source: source.ok_or(Error::Usage)?,
        out,
        width,
    })
}

fn assemble(options: &Options) -> Result<(), Error> {
    let source = std::fs::read_to_string(&options.source)?;

    let binary = symbolic::Program::parse(&source)
        .and_then(|program| program.compile())
        .and_then(|program| program.encode(options.width))
        .map_err(|err| Error::Source(err.verbose(&source).to_string()))?;

    let out = options.out
        .clone()
        .unwrap_or_else(|| options.source.with_extension("bin"));

    std::fs::write(out, binary)?;

    Ok(())
}

fn main() {
    let options = match parse_args() {
        Ok(options) => options,
        Err(_) => {
            print_usage();
            exit(1);
        },
    };

    match assemble(&options) {
        Ok(()) => (),
        Err(Error::Source(message)) => {
            eprintln!("error: {}", message);
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
