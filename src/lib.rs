//! A crate for doing anything related to SUBLEQ one-instruction set
//! computers.
//!
//! Currently this crate provides the functionality to:
//! - Parse symbolic SUBLEQ assembly.
//! - Lower the macro instructions of the assembly language into primitive
//!   SUBLEQ triples and resolve all labels in two passes.
//! - Write and read flat binary memory images with a configurable cell width.
//! - Execute memory images, including the input, output and halt traps.
//!
//! # Example
//! ```
//! use subleq::{
//!     symbolic::Program,
//!     bytecode::Width,
//!     emulator::{Emulator, TestIo},
//! };
//!
//! // Simple SUBLEQ program that adds 3 and 8 together and outputs the answer.
//! let source = r#"
//!     #set ENTRY=main
//!
//!     a:      int 3
//!     b:      int 8
//!
//!     main:
//!             add a b
//!             out b
//!             halt
//! "#;
//!
//! // Parse the assembly into its symbolic representation.
//! let program = Program::parse(source).unwrap();
//!
//! // Lower the macro instructions and resolve all labels.
//! let image = program.compile().unwrap();
//!
//! // Execute the image against an in-memory I/O handler.
//! let mut io = TestIo::new();
//! let mut emulator = Emulator::new(image.cells, Width::Four, &mut io);
//! emulator.run().unwrap();
//!
//! assert_eq!(io.into_output(), [11]);
//! ```
//!
//! # Executables
//!
//! ## `subleqasm`
//!
//! Assembles a source file into a binary memory image:
//!
//! ```text
//! subleqasm program.sq -o program.bin -s 4
//! ```
//!
//! ## `subleqrun`
//!
//! Loads a memory image at address 0 and executes it. The halt trap's status
//! operand becomes the process exit code. The `-d` flag enables a
//! step-through debugger on standard error.
//!
//! ```text
//! subleqrun program.bin -a
//! ```
pub mod error;
pub mod symbol_table;
pub mod emulator;
pub mod bytecode;
pub mod symbolic;
pub mod compiler;
