//! Parsing and storing symbolic SUBLEQ assembly programs.

pub mod token;
pub mod parser;
pub mod program;

pub use self::program::{Program, Statement, StatementEntry};
