//! Assembled programs and their on-disk encoding.
//!
//! The binary format is a bare sequence of `W`-byte little-endian
//! two's-complement cells. There is no header or footer: the file length
//! defines the image length, and the image is loaded at address 0.

use std::fmt;

use crate::error::{ErrorKind, SourceError};
use crate::symbol_table::SymbolTable;

use super::Width;

/// A fully resolved SUBLEQ program: one signed integer per memory cell, plus
/// the symbol table of the source it was compiled from.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub cells: Vec<i64>,
    pub symbol_table: SymbolTable,
}

impl Program {
    /// Serialises the cells as `width`-byte little-endian values.
    ///
    /// # Errors
    /// Returns a range error naming the first cell whose value does not fit
    /// the width.
    pub fn encode(&self, width: Width) -> Result<Vec<u8>, SourceError> {
        let mut bytes = Vec::with_capacity(self.cells.len() * width.bytes());

        for (address, &value) in self.cells.iter().enumerate() {
            if !width.contains(value) {
                return Err(SourceError::spanless(ErrorKind::Range {
                    address,
                    value,
                    width,
                }));
            }

            bytes.extend_from_slice(&value.to_le_bytes()[..width.bytes()]);
        }

        Ok(bytes)
    }
}

/// Error cases for [decode].
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The image length is not a multiple of the cell width.
    Truncated {
        length: usize,
        width: Width,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DecodeError::Truncated { length, width } =>
                write!(f, "image length {} is not a multiple of the cell width {}", length, width),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Loads a binary image into a cell vector.
pub fn decode(bytes: &[u8], width: Width) -> Result<Vec<i64>, DecodeError> {
    if bytes.len() % width.bytes() != 0 {
        return Err(DecodeError::Truncated {
            length: bytes.len(),
            width,
        });
    }

    let mut cells = Vec::with_capacity(bytes.len() / width.bytes());

    for chunk in bytes.chunks(width.bytes()) {
        let mut raw = [0u8; 8];
        raw[..chunk.len()].copy_from_slice(chunk);

        cells.push(width.wrap(i64::from_le_bytes(raw)));
    }

    Ok(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(cells: Vec<i64>) -> Program {
        Program {
            cells,
            symbol_table: Default::default(),
        }
    }

    #[test]
    fn test_encode_little_endian() {
        let bytes = program(vec![1, -1, 0x0403]).encode(Width::Four).unwrap();

        assert_eq!(bytes, vec![
            1, 0, 0, 0,
            0xFF, 0xFF, 0xFF, 0xFF,
            0x03, 0x04, 0, 0,
        ]);
    }

    #[test]
    fn test_encode_narrow_cells() {
        let bytes = program(vec![11, -5]).encode(Width::One).unwrap();

        assert_eq!(bytes, vec![0x0B, 0xFB]);
    }

    #[test]
    fn test_encode_range_error() {
        let err = program(vec![0, 128]).encode(Width::One).unwrap_err();

        assert_eq!(err.kind, ErrorKind::Range {
            address: 1,
            value: 128,
            width: Width::One,
        });
    }

    #[test]
    fn test_encode_range_limits() {
        assert!(program(vec![-128, 127]).encode(Width::One).is_ok());
        assert!(program(vec![-129]).encode(Width::One).is_err());
        assert!(program(vec![i64::min_value()]).encode(Width::Eight).is_ok());
    }

    #[test]
    fn test_decode_sign_extends() {
        let cells = decode(&[0xFF, 0xFF, 0x7F, 0x80], Width::Two).unwrap();

        assert_eq!(cells, vec![-1, -32641]);
    }

    #[test]
    fn test_decode_rejects_truncated_image() {
        let err = decode(&[1, 2, 3], Width::Two).unwrap_err();

        assert_eq!(err, DecodeError::Truncated {
            length: 3,
            width: Width::Two,
        });
    }

    #[test]
    fn test_encode_decode_is_identity() {
        let cells = vec![-1, -1, 7, 300, -300, 0];
        let bytes = program(cells.clone()).encode(Width::Two).unwrap();

        assert_eq!(decode(&bytes, Width::Two).unwrap(), cells);
    }
}
