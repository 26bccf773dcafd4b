use std::fmt;

use fxhash::FxBuildHasher;
use indexmap::IndexMap;

use crate::memory::{Cell, DATA, PROGRAM};

/// Name -> address map, in declaration order.
pub type SymbolTable = IndexMap<String, Cell, FxBuildHasher>;

/// A compiled program, ready to load into a machine.
///
/// `code` is the instruction stream for the program region, `data` the
/// static image for the bottom of the data region. Both fit their regions
/// by construction; [`Program::from_bytes`] re-checks images from disk.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Program {
    pub code: Vec<Cell>,
    pub data: Vec<Cell>,
    /// Label name -> program-region offset.
    pub labels: SymbolTable,
    /// `let` binding name -> data-region offset.
    pub refs: SymbolTable,
}

/// Number of cells in the on-disk header: code length, then data length.
const HEADER_CELLS: usize = 2;

/// Why a `.cbin` image failed to load.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ImageError {
    /// File is not a whole number of little-endian cells.
    Misaligned { len: usize },
    /// File ends before the lengths in its header are satisfied.
    Truncated { expected: usize, found: usize },
    /// A length in the header exceeds its region.
    TooLarge { what: &'static str, len: usize, cap: usize },
}

impl std::error::Error for ImageError {}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Misaligned { len } => {
                write!(f, "image is {len} bytes, not a whole number of cells")
            }
            Self::Truncated { expected, found } => {
                write!(f, "image ends early: header promises {expected} cells, found {found}")
            }
            Self::TooLarge { what, len, cap } => {
                write!(f, "{what} image of {len} cells exceeds its region of {cap}")
            }
        }
    }
}

impl Program {
    /// Serialize to the `.cbin` wire format: a two-cell header holding the
    /// code and data lengths, then both images, all little-endian u32.
    pub fn to_bytes(&self) -> Vec<u8> {
        let cells = HEADER_CELLS + self.code.len() + self.data.len();
        let mut out = Vec::with_capacity(cells * 4);
        out.extend_from_slice(&(self.code.len() as Cell).to_le_bytes());
        out.extend_from_slice(&(self.data.len() as Cell).to_le_bytes());
        for cell in self.code.iter().chain(&self.data) {
            out.extend_from_slice(&cell.to_le_bytes());
        }
        out
    }

    /// Parse a `.cbin` image. Symbol tables do not survive the trip; a
    /// loaded image carries empty ones.
    pub fn from_bytes(bytes: &[u8]) -> Result<Program, ImageError> {
        if bytes.len() % 4 != 0 {
            return Err(ImageError::Misaligned { len: bytes.len() });
        }
        let cells: Vec<Cell> = bytes
            .chunks_exact(4)
            .map(|b| Cell::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        if cells.len() < HEADER_CELLS {
            return Err(ImageError::Truncated {
                expected: HEADER_CELLS,
                found: cells.len(),
            });
        }
        let code_len = cells[0] as usize;
        let data_len = cells[1] as usize;
        if code_len > PROGRAM.len {
            return Err(ImageError::TooLarge { what: "code", len: code_len, cap: PROGRAM.len });
        }
        if data_len > DATA.len {
            return Err(ImageError::TooLarge { what: "data", len: data_len, cap: DATA.len });
        }
        let body = &cells[HEADER_CELLS..];
        if body.len() != code_len + data_len {
            return Err(ImageError::Truncated {
                expected: code_len + data_len,
                found: body.len(),
            });
        }
        Ok(Program {
            code: body[..code_len].to_vec(),
            data: body[code_len..].to_vec(),
            labels: SymbolTable::default(),
            refs: SymbolTable::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_code_and_data() {
        let program = Program {
            code: vec![1, 5, 1, 3, 33, 0],
            data: vec![7, 0, 0xFFFF_FFFF],
            ..Default::default()
        };
        let loaded = Program::from_bytes(&program.to_bytes()).unwrap();
        assert_eq!(loaded.code, program.code);
        assert_eq!(loaded.data, program.data);
        assert!(loaded.labels.is_empty());
    }

    #[test]
    fn empty_program_is_a_valid_image() {
        let loaded = Program::from_bytes(&Program::default().to_bytes()).unwrap();
        assert!(loaded.code.is_empty());
        assert!(loaded.data.is_empty());
    }

    #[test]
    fn rejects_ragged_images() {
        assert_eq!(
            Program::from_bytes(&[1, 2, 3]),
            Err(ImageError::Misaligned { len: 3 })
        );
    }

    #[test]
    fn rejects_truncated_images() {
        let mut bytes = Program {
            code: vec![1, 2, 3],
            ..Default::default()
        }
        .to_bytes();
        bytes.truncate(bytes.len() - 4);
        assert_eq!(
            Program::from_bytes(&bytes),
            Err(ImageError::Truncated { expected: 3, found: 2 })
        );
    }

    #[test]
    fn rejects_oversized_headers() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(PROGRAM.len as Cell + 1).to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            Program::from_bytes(&bytes),
            Err(ImageError::TooLarge { what: "code", .. })
        ));
    }
}
