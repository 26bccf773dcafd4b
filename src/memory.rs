use std::fmt;

use crate::alloc::{AllocError, Arena};

/// One addressable unit of console memory.
///
/// Pixels, opcodes, and data all travel as full 32-bit words even though
/// most programs only care about the low byte of each.
pub type Cell = u32;

/// The console addresses 24K cells of memory.
pub const RAM_SIZE: usize = 24 * 1024;

/// A fixed window of the address space.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Region {
    pub base: usize,
    pub len: usize,
}

impl Region {
    /// One past the last cell of the region.
    pub const fn end(&self) -> usize {
        self.base + self.len
    }

    pub const fn contains(&self, addr: usize) -> bool {
        addr >= self.base && addr < self.end()
    }
}

/// Compiled opcodes and their operands. The program counter lives here.
pub const PROGRAM: Region = Region { base: 0x0000, len: 12288 };
/// One cell per screen pixel, row-major.
pub const VIDEO: Region = Region { base: 0x3000, len: 9216 };
/// Variables and sprites, addressed by the `m`-suffixed operations.
pub const DATA: Region = Region { base: 0x5400, len: 2560 };
/// Reserved for host-side settings. Nothing reads or writes it yet.
pub const CONFIG: Region = Region { base: 0x5E00, len: 512 };

/// A raw access outside the address space. Never clamped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BoundsError {
    pub addr: usize,
}

impl std::error::Error for BoundsError {}

impl fmt::Display for BoundsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "address {:#06x} is outside the 24K address space", self.addr)
    }
}

/// Console memory plus the arena that parcels out the data region.
///
/// Addresses handed to region accessors are region-relative; only the
/// regions themselves know where they sit in the flat address space.
pub struct Ram {
    cells: Box<[Cell; RAM_SIZE]>,
    arena: Arena,
}

impl Ram {
    pub fn new() -> Self {
        Ram {
            cells: Box::new([0; RAM_SIZE]),
            arena: Arena::new(DATA.len),
        }
    }

    pub fn program(&self) -> &[Cell] {
        &self.cells[PROGRAM.base..PROGRAM.end()]
    }

    pub fn program_mut(&mut self) -> &mut [Cell] {
        &mut self.cells[PROGRAM.base..PROGRAM.end()]
    }

    pub fn video(&self) -> &[Cell] {
        &self.cells[VIDEO.base..VIDEO.end()]
    }

    pub fn video_mut(&mut self) -> &mut [Cell] {
        &mut self.cells[VIDEO.base..VIDEO.end()]
    }

    pub fn data(&self) -> &[Cell] {
        &self.cells[DATA.base..DATA.end()]
    }

    pub fn data_mut(&mut self) -> &mut [Cell] {
        &mut self.cells[DATA.base..DATA.end()]
    }

    pub fn config(&self) -> &[Cell] {
        &self.cells[CONFIG.base..CONFIG.end()]
    }

    /// Raw indexed read across the whole address space.
    pub fn read(&self, addr: usize) -> Result<Cell, BoundsError> {
        self.cells.get(addr).copied().ok_or(BoundsError { addr })
    }

    /// Raw indexed write across the whole address space.
    pub fn write(&mut self, addr: usize, value: Cell) -> Result<(), BoundsError> {
        match self.cells.get_mut(addr) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(BoundsError { addr }),
        }
    }

    /// Claim `size` cells of the data region. The returned address is an
    /// offset into the data region, ready for the `m`-suffixed operations.
    pub fn alloc(&mut self, size: usize) -> Result<Cell, AllocError> {
        self.arena.alloc(size)
    }

    /// Release a block previously returned by [`Ram::alloc`].
    pub fn free(&mut self, addr: Cell) -> Result<(), AllocError> {
        self.arena.free(addr)
    }

    /// Forget all allocations and start handing out addresses from `floor`
    /// upward. Called on program load so static data stays untouched.
    pub fn reset_arena(&mut self, floor: usize) {
        self.arena.reset(floor);
    }

    /// Zero every cell. Arena state is left alone.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Copy of the entire address space, program counter order.
    pub fn snapshot(&self) -> Vec<Cell> {
        self.cells.to_vec()
    }
}
