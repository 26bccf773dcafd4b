use std::fmt;

use crate::memory::Cell;

/// Why an arena request failed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AllocError {
    /// No free block fits and the bump pointer would pass the region end.
    OutOfMemory { requested: usize },
    /// The freed address was never handed out, or was freed twice.
    UnknownBlock { addr: Cell },
    /// Zero-cell requests are refused.
    ZeroSize,
}

impl std::error::Error for AllocError {}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory { requested } => {
                write!(f, "no room in the data region for {requested} cells")
            }
            Self::UnknownBlock { addr } => {
                write!(f, "no allocated block starts at {addr:#06x}")
            }
            Self::ZeroSize => write!(f, "cannot allocate zero cells"),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Block {
    addr: usize,
    size: usize,
}

/// First-fit allocator over one region of cells.
///
/// Freed blocks keep their full capacity and are reused whole, so a block
/// can end up serving a smaller request than it was created for. Blocks
/// are never split or merged.
#[derive(Debug)]
pub struct Arena {
    capacity: usize,
    /// First address never handed out by the bump pointer.
    next: usize,
    used: Vec<Block>,
    free: Vec<Block>,
}

impl Arena {
    pub fn new(capacity: usize) -> Self {
        Arena {
            capacity,
            next: 0,
            used: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Forget every block and start bumping from `floor`.
    pub fn reset(&mut self, floor: usize) {
        self.used.clear();
        self.free.clear();
        self.next = floor.min(self.capacity);
    }

    /// Hand out `size` cells, preferring the earliest freed block that is
    /// large enough before touching fresh space.
    pub fn alloc(&mut self, size: usize) -> Result<Cell, AllocError> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }
        if let Some(i) = self.free.iter().position(|b| b.size >= size) {
            let block = self.free.remove(i);
            self.used.push(block);
            return Ok(block.addr as Cell);
        }
        if size > self.capacity - self.next {
            return Err(AllocError::OutOfMemory { requested: size });
        }
        let block = Block {
            addr: self.next,
            size,
        };
        self.next += size;
        self.used.push(block);
        Ok(block.addr as Cell)
    }

    /// Return a block to the free list by its starting address.
    pub fn free(&mut self, addr: Cell) -> Result<(), AllocError> {
        match self.used.iter().position(|b| b.addr == addr as usize) {
            Some(i) => {
                let block = self.used.remove(i);
                self.free.push(block);
                Ok(())
            }
            None => Err(AllocError::UnknownBlock { addr }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_blocks_bump_upward() {
        let mut arena = Arena::new(64);
        assert_eq!(arena.alloc(4), Ok(0));
        assert_eq!(arena.alloc(8), Ok(4));
        assert_eq!(arena.alloc(1), Ok(12));
    }

    #[test]
    fn freed_block_is_reused() {
        let mut arena = Arena::new(64);
        let a = arena.alloc(4).unwrap();
        arena.free(a).unwrap();
        assert_eq!(arena.alloc(4), Ok(a));
    }

    #[test]
    fn first_fit_skips_blocks_that_are_too_small() {
        let mut arena = Arena::new(64);
        let a = arena.alloc(4).unwrap();
        let b = arena.alloc(8).unwrap();
        arena.free(a).unwrap();
        arena.free(b).unwrap();
        assert_eq!(arena.alloc(8), Ok(b));
        assert_eq!(arena.alloc(2), Ok(a));
    }

    #[test]
    fn too_small_free_blocks_fall_through_to_fresh_space() {
        let mut arena = Arena::new(64);
        let a = arena.alloc(4).unwrap();
        arena.free(a).unwrap();
        assert_eq!(arena.alloc(5), Ok(4));
    }

    #[test]
    fn capacity_is_a_hard_ceiling() {
        let mut arena = Arena::new(8);
        assert_eq!(arena.alloc(8), Ok(0));
        assert_eq!(
            arena.alloc(1),
            Err(AllocError::OutOfMemory { requested: 1 })
        );
    }

    #[test]
    fn double_free_is_rejected() {
        let mut arena = Arena::new(8);
        let a = arena.alloc(2).unwrap();
        arena.free(a).unwrap();
        assert_eq!(arena.free(a), Err(AllocError::UnknownBlock { addr: a }));
    }

    #[test]
    fn freeing_an_interior_address_is_rejected() {
        let mut arena = Arena::new(8);
        arena.alloc(4).unwrap();
        assert_eq!(arena.free(2), Err(AllocError::UnknownBlock { addr: 2 }));
    }

    #[test]
    fn zero_size_is_rejected() {
        let mut arena = Arena::new(8);
        assert_eq!(arena.alloc(0), Err(AllocError::ZeroSize));
    }

    #[test]
    fn reset_moves_the_floor() {
        let mut arena = Arena::new(16);
        arena.alloc(4).unwrap();
        arena.reset(10);
        assert_eq!(arena.alloc(2), Ok(10));
    }
}
