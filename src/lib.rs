// Toolchain
mod asm;
pub use asm::assemble;
mod lexer;
mod program;
pub use program::{ImageError, Program};

// Machine
mod alloc;
pub use alloc::AllocError;
mod memory;
pub use memory::{BoundsError, Cell, Ram, Region, CONFIG, DATA, PROGRAM, RAM_SIZE, VIDEO};
mod ops;
pub use ops::{OpCode, SysCall};
mod runtime;
pub use runtime::{CmpFlag, Machine, Value};
mod video;
pub use video::{Video, SCREEN_HEIGHT, SCREEN_WIDTH, SPRITE_CELLS, SPRITE_DIM};
mod console;
pub use console::Console;

mod error;
pub use error::RuntimeError;
mod span;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 8;
