use std::cmp::Ordering;

use crate::error::RuntimeError;
use crate::memory::{Cell, Ram};
use crate::ops::{OpCode, SysCall};
use crate::program::Program;
use crate::video::{Video, SPRITE_CELLS};

/// Engine ticks burned per unit of `wait`.
const WAIT_SCALE: u64 = 512;

/// One operand-stack entry. The tag travels with the value: shifting or
/// complementing an address yields an address, so computed addresses stay
/// usable downstream.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Value {
    /// Used as-is.
    Lit(Cell),
    /// Dereferenced through the data region on unpack.
    Addr(Cell),
}

impl Value {
    fn payload(self) -> Cell {
        match self {
            Value::Lit(c) | Value::Addr(c) => c,
        }
    }

    fn with_payload(self, payload: Cell) -> Value {
        match self {
            Value::Lit(_) => Value::Lit(payload),
            Value::Addr(_) => Value::Addr(payload),
        }
    }
}

/// Result of the last `cmp`/`cmpm`; sticky until the next one.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CmpFlag {
    Equal,
    Greater,
    Less,
}

impl From<Ordering> for CmpFlag {
    fn from(ord: Ordering) -> Self {
        match ord {
            Ordering::Equal => CmpFlag::Equal,
            Ordering::Greater => CmpFlag::Greater,
            Ordering::Less => CmpFlag::Less,
        }
    }
}

/// The fetch-decode-execute engine plus the memory and surface it drives.
///
/// A fault from [`Machine::tick`] halts the machine for good; `load` (or
/// `reset` with the old images still in place) is the only way back to a
/// runnable state.
pub struct Machine {
    ram: Ram,
    video: Video,
    pc: Cell,
    stack: Vec<Value>,
    calls: Vec<Cell>,
    flag: CmpFlag,
    wait: u64,
    halted: bool,
}

impl Machine {
    pub fn new() -> Self {
        Machine {
            ram: Ram::new(),
            video: Video::new(),
            pc: 0,
            stack: Vec::new(),
            calls: Vec::new(),
            flag: CmpFlag::Equal,
            wait: 0,
            halted: false,
        }
    }

    /// Wipe memory, copy the program's images into their regions, and park
    /// the arena above the static data.
    pub fn load(&mut self, program: &Program) {
        self.reset();
        self.ram.clear();
        self.ram.program_mut()[..program.code.len()].copy_from_slice(&program.code);
        self.ram.data_mut()[..program.data.len()].copy_from_slice(&program.data);
        self.ram.reset_arena(program.data.len());
    }

    /// Fresh engine state. Memory contents are untouched.
    pub fn reset(&mut self) {
        self.pc = 0;
        self.stack.clear();
        self.calls.clear();
        self.flag = CmpFlag::Equal;
        self.wait = 0;
        self.halted = false;
        self.video = Video::new();
    }

    /// Tick until halt. No backpressure: dirty frames pile up silently,
    /// which is what headless runs want. Paced execution with a presenting
    /// consumer goes through [`Console`] instead.
    ///
    /// [`Console`]: crate::console::Console
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while !self.halted {
            self.tick()?;
        }
        Ok(())
    }

    /// One engine cycle: burn a wait tick, or fetch and dispatch one
    /// operation. A fault halts the machine before it propagates.
    pub fn tick(&mut self) -> Result<(), RuntimeError> {
        if self.halted {
            return Ok(());
        }
        if self.wait > 0 {
            self.wait -= 1;
            return Ok(());
        }
        let at = self.pc;
        let result = self.dispatch(at);
        if result.is_err() {
            self.halted = true;
        }
        result
    }

    fn dispatch(&mut self, at: Cell) -> Result<(), RuntimeError> {
        let raw = self.fetch()?;
        let op = OpCode::try_from(raw).map_err(|raw| RuntimeError::InvalidOpcode { pc: at, raw })?;
        use OpCode::*;
        match op {
            Halt => self.halted = true,
            Noop => {}

            Push => {
                let value = self.fetch()?;
                self.stack.push(Value::Lit(value));
            }
            PushM => {
                let addr = self.fetch()?;
                self.stack.push(Value::Addr(addr));
            }
            Pop => {
                let dest = self.fetch()?;
                let value = self.pop_cell(at)?;
                self.data_write(dest, value, at)?;
            }

            Wait => {
                let units = self.pop_cell(at)?;
                self.wait = u64::from(units) * WAIT_SCALE;
            }

            Add | Sub | Mul | Div | And | Or | Xor => {
                let result = self.binary(op, at)?;
                self.stack.push(Value::Lit(result));
            }
            AddM | SubM | MulM | DivM | AndM | OrM | XorM => {
                let dest = self.fetch()?;
                let result = self.binary(op, at)?;
                self.data_write(dest, result, at)?;
            }

            // The shift amount is the top of the stack; the shifted value
            // keeps its tag, so a computed address stays an address.
            Lsh | Rsh => {
                let amount = self.pop_cell(at)?;
                let value = self.pop(at)?;
                let payload = shift(op == Lsh, value.payload(), amount);
                self.stack.push(value.with_payload(payload));
            }
            LshM | RshM => {
                let dest = self.fetch()?;
                let amount = self.pop_cell(at)?;
                let value = self.pop_cell(at)?;
                self.data_write(dest, shift(op == LshM, value, amount), at)?;
            }
            Not => {
                let value = self.pop(at)?;
                self.stack.push(value.with_payload(!value.payload()));
            }
            NotM => {
                let dest = self.fetch()?;
                let value = self.pop_cell(at)?;
                self.data_write(dest, !value, at)?;
            }

            Inc | Dec => {
                let addr = self.fetch()?;
                let value = self.data_read(addr, at)?;
                let value = if op == Inc {
                    value.wrapping_add(1)
                } else {
                    value.wrapping_sub(1)
                };
                self.data_write(addr, value, at)?;
            }

            Cmp => {
                let addr = self.fetch()?;
                let rhs = self.fetch()?;
                let lhs = self.data_read(addr, at)?;
                self.flag = lhs.cmp(&rhs).into();
            }
            CmpM => {
                let lhs_addr = self.fetch()?;
                let rhs_addr = self.fetch()?;
                let lhs = self.data_read(lhs_addr, at)?;
                let rhs = self.data_read(rhs_addr, at)?;
                self.flag = lhs.cmp(&rhs).into();
            }

            Jmp | Jeq | Jne | Jgt | Jlt | Jge | Jle => {
                let target = self.fetch()?;
                let taken = match op {
                    Jmp => true,
                    Jeq => self.flag == CmpFlag::Equal,
                    Jne => self.flag != CmpFlag::Equal,
                    Jgt => self.flag == CmpFlag::Greater,
                    Jlt => self.flag == CmpFlag::Less,
                    Jge => self.flag != CmpFlag::Less,
                    Jle => self.flag != CmpFlag::Greater,
                    _ => unreachable!(),
                };
                if taken {
                    self.pc = target;
                }
            }
            Call => {
                let target = self.fetch()?;
                self.calls.push(self.pc);
                self.pc = target;
            }
            Ret => {
                self.pc = self
                    .calls
                    .pop()
                    .ok_or(RuntimeError::CallStackUnderflow { pc: at })?;
            }

            PutP => {
                let color = self.fetch()?;
                self.draw_pixel(color, at)?;
            }
            PutPM => {
                let addr = self.fetch()?;
                let color = self.data_read(addr, at)?;
                self.draw_pixel(color, at)?;
            }
            PutS => {
                let addr = self.fetch()?;
                let y = self.pop_cell(at)?;
                let x = self.pop_cell(at)?;
                // A leftover stack entry is the frame index; nothing left
                // means frame 0.
                let frame = if self.stack.is_empty() {
                    0
                } else {
                    self.pop_cell(at)?
                };
                let sprite = self.read_sprite(addr, frame, at)?;
                self.video.blit(self.ram.video_mut(), x, y, &sprite);
            }

            Sys => {
                let code = self.fetch()?;
                let call = SysCall::try_from(code)
                    .map_err(|code| RuntimeError::UnknownSysCall { pc: at, code })?;
                match call {
                    SysCall::None => {}
                    SysCall::ClearScreen => {
                        let color = if self.stack.is_empty() {
                            0
                        } else {
                            self.pop_cell(at)?
                        };
                        self.video.clear(self.ram.video_mut(), color);
                    }
                    SysCall::Flip => self.video.mark_dirty(),
                }
            }
        }
        Ok(())
    }

    /// Read the cell under the program counter and advance it.
    fn fetch(&mut self) -> Result<Cell, RuntimeError> {
        let addr = self.pc as usize;
        let cell = *self
            .ram
            .program()
            .get(addr)
            .ok_or(RuntimeError::PcOutOfBounds { pc: self.pc })?;
        self.pc += 1;
        Ok(cell)
    }

    fn pop(&mut self, at: Cell) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow { pc: at })
    }

    /// Pop and unpack: literals pass through, addresses dereference the
    /// data region.
    fn pop_cell(&mut self, at: Cell) -> Result<Cell, RuntimeError> {
        match self.pop(at)? {
            Value::Lit(value) => Ok(value),
            Value::Addr(addr) => self.data_read(addr, at),
        }
    }

    fn data_read(&self, addr: Cell, at: Cell) -> Result<Cell, RuntimeError> {
        self.ram
            .data()
            .get(addr as usize)
            .copied()
            .ok_or(RuntimeError::DataOutOfBounds { pc: at, addr })
    }

    fn data_write(&mut self, addr: Cell, value: Cell, at: Cell) -> Result<(), RuntimeError> {
        match self.ram.data_mut().get_mut(addr as usize) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(RuntimeError::DataOutOfBounds { pc: at, addr }),
        }
    }

    /// Pop y then x (unpacked) and write one pixel.
    fn draw_pixel(&mut self, color: Cell, at: Cell) -> Result<(), RuntimeError> {
        let y = self.pop_cell(at)?;
        let x = self.pop_cell(at)?;
        self.video.put(self.ram.video_mut(), x, y, color);
        Ok(())
    }

    /// Copy 64 cells starting at `data[addr + 64*frame]`.
    fn read_sprite(
        &self,
        addr: Cell,
        frame: Cell,
        at: Cell,
    ) -> Result<[Cell; SPRITE_CELLS], RuntimeError> {
        let base = addr as usize + SPRITE_CELLS * frame as usize;
        let cells = self
            .ram
            .data()
            .get(base..base + SPRITE_CELLS)
            .ok_or(RuntimeError::DataOutOfBounds { pc: at, addr: base as Cell })?;
        let mut sprite = [0; SPRITE_CELLS];
        sprite.copy_from_slice(cells);
        Ok(sprite)
    }

    fn binary(&mut self, op: OpCode, at: Cell) -> Result<Cell, RuntimeError> {
        use OpCode::*;
        // The value pushed first is the left operand: `push 5, push 3, sub`
        // leaves 2.
        let b = self.pop_cell(at)?;
        let a = self.pop_cell(at)?;
        Ok(match op {
            Add | AddM => a.wrapping_add(b),
            Sub | SubM => a.wrapping_sub(b),
            Mul | MulM => a.wrapping_mul(b),
            Div | DivM => {
                if b == 0 {
                    return Err(RuntimeError::DivisionByZero { pc: at });
                }
                a / b
            }
            And | AndM => a & b,
            Or | OrM => a | b,
            Xor | XorM => a ^ b,
            _ => unreachable!(),
        })
    }

    pub fn halt(&mut self) {
        self.halted = true;
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    pub fn pc(&self) -> Cell {
        self.pc
    }

    pub fn flag(&self) -> CmpFlag {
        self.flag
    }

    pub fn dirty(&self) -> bool {
        self.video.dirty()
    }

    pub fn mark_presented(&mut self) {
        self.video.mark_presented();
    }

    /// The current frame: the video region, row-major.
    pub fn frame(&self) -> &[Cell] {
        self.ram.video()
    }

    /// The data region, for inspecting program results.
    pub fn data(&self) -> &[Cell] {
        self.ram.data()
    }

    /// Read-only copy of the whole address space, for the dump boundary.
    pub fn snapshot(&self) -> Vec<Cell> {
        self.ram.snapshot()
    }
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new()
    }
}

fn shift(left: bool, value: Cell, amount: Cell) -> Cell {
    if left {
        value.wrapping_shl(amount)
    } else {
        value.wrapping_shr(amount)
    }
}
