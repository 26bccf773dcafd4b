use std::sync::{Arc, Mutex};

use crate::error::RuntimeError;
use crate::memory::Cell;
use crate::runtime::Machine;

/// A machine shared between the engine loop and a presentation loop.
///
/// All access goes through one mutex, so neither side can observe the pixel
/// buffer mid-mutation. [`Console::step`] refuses to dispatch while a dirty
/// frame waits — the consumer's backpressure on the engine — and
/// [`Console::present`] hands the consumer a fully-drawn frame under the
/// lock, clearing the flag on the way out. Clones share the same machine.
#[derive(Clone)]
pub struct Console {
    machine: Arc<Mutex<Machine>>,
}

impl Console {
    pub fn new(machine: Machine) -> Self {
        Console {
            machine: Arc::new(Mutex::new(machine)),
        }
    }

    /// Tick the engine once, unless a frame is waiting to be presented.
    /// Returns whether the machine can still make progress.
    pub fn step(&self) -> Result<bool, RuntimeError> {
        let mut machine = self.machine.lock().unwrap();
        if machine.halted() {
            return Ok(false);
        }
        if machine.dirty() {
            return Ok(true);
        }
        machine.tick()?;
        Ok(!machine.halted())
    }

    /// Give the consumer the current frame if one is waiting. Returns
    /// whether anything was presented.
    pub fn present<F>(&self, show: F) -> bool
    where
        F: FnOnce(&[Cell]),
    {
        let mut machine = self.machine.lock().unwrap();
        if !machine.dirty() {
            return false;
        }
        show(machine.frame());
        machine.mark_presented();
        true
    }

    /// External quit signal; terminal like the halt instruction.
    pub fn halt(&self) {
        self.machine.lock().unwrap().halt();
    }

    pub fn is_halted(&self) -> bool {
        self.machine.lock().unwrap().halted()
    }

    /// Read-only copy of the whole address space.
    pub fn snapshot(&self) -> Vec<Cell> {
        self.machine.lock().unwrap().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;

    fn console(src: &str) -> Console {
        let program = assemble(src).unwrap();
        let mut machine = Machine::new();
        machine.load(&program);
        Console::new(machine)
    }

    fn pc(console: &Console) -> Cell {
        console.machine.lock().unwrap().pc()
    }

    #[test]
    fn dirty_frame_pauses_the_engine() {
        let console = console("push 0\npush 0\nputp 3\ninc &x\nhalt\nlet x");
        // push, push, putp: the surface is now dirty.
        for _ in 0..3 {
            console.step().unwrap();
        }
        let stalled = pc(&console);
        for _ in 0..10 {
            assert!(console.step().unwrap());
            assert_eq!(pc(&console), stalled);
        }
        // The inc must not have run while stalled.
        assert_eq!(console.machine.lock().unwrap().data()[0], 0);
    }

    #[test]
    fn presenting_unblocks_the_engine() {
        let console = console("push 0\npush 0\nputp 3\ninc &x\nhalt\nlet x");
        for _ in 0..3 {
            console.step().unwrap();
        }
        let mut seen = Vec::new();
        assert!(console.present(|frame| seen = frame.to_vec()));
        assert_eq!(seen[0], 3);
        while console.step().unwrap() {}
        assert_eq!(console.machine.lock().unwrap().data()[0], 1);
        assert!(console.is_halted());
    }

    #[test]
    fn present_without_a_frame_is_a_noop() {
        let console = console("halt");
        let mut called = false;
        assert!(!console.present(|_| called = true));
        assert!(!called);
    }

    #[test]
    fn external_halt_is_terminal() {
        let console = console("loop: jmp loop");
        console.step().unwrap();
        console.halt();
        assert!(!console.step().unwrap());
        assert!(console.is_halted());
    }

    #[test]
    fn clones_share_one_machine() {
        let console = console("push 1\npop &x\nhalt\nlet x");
        let viewer = console.clone();
        while console.step().unwrap() {}
        assert!(viewer.is_halted());
        assert_eq!(viewer.snapshot(), console.snapshot());
    }
}
