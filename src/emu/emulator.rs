use std::io::{self, Write};

use crate::{
    expr::Expr,
    plat::{
        ExecutionControl, MemoryAccess, PAddr, PResult, RegRef, Register, RegisterAccess, Steps,
        StopReason, WatchpointControl, Word, EBREAK,
    },
};

use super::{ram::Ram, registers::EmuRegisters, watchpoint::WatchpointPool, EmuError};

/// The emulator's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmuState {
    /// Executing instructions.
    Running,
    /// Paused, waiting for the monitor to resume it.
    Stop,
    /// The guest executed `ebreak`. Execution cannot resume.
    End,
    /// Execution failed, e.g. the PC left physical memory. Execution cannot resume.
    Abort,
    /// The operator quit the monitor.
    Quit,
}

/// The main emulation context.
///
/// Only the trap instruction is interpreted: every other word just advances the PC. Instruction
/// semantics belong to an ISA backend outside this crate.
pub struct Emulator {
    pub registers: EmuRegisters,
    pub ram: Ram,
    pub state: EmuState,
    /// PC of the instruction that ended or aborted execution.
    pub halt_pc: PAddr,
    /// Value of `a0` when the guest trapped.
    pub halt_ret: Word,
    /// Instructions executed so far.
    pub instr_count: u64,
    watchpoints: WatchpointPool,
}

impl Emulator {
    /// Creates an emulator over `ram` with the PC at the start of memory.
    pub fn new(ram: Ram) -> Self {
        let mut registers = EmuRegisters::default();
        registers.pc = ram.base();
        Self {
            registers,
            ram,
            state: EmuState::Stop,
            halt_pc: 0,
            halt_ret: 0,
            instr_count: 0,
            watchpoints: WatchpointPool::default(),
        }
    }

    /// Loads a raw binary image at the start of memory and returns its size.
    pub fn load_image(&mut self, image: &[u8]) -> Result<usize, EmuError> {
        self.ram.load(image)
    }

    /// Executes the instruction at the PC.
    fn exec_once(&mut self) -> PResult<()> {
        let pc = self.registers.pc;
        let inst = self.ram.read_word(pc)?;
        log::trace!("0x{:08x}: {:08x}", pc, inst);
        if inst == EBREAK {
            self.state = EmuState::End;
            self.halt_pc = pc;
            self.halt_ret = self.registers.read(RegRef::Gpr(Register::A0));
        } else {
            self.registers.pc = pc.wrapping_add(4);
        }
        Ok(())
    }

    /// Re-evaluates the watchpoints against the current machine state.
    fn check_watchpoints(&mut self) -> Option<StopReason> {
        let mut pool = std::mem::take(&mut self.watchpoints);
        let hit = pool.check(&*self);
        self.watchpoints = pool;
        hit.map(StopReason::Watchpoint)
    }

    /// Returns true if the process should exit with a failure status.
    pub fn is_exit_status_bad(&self) -> bool {
        let good = match self.state {
            EmuState::End => self.halt_ret == 0,
            EmuState::Quit | EmuState::Stop | EmuState::Running => true,
            EmuState::Abort => false,
        };
        !good
    }
}

impl ExecutionControl for Emulator {
    fn execute(&mut self, steps: Steps) -> StopReason {
        match self.state {
            EmuState::End | EmuState::Abort => return StopReason::Ended,
            _ => self.state = EmuState::Running,
        }

        let mut remaining = steps.limit();
        while remaining != Some(0) {
            if let Some(n) = remaining.as_mut() {
                *n -= 1;
            }
            let pc = self.registers.pc;
            if let Err(err) = self.exec_once() {
                log::error!("{}", err);
                self.state = EmuState::Abort;
                self.halt_pc = pc;
                return StopReason::Aborted { pc };
            }
            self.instr_count += 1;
            if self.state == EmuState::End {
                log::info!(
                    "trap at pc = 0x{:08x} with code {} after {} instructions",
                    self.halt_pc,
                    self.halt_ret,
                    self.instr_count
                );
                return StopReason::Halted {
                    pc: self.halt_pc,
                    code: self.halt_ret,
                };
            }
            if let Some(reason) = self.check_watchpoints() {
                self.state = EmuState::Stop;
                return reason;
            }
        }

        self.state = EmuState::Stop;
        StopReason::StepsDone
    }

    fn quit(&mut self) {
        self.state = EmuState::Quit;
    }
}

impl RegisterAccess for Emulator {
    fn reg_value(&self, reg: RegRef) -> Word {
        self.registers.read(reg)
    }

    fn display_registers(&self, out: &mut dyn Write) -> io::Result<()> {
        self.registers.display(out)
    }
}

impl MemoryAccess for Emulator {
    fn read_word(&self, addr: PAddr) -> PResult<Word> {
        self.ram.read_word(addr)
    }
}

impl WatchpointControl for Emulator {
    fn init_watchpoint_pool(&mut self) {
        self.watchpoints.init();
    }

    fn set_watchpoint(&mut self, text: &str, expr: Expr, value: i32) -> PResult<u32> {
        self.watchpoints.arm(text, expr, value)
    }

    fn delete_watchpoint(&mut self, no: u32) -> PResult<()> {
        self.watchpoints.remove(no).map(|_| ())
    }

    fn display_watchpoints(&self, out: &mut dyn Write) -> io::Result<()> {
        self.watchpoints.display(out)
    }
}
