//! Common platform code shared by the monitor, the expression evaluator and the emulator.
//!
//! The monitor never touches the emulated machine directly. Everything it needs goes through
//! the narrow traits defined here, so any machine implementing them can be driven by a
//! [`Session`](crate::sdb::Session).

use std::{
    fmt,
    io::{self, Write},
};

use thiserror::Error;

use crate::expr::Expr;

/// A 4-byte machine word.
pub type Word = u32;

/// A guest physical address.
pub type PAddr = u32;

/// Base address of guest physical memory.
pub const PMEM_BASE: PAddr = 0x8000_0000;

/// Default size of guest physical memory (128 MiB).
pub const PMEM_SIZE: usize = 0x800_0000;

/// Where the program counter points after reset.
pub const RESET_VECTOR: PAddr = PMEM_BASE;

/// The `ebreak` instruction. Guest programs execute it to hand control back to the emulator,
/// with the exit code in `a0`.
pub const EBREAK: Word = 0x0010_0073;

/// An error raised by one of the machine collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("address = 0x{addr:08x} is out of bound of pmem [0x{base:08x}, 0x{end:08x}]")]
    OutOfBound { addr: PAddr, base: PAddr, end: PAddr },
    #[error("the watchpoint pool has not been initialized")]
    PoolUninitialized,
    #[error("no free watchpoint left (at most {0} can be armed)")]
    PoolExhausted(usize),
    #[error("no watchpoint number {0}")]
    NoSuchWatchpoint(u32),
}

/// Type alias for Result<T, [PlatformError]>.
pub type PResult<T> = Result<T, PlatformError>;

/// The 32 general purpose registers of RV32, by ABI name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Register {
    /// Hardwired zero
    Zero = 0,
    Ra,
    Sp,
    Gp,
    Tp,
    T0,
    T1,
    T2,
    S0,
    S1,
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    S2,
    S3,
    S4,
    S5,
    S6,
    S7,
    S8,
    S9,
    S10,
    S11,
    T3,
    T4,
    T5,
    T6,
}

const REGISTER_NAMES: [&str; 32] = [
    "$0", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

impl Register {
    /// Every register, in encoding order.
    pub const ALL: [Register; 32] = [
        Self::Zero,
        Self::Ra,
        Self::Sp,
        Self::Gp,
        Self::Tp,
        Self::T0,
        Self::T1,
        Self::T2,
        Self::S0,
        Self::S1,
        Self::A0,
        Self::A1,
        Self::A2,
        Self::A3,
        Self::A4,
        Self::A5,
        Self::A6,
        Self::A7,
        Self::S2,
        Self::S3,
        Self::S4,
        Self::S5,
        Self::S6,
        Self::S7,
        Self::S8,
        Self::S9,
        Self::S10,
        Self::S11,
        Self::T3,
        Self::T4,
        Self::T5,
        Self::T6,
    ];

    /// The ABI name of the register, as shown by `info r`.
    pub fn name(self) -> &'static str {
        REGISTER_NAMES[self as usize]
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Anything an expression can name as a register: a GPR or the program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegRef {
    Gpr(Register),
    Pc,
}

impl fmt::Display for RegRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpr(reg) => reg.fmt(f),
            Self::Pc => f.write_str("pc"),
        }
    }
}

/// How far [`ExecutionControl::execute`] should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Steps {
    /// Run exactly this many instructions, unless something stops the machine first.
    Exactly(u64),
    /// Free-run until the machine stops by itself.
    UntilStop,
}

impl Steps {
    pub fn limit(self) -> Option<u64> {
        match self {
            Self::Exactly(n) => Some(n),
            Self::UntilStop => None,
        }
    }
}

/// A watchpoint whose value changed during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchpointHit {
    pub no: u32,
    pub expr: String,
    pub old: i32,
    pub new: i32,
}

/// Why [`ExecutionControl::execute`] handed control back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The requested number of steps completed.
    StepsDone,
    /// A watchpoint fired.
    Watchpoint(WatchpointHit),
    /// The guest executed its trap instruction.
    Halted { pc: PAddr, code: Word },
    /// The guest did something the machine cannot continue from.
    Aborted { pc: PAddr },
    /// The guest had already finished before this request.
    Ended,
}

/// Runs the emulated CPU.
pub trait ExecutionControl {
    /// Runs the CPU for the given number of steps. Blocks until the machine stops.
    fn execute(&mut self, steps: Steps) -> StopReason;

    /// Marks the machine as quit by the operator.
    fn quit(&mut self);
}

/// Named register lookup and formatting.
pub trait RegisterAccess {
    fn reg_value(&self, reg: RegRef) -> Word;

    /// Writes a formatted dump of every register.
    fn display_registers(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// Word-sized guest memory reads.
pub trait MemoryAccess {
    fn read_word(&self, addr: PAddr) -> PResult<Word>;
}

/// Lifecycle and bookkeeping of the watchpoint pool. Matching happens inside the machine.
pub trait WatchpointControl {
    /// Prepares an empty pool. Must be called once before any other method.
    fn init_watchpoint_pool(&mut self);

    /// Arms a watchpoint on `expr`, whose current value is `value`, and returns its number.
    fn set_watchpoint(&mut self, text: &str, expr: Expr, value: i32) -> PResult<u32>;

    fn delete_watchpoint(&mut self, no: u32) -> PResult<()>;

    fn display_watchpoints(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// Everything the monitor needs from a machine.
pub trait Machine: ExecutionControl + RegisterAccess + MemoryAccess + WatchpointControl {}

impl<T> Machine for T where T: ExecutionControl + RegisterAccess + MemoryAccess + WatchpointControl {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_names() {
        assert_eq!(Register::Zero.name(), "$0");
        assert_eq!(Register::S0.name(), "s0");
        assert_eq!(Register::T6.name(), "t6");
        for (i, reg) in Register::ALL.iter().enumerate() {
            assert_eq!(reg.index(), i);
        }
    }

    #[test]
    fn test_regref_display() {
        assert_eq!(RegRef::Pc.to_string(), "pc");
        assert_eq!(RegRef::Gpr(Register::A0).to_string(), "a0");
    }

    #[test]
    fn test_steps_limit() {
        assert_eq!(Steps::Exactly(3).limit(), Some(3));
        assert_eq!(Steps::UntilStop.limit(), None);
    }
}
