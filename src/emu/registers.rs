use std::io::{self, Write};

use crate::plat::{RegRef, Register, Word, RESET_VECTOR};

/// The full set of registers in the emulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmuRegisters {
    gpr: [Word; 32],
    pub pc: Word,
}

impl EmuRegisters {
    pub fn read(&self, reg: RegRef) -> Word {
        match reg {
            RegRef::Gpr(reg) => self.gpr[reg.index()],
            RegRef::Pc => self.pc,
        }
    }

    /// Writes a general purpose register. Writes to `$0` are discarded.
    pub fn write(&mut self, reg: Register, value: Word) {
        if reg != Register::Zero {
            self.gpr[reg.index()] = value;
        }
    }

    /// Prints one `name  0x........  decimal` line per register, then `pc`.
    pub fn display(&self, out: &mut dyn Write) -> io::Result<()> {
        for reg in Register::ALL {
            let value = self.gpr[reg.index()];
            writeln!(out, "{:<4} 0x{:08x} {}", reg.name(), value, value)?;
        }
        writeln!(out, "{:<4} 0x{:08x} {}", "pc", self.pc, self.pc)
    }
}

impl Default for EmuRegisters {
    fn default() -> Self {
        Self {
            gpr: [0; 32],
            pc: RESET_VECTOR,
        }
    }
}
