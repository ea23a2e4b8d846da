//! The reference machine driven by the monitor.

use thiserror::Error;

use crate::plat::{Word, EBREAK};

pub mod emulator;
pub mod ram;
pub mod registers;
pub mod watchpoint;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmuError {
    #[error("image of {size} bytes does not fit in {capacity} bytes of memory")]
    ImageTooLarge { size: usize, capacity: usize },
}

/// Runs when no image is given: three instructions, then the trap.
pub const DEFAULT_IMAGE: [Word; 5] = [
    0x0000_0297, // auipc t0,0
    0x0002_8823, // sb  zero,16(t0)
    0x0102_c503, // lbu a0,16(t0)
    EBREAK,
    0xdead_beef, // some data
];

/// [`DEFAULT_IMAGE`] as the bytes that get loaded into memory.
pub fn default_image() -> Vec<u8> {
    DEFAULT_IMAGE.iter().flat_map(|w| w.to_le_bytes()).collect()
}
