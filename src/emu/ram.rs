use crate::plat::{PAddr, PResult, PlatformError, Word, PMEM_BASE, PMEM_SIZE};

use super::EmuError;

/// Guest physical memory, little-endian, mapped at a fixed base address.
pub struct Ram {
    base: PAddr,
    pub memory: Box<[u8]>,
}

impl Ram {
    /// Creates a new [`Ram`] instance of `size` zeroed bytes starting at `base`.
    pub fn new(base: PAddr, size: usize) -> Self {
        Self {
            base,
            memory: vec![0u8; size].into_boxed_slice(),
        }
    }

    pub fn base(&self) -> PAddr {
        self.base
    }

    /// The last valid address.
    pub fn end(&self) -> PAddr {
        self.base
            .wrapping_add(self.memory.len() as PAddr)
            .wrapping_sub(1)
    }

    fn offset(&self, addr: PAddr, len: usize) -> PResult<usize> {
        addr.checked_sub(self.base)
            .map(|offset| offset as usize)
            .filter(|offset| {
                offset
                    .checked_add(len)
                    .map_or(false, |end| end <= self.memory.len())
            })
            .ok_or(PlatformError::OutOfBound {
                addr,
                base: self.base,
                end: self.end(),
            })
    }

    /// Reads the 4-byte word at `addr`. Unaligned reads are allowed.
    pub fn read_word(&self, addr: PAddr) -> PResult<Word> {
        let offset = self.offset(addr, 4)?;
        let bytes = &self.memory[offset..offset + 4];
        Ok(Word::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn write_word(&mut self, addr: PAddr, data: Word) -> PResult<()> {
        let offset = self.offset(addr, 4)?;
        self.memory[offset..offset + 4].copy_from_slice(&data.to_le_bytes());
        Ok(())
    }

    /// Copies a raw program image to the start of memory and returns its size.
    pub fn load(&mut self, image: &[u8]) -> Result<usize, EmuError> {
        if image.len() > self.memory.len() {
            return Err(EmuError::ImageTooLarge {
                size: image.len(),
                capacity: self.memory.len(),
            });
        }
        self.memory[..image.len()].copy_from_slice(image);
        Ok(image.len())
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new(PMEM_BASE, PMEM_SIZE)
    }
}
