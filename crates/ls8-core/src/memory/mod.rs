//! Flat 256-cell main memory.

use crate::Fault;

/// Size in bytes of the flat address space.
pub const MEMORY_BYTES: usize = 256;
/// Power-on stack pointer; the stack grows downward from here.
pub const STACK_BASE: u8 = 0xF4;

/// Zero-initialised byte-addressed main memory.
///
/// Reads and writes outside `0..MEMORY_BYTES` fail instead of wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Memory {
    cells: Box<[u8]>,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            cells: vec![0; MEMORY_BYTES].into_boxed_slice(),
        }
    }
}

impl Memory {
    /// Builds a memory image with `image` copied in from address 0.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::OutOfBoundsAccess`] naming the first address that does
    /// not exist when `image` is longer than [`MEMORY_BYTES`].
    pub fn with_image(image: &[u8]) -> Result<Self, Fault> {
        if image.len() > MEMORY_BYTES {
            return Err(Fault::memory(MEMORY_BYTES));
        }
        let mut memory = Self::default();
        memory.cells[..image.len()].copy_from_slice(image);
        Ok(memory)
    }

    /// Reads one cell.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::OutOfBoundsAccess`] when `addr >= MEMORY_BYTES`.
    pub fn read(&self, addr: usize) -> Result<u8, Fault> {
        self.cells.get(addr).copied().ok_or(Fault::memory(addr))
    }

    /// Writes one cell.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::OutOfBoundsAccess`] when `addr >= MEMORY_BYTES`.
    pub fn write(&mut self, addr: usize, value: u8) -> Result<(), Fault> {
        let cell = self.cells.get_mut(addr).ok_or(Fault::memory(addr))?;
        *cell = value;
        Ok(())
    }

    /// Reads a cell for diagnostics, yielding 0 past the end.
    #[must_use]
    pub fn peek(&self, addr: usize) -> u8 {
        self.cells.get(addr).copied().unwrap_or(0)
    }

    /// Whole backing store, address 0 first.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.cells
    }
}
