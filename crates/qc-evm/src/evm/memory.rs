//! # EVM Memory
//!
//! Memory management for EVM execution.
//! Memory is a byte-addressable, expandable array with gas costs for expansion.
//!
//! Growth is always paid for first: [`Memory::extend`] charges the
//! [`GasMeter`] and only then zero-fills the new region. Writes outside the
//! extended range are rejected instead of silently growing memory.

use crate::domain::value_objects::U256;
use crate::errors::VmError;
use crate::evm::gas::GasMeter;

/// Upper bound for offsets and sizes taken from the stack (2^31 - 1).
pub const MAX_MEMORY_OFFSET: usize = 0x7FFF_FFFF;

/// Word size in bytes (32 bytes = 256 bits).
pub const WORD_SIZE: usize = 32;

/// Converts a stack value into a memory offset or size, clamped to
/// [`MAX_MEMORY_OFFSET`]. Clamped values are priced far beyond any gas limit.
#[must_use]
pub fn clamp_offset(value: U256) -> usize {
    if value > U256::from(MAX_MEMORY_OFFSET) {
        MAX_MEMORY_OFFSET
    } else {
        value.low_u64() as usize
    }
}

/// EVM memory implementation.
///
/// A byte-addressable array whose length is always a multiple of 32 and only
/// grows within one frame. Expansion costs gas (quadratic).
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Creates a new empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Returns the current memory size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if memory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the memory size in 32-byte words.
    #[must_use]
    pub fn word_size(&self) -> usize {
        self.data.len() / WORD_SIZE
    }

    /// Makes `[offset, offset + len)` addressable, charging expansion gas.
    ///
    /// A zero `len` never expands memory, whatever the offset.
    ///
    /// # Errors
    ///
    /// Returns `OutOfGas` if the expansion cannot be paid; memory is unchanged.
    pub fn extend(&mut self, offset: usize, len: usize, gas: &mut GasMeter) -> Result<(), VmError> {
        if len == 0 {
            return Ok(());
        }
        let end = (offset as u64).saturating_add(len as u64);
        if end <= self.data.len() as u64 {
            return Ok(());
        }

        let new_words = end.div_ceil(WORD_SIZE as u64);
        let old_words = self.word_size() as u64;
        gas.consume(memory_expansion_cost(old_words, new_words))?;

        let new_size = usize::try_from(new_words * WORD_SIZE as u64).map_err(|_| VmError::OutOfGas)?;
        self.data.resize(new_size, 0);
        Ok(())
    }

    /// Read `len` bytes starting at `offset`.
    /// Bytes past the end read as zero; memory never grows.
    #[must_use]
    pub fn read(&self, offset: usize, len: usize) -> Vec<u8> {
        let mut result = vec![0u8; len];
        if offset < self.data.len() {
            let available = (self.data.len() - offset).min(len);
            result[..available].copy_from_slice(&self.data[offset..offset + available]);
        }
        result
    }

    /// Read a 32-byte word as a big-endian value.
    #[must_use]
    pub fn read_word(&self, offset: usize) -> U256 {
        U256::from_big_endian(&self.read(offset, WORD_SIZE))
    }

    /// Write bytes into an already extended region.
    ///
    /// # Errors
    ///
    /// Returns `OutOfBoundsMemoryAccess` if the region was not extended.
    pub fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), VmError> {
        if data.is_empty() {
            return Ok(());
        }
        let target = offset
            .checked_add(data.len())
            .and_then(|end| self.data.get_mut(offset..end))
            .ok_or(VmError::OutOfBoundsMemoryAccess {
                offset,
                size: data.len(),
            })?;
        target.copy_from_slice(data);
        Ok(())
    }

    /// Write a single byte (MSTORE8).
    ///
    /// # Errors
    ///
    /// Returns `OutOfBoundsMemoryAccess` if the byte was not extended.
    pub fn write_byte(&mut self, offset: usize, value: u8) -> Result<(), VmError> {
        self.write(offset, &[value])
    }

    /// Write a big-endian 32-byte word (MSTORE).
    ///
    /// # Errors
    ///
    /// Returns `OutOfBoundsMemoryAccess` if the word was not extended.
    pub fn write_word(&mut self, offset: usize, value: U256) -> Result<(), VmError> {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        self.write(offset, &bytes)
    }

    /// Get a reference to the underlying data.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

/// Calculate memory gas cost.
///
/// Cost = (`word_size^2` / 512) + (3 * `word_size`)
#[must_use]
pub fn memory_gas_cost(word_size: u64) -> u64 {
    word_size
        .saturating_mul(word_size)
        .saturating_div(512)
        .saturating_add(word_size.saturating_mul(3))
}

/// Calculate incremental gas cost for memory expansion.
#[must_use]
pub fn memory_expansion_cost(old_word_size: u64, new_word_size: u64) -> u64 {
    if new_word_size <= old_word_size {
        return 0;
    }
    memory_gas_cost(new_word_size) - memory_gas_cost(old_word_size)
}

// =============================================================================
// TESTS
// =============================================================================
