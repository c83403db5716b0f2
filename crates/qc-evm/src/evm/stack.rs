//! # EVM Stack
//!
//! Stack management for EVM execution.
//! Maximum 1024 elements per EVM specification.

use crate::domain::value_objects::U256;
use crate::errors::VmError;

/// Maximum stack size per EVM specification.
pub const MAX_STACK_SIZE: usize = 1024;

/// EVM stack implementation.
///
/// A LIFO stack holding 256-bit values, bounded by `limit` (1024 by default).
#[derive(Clone, Debug)]
pub struct Stack {
    data: Vec<U256>,
    limit: usize,
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl Stack {
    /// Creates a new empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(MAX_STACK_SIZE)
    }

    /// Creates an empty stack holding at most `limit` items.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            data: Vec::with_capacity(64), // Pre-allocate for common case
            limit,
        }
    }

    /// Returns the number of elements on the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Push a value onto the stack.
    ///
    /// # Errors
    ///
    /// Returns `StackOverflow` if the stack is full.
    pub fn push(&mut self, value: U256) -> Result<(), VmError> {
        if self.data.len() >= self.limit {
            return Err(VmError::StackOverflow);
        }
        self.data.push(value);
        Ok(())
    }

    /// Pop a value from the stack.
    ///
    /// # Errors
    ///
    /// Returns `StackUnderflow` if the stack is empty.
    pub fn pop(&mut self) -> Result<U256, VmError> {
        self.data.pop().ok_or(VmError::StackUnderflow)
    }

    /// Pop `N` values, top first.
    ///
    /// Nothing is removed when fewer than `N` values are present.
    ///
    /// # Errors
    ///
    /// Returns `StackUnderflow` if the stack holds fewer than `N` values.
    pub fn pop_n<const N: usize>(&mut self) -> Result<[U256; N], VmError> {
        if self.data.len() < N {
            return Err(VmError::StackUnderflow);
        }
        let mut values = [U256::zero(); N];
        for value in &mut values {
            *value = self.data.pop().ok_or(VmError::StackUnderflow)?;
        }
        Ok(values)
    }

    /// Peek at a value at a given depth (0 = top).
    ///
    /// # Errors
    ///
    /// Returns `StackUnderflow` if the index is out of bounds.
    pub fn peek(&self, depth: usize) -> Result<U256, VmError> {
        if depth >= self.data.len() {
            return Err(VmError::StackUnderflow);
        }
        Ok(self.data[self.data.len() - 1 - depth])
    }

    /// Swap the top element with the element at depth n (1-indexed).
    /// SWAP1 swaps top with second element (n=1).
    ///
    /// # Errors
    ///
    /// Returns `StackUnderflow` if not enough elements.
    pub fn swap(&mut self, n: usize) -> Result<(), VmError> {
        if n == 0 || n >= self.data.len() {
            return Err(VmError::StackUnderflow);
        }
        let len = self.data.len();
        self.data.swap(len - 1, len - 1 - n);
        Ok(())
    }

    /// Duplicate the n-th element from the top (1-indexed) and push it.
    /// DUP1 duplicates the top element (n=1).
    ///
    /// # Errors
    ///
    /// Returns `StackUnderflow` if not enough elements, `StackOverflow` if full.
    pub fn dup(&mut self, n: usize) -> Result<(), VmError> {
        if n == 0 || n > self.data.len() {
            return Err(VmError::StackUnderflow);
        }
        if self.data.len() >= self.limit {
            return Err(VmError::StackOverflow);
        }
        let value = self.data[self.data.len() - n];
        self.data.push(value);
        Ok(())
    }

    /// Get a reference to the underlying data (bottom first).
    #[must_use]
    pub fn as_slice(&self) -> &[U256] {
        &self.data
    }
}

// =============================================================================
// TESTS
// =============================================================================
