//! # Code Stream
//!
//! Immutable bytecode plus the program counter. JUMPDEST analysis runs once
//! when the stream is built.

use crate::domain::value_objects::Bytes;
use crate::errors::VmError;
use crate::evm::opcodes::{JUMPDEST, PUSH1, PUSH32};

/// Bytecode being executed by one frame.
#[derive(Clone, Debug, Default)]
pub struct CodeStream {
    code: Bytes,
    pc: usize,
    /// One flag per code byte; true at a JUMPDEST outside PUSH data.
    jump_dests: Vec<bool>,
}

impl CodeStream {
    /// Wraps `code` and finds its valid jump destinations.
    #[must_use]
    pub fn new(code: Bytes) -> Self {
        let jump_dests = analyze_jump_dests(code.as_slice());
        Self {
            code,
            pc: 0,
            jump_dests,
        }
    }

    /// Current program counter.
    #[must_use]
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Opcode at the program counter, `None` past the end (implicit STOP).
    #[must_use]
    pub fn current(&self) -> Option<u8> {
        self.code.as_slice().get(self.pc).copied()
    }

    /// Moves the program counter forward.
    pub fn advance(&mut self, n: usize) {
        self.pc = self.pc.saturating_add(n);
    }

    /// Reads the `n` bytes following the current opcode, zero-padded on the
    /// right when the code ends early.
    #[must_use]
    pub fn read_immediate(&self, n: usize) -> Vec<u8> {
        let mut out = vec![0u8; n];
        let start = self.pc.saturating_add(1);
        if let Some(available) = self.code.as_slice().get(start..) {
            let len = available.len().min(n);
            out[..len].copy_from_slice(&available[..len]);
        }
        out
    }

    /// Sets the program counter to a validated jump destination.
    ///
    /// # Errors
    ///
    /// Returns `InvalidJumpDestination` unless `dest` is a JUMPDEST opcode.
    pub fn jump(&mut self, dest: usize) -> Result<(), VmError> {
        if !self.is_jump_dest(dest) {
            return Err(VmError::InvalidJumpDestination(dest));
        }
        self.pc = dest;
        Ok(())
    }

    /// Returns true if `dest` holds a JUMPDEST that is not PUSH data.
    #[must_use]
    pub fn is_jump_dest(&self, dest: usize) -> bool {
        self.jump_dests.get(dest).copied().unwrap_or(false)
    }

    /// Code length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Returns true for empty code.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Raw bytecode.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        self.code.as_slice()
    }
}

/// Analyze bytecode to find valid JUMPDEST locations.
fn analyze_jump_dests(code: &[u8]) -> Vec<bool> {
    let mut dests = vec![false; code.len()];
    let mut i = 0;

    while i < code.len() {
        let op = code[i];
        if op == JUMPDEST {
            dests[i] = true;
        }
        // Skip PUSH data bytes
        if (PUSH1..=PUSH32).contains(&op) {
            i += usize::from(op - PUSH1) + 1;
        }
        i += 1;
    }

    dests
}

// =============================================================================
// TESTS
// =============================================================================
