//! # Error Types
//!
//! All error types for bytecode execution.
//!
//! Errors raised inside a frame never unwind into the parent frame. The engine
//! turns them into that frame's [`ExecutionResult`](crate::domain::ExecutionResult)
//! and the parent observes a plain failure value.

use crate::domain::value_objects::{Address, U256};
use thiserror::Error;

// =============================================================================
// VM ERRORS
// =============================================================================

/// Errors that can occur during EVM execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VmError {
    /// Pop or peek past the bottom of the stack.
    #[error("stack underflow")]
    StackUnderflow,

    /// Push onto a full stack (1024 items).
    #[error("stack overflow")]
    StackOverflow,

    /// Execution ran out of gas.
    #[error("out of gas")]
    OutOfGas,

    /// JUMP/JUMPI target is not a JUMPDEST.
    #[error("invalid jump destination: {0}")]
    InvalidJumpDestination(usize),

    /// Opcode is unassigned, unavailable on the active fork, or INVALID (0xFE).
    #[error("invalid instruction: 0x{0:02X}")]
    InvalidInstruction(u8),

    /// State-modifying opcode inside a static frame.
    #[error("state change in static context")]
    StaticStateChangeViolation,

    /// Access outside the addressable range (memory writes, RETURNDATACOPY).
    #[error("out of bounds memory access: offset {offset}, size {size}")]
    OutOfBoundsMemoryAccess { offset: usize, size: usize },

    /// Call depth exceeded maximum.
    #[error("call depth exceeded: {depth} > {max}")]
    CallDepthExceeded { depth: usize, max: usize },

    /// Account nonce would wrap around.
    #[error("nonce overflow for {0:?}")]
    NonceOverflow(Address),

    /// CREATE target already has code or a nonce.
    #[error("address collision at {0:?}")]
    AddressCollision(Address),

    /// Precompiled contract failed.
    #[error("precompile failure: {0}")]
    PrecompileFailure(#[from] PrecompileError),

    /// Execution reverted. The data lives in the result output and unused gas is kept.
    #[error("execution reverted")]
    Revert,

    /// Deployed code exceeds the EIP-170 limit.
    #[error("code size exceeded: {size} > {max} bytes")]
    CodeSizeExceeded { size: usize, max: usize },

    /// Init code exceeds the EIP-3860 limit.
    #[error("init code size exceeded: {size} > {max} bytes")]
    InitCodeSizeExceeded { size: usize, max: usize },

    /// Deployed code starts with 0xEF (EIP-3541).
    #[error("code starts with 0xEF byte")]
    InvalidCodePrefix,

    /// Insufficient balance for a value transfer.
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: U256, available: U256 },

    /// Ledger rejected an operation.
    #[error("state error: {0}")]
    State(#[from] StateError),
}

impl VmError {
    /// Returns true for REVERT, which keeps unused gas.
    #[must_use]
    pub fn is_revert(&self) -> bool {
        matches!(self, Self::Revert)
    }

    /// Returns true if this error consumes all gas of the frame.
    ///
    /// Revert keeps unused gas. Aborts raised before any code runs (nonce
    /// overflow, failed value transfer, depth) hand the whole limit back.
    #[must_use]
    pub fn consumes_all_gas(&self) -> bool {
        !matches!(
            self,
            Self::Revert
                | Self::NonceOverflow(_)
                | Self::InsufficientBalance { .. }
                | Self::CallDepthExceeded { .. }
        )
    }
}

// =============================================================================
// STATE ERRORS
// =============================================================================

/// Errors from ledger operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Balance subtraction would go below zero.
    #[error("insufficient balance for {address:?}: required {required}, available {available}")]
    InsufficientBalance {
        address: Address,
        required: U256,
        available: U256,
    },

    /// Balance addition would exceed 2^256 - 1.
    #[error("balance overflow for {0:?}")]
    BalanceOverflow(Address),

    /// Nonce increment would exceed 2^64 - 1.
    #[error("nonce overflow for {0:?}")]
    NonceOverflow(Address),

    /// Commit or rollback with a token that is not open.
    #[error("unknown snapshot: {0}")]
    UnknownSnapshot(usize),
}

// =============================================================================
// PRECOMPILE ERRORS
// =============================================================================

/// Errors from precompiled contract execution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PrecompileError {
    /// Gas limit below the precompile's cost.
    #[error("precompile out of gas")]
    OutOfGas,

    /// Input cannot be processed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

// =============================================================================
// CONFIG ERRORS
// =============================================================================

/// Errors while loading a [`VmConfig`](crate::domain::VmConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Malformed JSON.
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Well-formed but unusable value.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vm_error_display() {
        let err = VmError::OutOfGas;
        assert_eq!(err.to_string(), "out of gas");

        let err = VmError::InvalidInstruction(0xFE);
        assert_eq!(err.to_string(), "invalid instruction: 0xFE");

        let err = VmError::CallDepthExceeded {
            depth: 1025,
            max: 1024,
        };
        assert_eq!(err.to_string(), "call depth exceeded: 1025 > 1024");
    }

    #[test]
    fn test_vm_error_consumes_gas() {
        assert!(VmError::OutOfGas.consumes_all_gas());
        assert!(VmError::InvalidInstruction(0xFF).consumes_all_gas());
        assert!(VmError::AddressCollision(Address::ZERO).consumes_all_gas());
        assert!(!VmError::Revert.consumes_all_gas());
        assert!(!VmError::NonceOverflow(Address::ZERO).consumes_all_gas());
        assert!(VmError::Revert.is_revert());
    }

    #[test]
    fn test_state_error_conversion() {
        let state_err = StateError::NonceOverflow(Address::ZERO);
        let vm_err: VmError = state_err.into();
        assert!(matches!(vm_err, VmError::State(_)));
    }

    #[test]
    fn test_precompile_error_conversion() {
        let vm_err: VmError = PrecompileError::OutOfGas.into();
        assert_eq!(vm_err, VmError::PrecompileFailure(PrecompileError::OutOfGas));
        assert!(vm_err.consumes_all_gas());
    }

    #[test]
    fn test_config_error_from_json() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: ConfigError = parse.unwrap_err().into();
        assert!(err.to_string().starts_with("config parse error"));
    }
}
