//! # QC-EVM - Bytecode Execution Engine
//!
//! ## Purpose
//!
//! Executes EVM bytecode for an Ethereum-compatible execution client. Given a
//! root [`Message`](domain::Message) and a [`Ledger`](ports::Ledger), the
//! engine runs the call tree deterministically, meters gas and either commits
//! or rolls back every frame's state changes.
//!
//! Forks from Frontier through Shanghai are supported; the active fork gates
//! opcode availability, gas schedule, refund rules and contract deployment
//! checks.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | Gas used never exceeds the limit | `domain/invariants.rs` - `check_gas_limit_invariant()` |
//! | Failed frames surface no logs or self-destructs | `domain/invariants.rs` - `check_revert_rollback_invariant()` |
//! | Errors other than revert consume all gas | `domain/invariants.rs` - `check_error_gas_invariant()` |
//! | Refund capped by the fork quotient | `domain/invariants.rs` - `check_refund_cap_invariant()` |
//! | Call depth limit | `evm/system.rs` - child spawning, `domain/invariants.rs` |
//! | Static frames never change state | `evm/system.rs` - handler preambles |
//!
//! ## Execution Safety Limits
//!
//! | Limit | Value | Purpose |
//! |-------|-------|---------|
//! | `max_call_depth` | 1024 | Bound the frame stack |
//! | `max_code_size` | 24 KB (EIP-170) | Limit contract size |
//! | `max_init_code_size` | 48 KB (EIP-3860) | Limit deployment code |
//! | `stack_limit` | 1024 | EVM stack limit |
//!
//! ## Outbound Dependencies
//!
//! | Collaborator | Trait | Purpose |
//! |--------------|-------|---------|
//! | World state | `StateProvider` / `Ledger` | Accounts, code, storage, snapshots |
//! | Precompiles | `PrecompileSet` | Native contracts |
//! | Observability | `Tracer` | Frame and opcode hooks |
//!
//! ## EVM Components
//!
//! | Component | Location | Purpose |
//! |-----------|----------|---------|
//! | Engine | `evm/engine.rs` | Frame stack driver |
//! | Interpreter | `evm/interpreter.rs` | Dispatch loop |
//! | Stack | `evm/stack.rs` | 1024-item stack |
//! | Memory | `evm/memory.rs` | Dynamic memory with gas |
//! | Gas | `evm/gas.rs` | Cost tables & calculations |
//! | Precompiles | `evm/precompiles/` | ecrecover, sha256, identity |
//!
//! ## Usage Example
//!
//! ```
//! use qc_evm::prelude::*;
//!
//! let contract = Address::from_low_u64(0xC0DE);
//! let mut ledger = SnapshotLedger::default();
//! // PUSH1 1, PUSH1 2, ADD, PUSH1 0, MSTORE, PUSH1 32, PUSH1 0, RETURN
//! ledger.set_code(
//!     contract,
//!     Bytes::from_slice(&[0x60, 1, 0x60, 2, 0x01, 0x60, 0, 0x52, 0x60, 32, 0x60, 0, 0xF3]),
//! );
//!
//! let mut evm = Evm::new(
//!     &mut ledger,
//!     StandardPrecompiles::new(),
//!     NoopTracer,
//!     Environment::default(),
//!     VmConfig::for_fork(Fork::Shanghai),
//! );
//! let message = Message::call(Address::from_low_u64(1), contract, U256::zero(), Bytes::new(), 100_000);
//! let result = evm.execute(message);
//!
//! assert!(result.is_success());
//! assert_eq!(U256::from_big_endian(result.output.as_slice()), U256::from(3));
//! ```

// Crate-level lints
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]

// =============================================================================
// MODULES
// =============================================================================

pub mod adapters;
pub mod domain;
pub mod errors;
pub mod evm;
pub mod ports;

// =============================================================================
// PRELUDE
// =============================================================================

/// Convenient re-exports for common usage.
pub mod prelude {
    // Domain entities
    pub use crate::domain::entities::{
        AccountState, BlockContext, CallKind, Environment, ExecutionResult, ExecutionStatus, Log,
        Message, StateChange, TxContext, VmConfig,
    };
    pub use crate::domain::fork::Fork;

    // Value objects
    pub use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue, U256};

    // Domain services
    pub use crate::domain::services::{
        compute_contract_address, compute_contract_address_create2, keccak256, precompiles,
    };

    // Invariants
    pub use crate::domain::invariants::{
        check_all_invariants, InvariantCheckResult, InvariantViolation,
    };

    // Ports
    pub use crate::ports::inbound::MessageExecutor;
    pub use crate::ports::outbound::{AccessStatus, Ledger, SnapshotId, StateProvider};
    pub use crate::ports::tracer::{NoopTracer, Tracer};

    // Errors
    pub use crate::errors::{ConfigError, PrecompileError, StateError, VmError};

    // EVM components
    pub use crate::evm::{
        gas, Evm, GasMeter, Instruction, Memory, NoPrecompiles, Precompile, PrecompileSet,
        Stack, StandardPrecompiles,
    };

    // Adapters
    pub use crate::adapters::{InMemoryAccessList, InMemoryState, JournaledLedger, SnapshotLedger};
}

// =============================================================================
// CRATE INFO
// =============================================================================

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// TESTS
// =============================================================================
