//! # Test Fixtures
//!
//! Addresses, ledgers and a small bytecode assembler shared by the scenarios.

use qc_evm::evm::opcodes::{CALL, CALLCODE, MSTORE, PUSH1, PUSH20, RETURN};
use qc_evm::prelude::*;
use tracing_subscriber::EnvFilter;

/// Externally owned account that sends every root message.
pub fn sender() -> Address {
    Address::from_low_u64(0xCA11)
}

/// Default contract under test.
pub fn contract() -> Address {
    Address::from_low_u64(0xC0DE)
}

/// Second contract for nested scenarios.
pub fn callee() -> Address {
    Address::from_low_u64(0xB0B)
}

/// Installs a log subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Journaled ledger over a state holding `contracts`.
pub fn journaled(contracts: &[(Address, Bytes)]) -> JournaledLedger<InMemoryState> {
    let mut state = InMemoryState::new();
    for (address, code) in contracts {
        state.set_code(*address, code.clone());
        state.set_nonce(*address, 1);
    }
    JournaledLedger::new(state)
}

/// Snapshot ledger holding `contracts`.
pub fn snapshot(contracts: &[(Address, Bytes)]) -> SnapshotLedger {
    let mut ledger = SnapshotLedger::default();
    for (address, code) in contracts {
        ledger.set_code(*address, code.clone());
        ledger.set_nonce(*address, 1);
    }
    ledger.begin_transaction();
    ledger
}

/// Root call from [`sender`] without value or calldata.
pub fn call(to: Address, gas_limit: u64) -> Message {
    Message::call(sender(), to, U256::zero(), Bytes::new(), gas_limit)
}

/// Runs `message` with the standard precompiles and no tracer.
pub fn execute<L: Ledger>(fork: Fork, ledger: &mut L, message: Message) -> ExecutionResult {
    execute_with(VmConfig::for_fork(fork), ledger, message)
}

/// Runs `message` under an explicit configuration.
pub fn execute_with<L: Ledger>(
    config: VmConfig,
    ledger: &mut L,
    message: Message,
) -> ExecutionResult {
    init_tracing();
    Evm::new(
        ledger,
        StandardPrecompiles::new(),
        NoopTracer,
        Environment::default(),
        config,
    )
    .execute(message)
}

/// Output of a frame read as one word.
pub fn output_word(result: &ExecutionResult) -> U256 {
    U256::from_big_endian(result.output.as_slice())
}

// =============================================================================
// PROGRAM BUILDER
// =============================================================================

/// Bytecode assembler for test programs.
#[derive(Clone, Debug, Default)]
pub struct Program(Vec<u8>);

impl Program {
    /// Empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `value` with the shortest PUSH1..PUSH8.
    pub fn push(mut self, value: u64) -> Self {
        let bytes = value.to_be_bytes();
        let skip = bytes.iter().take_while(|&&b| b == 0).count().min(7);
        let immediate = &bytes[skip..];
        self.0.push(PUSH1 + (immediate.len() as u8 - 1));
        self.0.extend_from_slice(immediate);
        self
    }

    /// Pushes a full address with PUSH20.
    pub fn push_address(mut self, address: Address) -> Self {
        self.0.push(PUSH20);
        self.0.extend_from_slice(address.as_bytes());
        self
    }

    /// Appends raw opcodes.
    pub fn op(mut self, opcodes: &[u8]) -> Self {
        self.0.extend_from_slice(opcodes);
        self
    }

    /// Stores the top of the stack at 0 and returns that word.
    pub fn return_top(self) -> Self {
        self.push(0).op(&[MSTORE]).push(32).push(0).op(&[RETURN])
    }

    /// Any CALL-family opcode with a 32-byte output window at 0.
    ///
    /// `value` is only pushed for CALL and CALLCODE.
    pub fn call(self, opcode: u8, gas: u64, to: Address, value: u64) -> Self {
        let program = self.push(32).push(0).push(0).push(0);
        let program = if opcode == CALL || opcode == CALLCODE {
            program.push(value)
        } else {
            program
        };
        program.push_address(to).push(gas).op(&[opcode])
    }

    /// Finished bytecode.
    pub fn build(self) -> Bytes {
        Bytes::from_vec(self.0)
    }

    /// Raw bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use qc_evm::evm::opcodes::{PUSH2, STOP};

    #[test]
    fn test_push_uses_shortest_encoding() {
        assert_eq!(Program::new().push(0).into_vec(), vec![PUSH1, 0]);
        assert_eq!(Program::new().push(0xFF).into_vec(), vec![PUSH1, 0xFF]);
        assert_eq!(Program::new().push(0x1234).into_vec(), vec![PUSH2, 0x12, 0x34]);
        assert_eq!(
            Program::new().push(0x01_0000).op(&[STOP]).into_vec(),
            vec![PUSH2 + 1, 0x01, 0x00, 0x00, STOP]
        );
    }
}
