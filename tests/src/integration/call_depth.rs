//! # Call Depth
//!
//! A contract that bumps a counter and calls itself until the depth limit
//! rejects the next call. Frames live on an explicit stack, so the full
//! 1024 levels run without growing the host stack.

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use qc_evm::evm::opcodes::*;
    use qc_evm::prelude::*;

    /// counter += 1, then CALL self with all gas but 1024.
    fn recursive_counter() -> Bytes {
        Program::new()
            .push(0)
            .op(&[SLOAD])
            .push(1)
            .op(&[ADD])
            .push(0)
            .op(&[SSTORE])
            .push(32)
            .push(0)
            .push(0)
            .push(0)
            .push(0)
            .push_address(contract())
            .op(&[GAS, PUSH2, 0x04, 0x00, SWAP1, SUB, CALL, STOP])
            .build()
    }

    fn counter<L: Ledger>(ledger: &L) -> U256 {
        ledger.storage(contract(), StorageKey::ZERO).to_u256()
    }

    #[test]
    fn test_recursion_reaches_1024_levels() {
        let mut ledger = journaled(&[(contract(), recursive_counter())]);

        let result = execute(Fork::Frontier, &mut ledger, call(contract(), 10_000_000));

        assert!(result.is_success());
        // Root frame plus 1024 nested frames
        assert_eq!(counter(&ledger), U256::from(1025));
        assert!(result.gas_used < 10_000_000);
    }

    #[test]
    fn test_custom_depth_limit() {
        let mut ledger = snapshot(&[(contract(), recursive_counter())]);
        let config = VmConfig {
            max_call_depth: 10,
            ..VmConfig::for_fork(Fork::Frontier)
        };

        let result = execute_with(config, &mut ledger, call(contract(), 1_000_000));

        assert!(result.is_success());
        assert_eq!(counter(&ledger), U256::from(11));
    }

    #[test]
    fn test_root_message_above_limit() {
        let mut ledger = journaled(&[(contract(), recursive_counter())]);
        let mut message = call(contract(), 100_000);
        message.depth = 1025;

        let result = execute(Fork::Frontier, &mut ledger, message);

        assert_eq!(result.status, ExecutionStatus::Error);
        assert!(matches!(
            result.error,
            Some(VmError::CallDepthExceeded { depth: 1025, max: 1024 })
        ));
        assert_eq!(result.gas_used, 0);
        assert!(counter(&ledger).is_zero());
    }

    #[test]
    fn test_out_of_gas_child_keeps_parent_writes() {
        let mut ledger = journaled(&[(contract(), recursive_counter())]);

        let result = execute(Fork::Frontier, &mut ledger, call(contract(), 30_000));

        assert!(result.is_success());
        // Root and first child write; the grandchild cannot pay for SSTORE
        assert_eq!(counter(&ledger), U256::from(2));
    }
}
