//! # Execution Flows
//!
//! Whole call trees: plain returns, reverts, nested calls, delegate context
//! and deployment followed by a call to the new contract.

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use qc_evm::evm::opcodes::*;
    use qc_evm::prelude::*;

    fn funded_journaled(contracts: &[(Address, Bytes)], balance: u64) -> JournaledLedger<InMemoryState> {
        let mut state = InMemoryState::new();
        state.set_balance(sender(), U256::from(balance));
        for (address, code) in contracts {
            state.set_code(*address, code.clone());
            state.set_nonce(*address, 1);
        }
        JournaledLedger::new(state)
    }

    // =========================================================================
    // RETURN / REVERT
    // =========================================================================

    #[test]
    fn test_arithmetic_return_on_both_ledgers() {
        // 6 * 7 + 2
        let code = Program::new()
            .push(6)
            .push(7)
            .op(&[MUL])
            .push(2)
            .op(&[ADD])
            .return_top()
            .build();
        let contracts = [(contract(), code)];

        let mut journaled = journaled(&contracts);
        let mut snapshot = snapshot(&contracts);
        let a = execute(Fork::Shanghai, &mut journaled, call(contract(), 100_000));
        let b = execute(Fork::Shanghai, &mut snapshot, call(contract(), 100_000));

        assert!(a.is_success());
        assert_eq!(output_word(&a), U256::from(44));
        // 3 + 3 + 5 + 3 + 3, then 3 + (3 + 3) + 3 + 3 + 0
        assert_eq!(a.gas_used, 32);
        assert_eq!(a, b);
    }

    #[test]
    fn test_revert_rolls_back_value_storage_and_logs() {
        let code = Program::new()
            .push(1)
            .push(0)
            .op(&[SSTORE])
            .push(0)
            .push(0)
            .op(&[LOG0])
            .push(0xAB)
            .push(0)
            .op(&[MSTORE8])
            .push(1)
            .push(0)
            .op(&[REVERT])
            .build();
        let mut ledger = funded_journaled(&[(contract(), code)], 100);
        let message = Message::call(sender(), contract(), U256::from(10), Bytes::new(), 100_000);

        let result = execute(Fork::Shanghai, &mut ledger, message);

        assert_eq!(result.status, ExecutionStatus::Revert);
        assert_eq!(result.output.as_slice(), &[0xAB]);
        assert!(result.logs.is_empty());
        assert!(result.gas_used < 100_000);
        assert_eq!(ledger.balance(sender()), U256::from(100));
        assert!(ledger.balance(contract()).is_zero());
        assert!(ledger.storage(contract(), StorageKey::ZERO).is_zero());
        assert!(ledger.changes().is_empty());
    }

    #[test]
    fn test_value_transfer_commits() {
        let mut ledger = funded_journaled(&[(contract(), Program::new().op(&[STOP]).build())], 100);
        let message = Message::call(sender(), contract(), U256::from(30), Bytes::new(), 21_000);

        let result = execute(Fork::Shanghai, &mut ledger, message);

        assert!(result.is_success());
        assert_eq!(result.gas_used, 0);
        assert_eq!(ledger.balance(sender()), U256::from(70));
        assert_eq!(ledger.balance(contract()), U256::from(30));
    }

    // =========================================================================
    // NESTED CALLS
    // =========================================================================

    #[test]
    fn test_nested_call_merges_logs_and_storage() {
        let callee_code = Program::new()
            .push(7)
            .push(1)
            .op(&[SSTORE])
            .push(0)
            .push(0)
            .op(&[LOG0])
            .push(0x2A)
            .return_top()
            .build();
        let code = Program::new()
            .call(CALL, 100_000, callee(), 0)
            .op(&[POP])
            .push(32)
            .push(0)
            .op(&[RETURN])
            .build();
        let mut ledger = journaled(&[(contract(), code), (callee(), callee_code)]);

        let result = execute(Fork::Shanghai, &mut ledger, call(contract(), 300_000));

        assert!(result.is_success());
        assert_eq!(output_word(&result), U256::from(0x2A));
        assert_eq!(result.logs.len(), 1);
        assert_eq!(result.logs[0].address, callee());
        let slot = StorageKey::from_u256(U256::one());
        assert_eq!(ledger.storage(callee(), slot).to_u256(), U256::from(7));
        assert!(ledger.changes().contains(&StateChange::StorageWrite {
            address: callee(),
            key: slot,
            value: StorageValue::from_u256(U256::from(7)),
        }));
    }

    #[test]
    fn test_failed_callee_keeps_caller_effects() {
        let callee_code = Program::new()
            .push(1)
            .push(0)
            .op(&[SSTORE, INVALID])
            .build();
        // Caller writes slot 5, calls, then returns the call status
        let code = Program::new()
            .push(9)
            .push(5)
            .op(&[SSTORE])
            .call(CALL, 50_000, callee(), 0)
            .return_top()
            .build();
        let mut ledger = journaled(&[(contract(), code), (callee(), callee_code)]);

        let result = execute(Fork::Shanghai, &mut ledger, call(contract(), 300_000));

        assert!(result.is_success());
        assert!(output_word(&result).is_zero());
        let five = StorageKey::from_u256(U256::from(5));
        assert_eq!(ledger.storage(contract(), five).to_u256(), U256::from(9));
        assert!(ledger.storage(callee(), StorageKey::ZERO).is_zero());
    }

    #[test]
    fn test_delegatecall_writes_caller_storage() {
        let library = Address::from_low_u64(0x11B);
        // Store CALLER at slot 0
        let library_code = Program::new().op(&[CALLER]).push(0).op(&[SSTORE]).build();
        let code = Program::new()
            .call(DELEGATECALL, 100_000, library, 0)
            .return_top()
            .build();
        let mut ledger = snapshot(&[(contract(), code), (library, library_code)]);

        let result = execute(Fork::Shanghai, &mut ledger, call(contract(), 300_000));

        assert!(result.is_success());
        assert_eq!(output_word(&result), U256::one());
        assert_eq!(
            ledger.storage(contract(), StorageKey::ZERO).to_u256(),
            sender().to_word()
        );
        assert!(ledger.storage(library, StorageKey::ZERO).is_zero());
    }

    #[test]
    fn test_returndata_after_call() {
        let callee_code = Program::new().push(0x2A).return_top().build();
        let code = Program::new()
            .call(STATICCALL, 100_000, callee(), 0)
            .op(&[POP, RETURNDATASIZE])
            .return_top()
            .build();
        let mut ledger = journaled(&[(contract(), code), (callee(), callee_code)]);

        let result = execute(Fork::Shanghai, &mut ledger, call(contract(), 300_000));

        assert!(result.is_success());
        assert_eq!(output_word(&result), U256::from(32));
    }

    // =========================================================================
    // DEPLOYMENT
    // =========================================================================

    /// Init code that deploys a contract returning 0x2A.
    fn deployer() -> Bytes {
        let runtime = Program::new().push(0x2A).return_top().into_vec();
        let size = runtime.len() as u64;
        // The prefix below is 12 bytes long
        let mut init = Program::new()
            .push(size)
            .push(12)
            .push(0)
            .op(&[CODECOPY])
            .push(size)
            .push(0)
            .op(&[RETURN])
            .into_vec();
        assert_eq!(init.len(), 12);
        init.extend(runtime);
        Bytes::from_vec(init)
    }

    #[test]
    fn test_create_then_call_deployed_contract() {
        let mut ledger = journaled(&[]);
        let create = Message::create(sender(), U256::zero(), deployer(), 200_000);

        let created = execute(Fork::Shanghai, &mut ledger, create);
        assert!(created.is_success());
        let address = created.created_address.unwrap();
        assert_eq!(address, compute_contract_address(sender(), 0));
        assert_eq!(ledger.nonce(address), 1);
        assert_eq!(ledger.nonce(sender()), 1);

        ledger.begin_transaction();
        let result = execute(Fork::Shanghai, &mut ledger, call(address, 100_000));
        assert!(result.is_success());
        assert_eq!(output_word(&result), U256::from(0x2A));
    }

    #[test]
    fn test_create2_address() {
        let mut ledger = snapshot(&[]);
        let salt = U256::from(0x5A17);
        let init = deployer();
        let message = Message::create2(sender(), U256::zero(), init.clone(), salt, 200_000);

        let result = execute(Fork::Shanghai, &mut ledger, message);

        let expected = compute_contract_address_create2(sender(), salt, init.as_slice());
        assert_eq!(result.created_address, Some(expected));
        assert!(!ledger.code(expected).is_empty());
    }
}
