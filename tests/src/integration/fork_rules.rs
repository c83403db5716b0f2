//! # Fork Rules
//!
//! Behaviour that changes between hard forks: SELFDESTRUCT pricing and
//! refunds, the refund cap, static frames, address collisions, code
//! deposit checks and opcode availability.

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use qc_evm::evm::opcodes::*;
    use qc_evm::prelude::*;

    fn beneficiary() -> Address {
        Address::from_low_u64(0xBEEF)
    }

    // =========================================================================
    // SELFDESTRUCT
    // =========================================================================

    fn self_destruct(fork: Fork, balance: u64) -> (ExecutionResult, SnapshotLedger) {
        let mut state = InMemoryState::new();
        state.set_code(
            contract(),
            Program::new()
                .push_address(beneficiary())
                .op(&[SELFDESTRUCT])
                .build(),
        );
        state.set_nonce(contract(), 1);
        state.set_balance(contract(), U256::from(balance));
        let mut ledger = SnapshotLedger::new(state);

        let result = execute(fork, &mut ledger, call(contract(), 100_000));
        (result, ledger)
    }

    #[test]
    fn test_selfdestruct_gas_and_refund_by_fork() {
        // (fork, contract balance, gas used, capped refund)
        let cases = [
            (Fork::Frontier, 10, 3, 1),
            (Fork::TangerineWhistle, 0, 30_003, 15_001),
            (Fork::SpuriousDragon, 0, 5_003, 2_501),
            (Fork::SpuriousDragon, 10, 30_003, 15_001),
            (Fork::Berlin, 10, 32_603, 16_301),
            (Fork::London, 10, 32_603, 0),
        ];

        for (fork, balance, gas_used, refund) in cases {
            let (result, _) = self_destruct(fork, balance);
            assert!(result.is_success(), "{fork}");
            assert_eq!(result.gas_used, gas_used, "{fork}");
            assert_eq!(result.gas_refund, refund, "{fork}");
        }
    }

    #[test]
    fn test_selfdestruct_moves_balance_and_destroys() {
        let (result, ledger) = self_destruct(Fork::Shanghai, 10);

        assert_eq!(result.self_destructs, vec![contract()]);
        assert_eq!(ledger.balance(beneficiary()), U256::from(10));
        assert!(!ledger.account_exists(contract()));
        assert!(ledger.code(contract()).is_empty());
    }

    // =========================================================================
    // REFUND CAP
    // =========================================================================

    #[test]
    fn test_clearing_slot_refund_cap() {
        let code = Program::new().push(0).push(0).op(&[SSTORE]).build();
        // (fork, capped refund); the clear costs 5006 on every fork here
        let cases = [
            (Fork::Frontier, 2_503),
            (Fork::Istanbul, 2_503),
            (Fork::London, 1_001),
        ];

        for (fork, refund) in cases {
            let mut state = InMemoryState::new();
            state.set_code(contract(), code.clone());
            state.set_storage_value(
                contract(),
                StorageKey::ZERO,
                StorageValue::from_u256(U256::one()),
            );
            let mut ledger = JournaledLedger::new(state);

            let result = execute(fork, &mut ledger, call(contract(), 100_000));

            assert!(result.is_success(), "{fork}");
            assert_eq!(result.gas_used, 5_006, "{fork}");
            assert_eq!(result.gas_refund, refund, "{fork}");
            assert!(ledger
                .changes()
                .contains(&StateChange::StorageDelete {
                    address: contract(),
                    key: StorageKey::ZERO,
                }));
        }
    }

    // =========================================================================
    // STATIC FRAMES
    // =========================================================================

    #[test]
    fn test_static_call_rejections() {
        let cases: [(&str, Program, u64); 7] = [
            ("sstore", Program::new().push(1).push(0).op(&[SSTORE]), 0),
            ("log0", Program::new().push(0).push(0).op(&[LOG0]), 0),
            ("create", Program::new().push(0).push(0).push(0).op(&[CREATE]), 0),
            (
                "selfdestruct",
                Program::new().push_address(sender()).op(&[SELFDESTRUCT]),
                0,
            ),
            ("call with value", Program::new().call(CALL, 0, sender(), 1), 0),
            ("call without value", Program::new().call(CALL, 0, sender(), 0), 1),
            ("sload", Program::new().push(0).op(&[SLOAD, POP]), 1),
        ];

        for (name, body, expected) in cases {
            let code = Program::new()
                .call(STATICCALL, 100_000, callee(), 0)
                .return_top()
                .build();
            let mut ledger = journaled(&[(contract(), code), (callee(), body.build())]);

            let result = execute(Fork::Shanghai, &mut ledger, call(contract(), 300_000));

            assert!(result.is_success(), "{name}");
            assert_eq!(output_word(&result), U256::from(expected), "{name}");
            assert!(ledger.storage(callee(), StorageKey::ZERO).is_zero(), "{name}");
        }
    }

    #[test]
    fn test_static_root_message() {
        let code = Program::new().push(1).push(0).op(&[SSTORE]).build();
        let mut ledger = journaled(&[(contract(), code)]);

        let result = execute(
            Fork::Shanghai,
            &mut ledger,
            call(contract(), 100_000).into_static(),
        );

        assert_eq!(result.status, ExecutionStatus::Error);
        assert_eq!(result.error, Some(VmError::StaticStateChangeViolation));
        assert_eq!(result.gas_used, 100_000);
    }

    // =========================================================================
    // ADDRESS COLLISIONS
    // =========================================================================

    #[test]
    fn test_root_create_collision() {
        let target = compute_contract_address(sender(), 0);
        let mut state = InMemoryState::new();
        state.set_nonce(target, 1);
        let mut ledger = JournaledLedger::new(state);
        let message = Message::create(sender(), U256::zero(), Bytes::new(), 50_000);

        let result = execute(Fork::Shanghai, &mut ledger, message);

        assert_eq!(result.error, Some(VmError::AddressCollision(target)));
        assert_eq!(result.gas_used, 50_000);
        assert_eq!(result.created_address, None);
        // The sender nonce bump survives the failure
        assert_eq!(ledger.nonce(sender()), 1);
    }

    #[test]
    fn test_root_create_collides_with_storage_only_account() {
        let target = compute_contract_address(sender(), 0);
        let mut state = InMemoryState::new();
        state.set_storage_value(target, StorageKey::ZERO, StorageValue::from_u256(U256::one()));

        let mut journaled = JournaledLedger::new(state.clone());
        let mut owned = SnapshotLedger::new(state);
        let message = Message::create(sender(), U256::zero(), Bytes::new(), 50_000);
        let first = execute(Fork::Shanghai, &mut journaled, message.clone());
        let second = execute(Fork::Shanghai, &mut owned, message);

        for (result, stored) in [
            (first, journaled.storage(target, StorageKey::ZERO)),
            (second, owned.storage(target, StorageKey::ZERO)),
        ] {
            assert_eq!(result.error, Some(VmError::AddressCollision(target)));
            assert_eq!(result.gas_used, 50_000);
            assert_eq!(result.created_address, None);
            // The existing slot is left in place
            assert_eq!(stored, StorageValue::from_u256(U256::one()));
        }
    }

    #[test]
    fn test_child_create_collision() {
        let target = compute_contract_address(contract(), 1);
        let code = Program::new()
            .push(0)
            .push(0)
            .push(0)
            .op(&[CREATE])
            .return_top()
            .build();
        let mut ledger = journaled(&[
            (contract(), code),
            (target, Program::new().op(&[STOP]).build()),
        ]);

        let result = execute(Fork::Shanghai, &mut ledger, call(contract(), 1_000_000));

        assert!(result.is_success());
        assert!(output_word(&result).is_zero());
        assert_eq!(ledger.nonce(contract()), 2);
    }

    // =========================================================================
    // CODE DEPOSIT
    // =========================================================================

    /// Init code returning `size` zero bytes.
    fn returns_zeros(size: u64) -> Bytes {
        Program::new().push(size).push(0).op(&[RETURN]).build()
    }

    #[test]
    fn test_code_size_limit_from_spurious_dragon() {
        let size = 24_577;

        let mut ledger = journaled(&[]);
        let message = Message::create(sender(), U256::zero(), returns_zeros(size), 6_000_000);
        let result = execute(Fork::SpuriousDragon, &mut ledger, message.clone());
        assert!(matches!(
            result.error,
            Some(VmError::CodeSizeExceeded { size: 24_577, max: 24_576 })
        ));

        let mut ledger = journaled(&[]);
        let result = execute(Fork::Homestead, &mut ledger, message);
        assert!(result.is_success());
        let address = result.created_address.unwrap();
        assert_eq!(ledger.code(address).len(), 24_577);
    }

    #[test]
    fn test_unaffordable_deposit_by_fork() {
        // 9 gas of execution, 200 for the deposit
        let message = Message::create(sender(), U256::zero(), returns_zeros(1), 100);

        let mut ledger = journaled(&[]);
        let frontier = execute(Fork::Frontier, &mut ledger, message.clone());
        assert!(frontier.is_success());
        assert_eq!(frontier.gas_used, 9);
        let address = frontier.created_address.unwrap();
        assert!(ledger.code(address).is_empty());

        let mut ledger = journaled(&[]);
        let homestead = execute(Fork::Homestead, &mut ledger, message);
        assert_eq!(homestead.error, Some(VmError::OutOfGas));
        assert_eq!(homestead.gas_used, 100);
    }

    // =========================================================================
    // OPCODE AVAILABILITY
    // =========================================================================

    #[test]
    fn test_push0_enabled_in_shanghai() {
        let code = Program::new().op(&[PUSH0, STOP]).build();

        let mut ledger = journaled(&[(contract(), code.clone())]);
        let london = execute(Fork::London, &mut ledger, call(contract(), 1_000));
        assert_eq!(london.error, Some(VmError::InvalidInstruction(PUSH0)));
        assert_eq!(london.gas_used, 1_000);

        let mut ledger = journaled(&[(contract(), code)]);
        let shanghai = execute(Fork::Shanghai, &mut ledger, call(contract(), 1_000));
        assert!(shanghai.is_success());
        assert_eq!(shanghai.gas_used, 2);
    }

    #[test]
    fn test_revert_unavailable_before_byzantium() {
        let code = Program::new().push(0).push(0).op(&[REVERT]).build();
        let mut ledger = journaled(&[(contract(), code)]);

        let result = execute(Fork::SpuriousDragon, &mut ledger, call(contract(), 1_000));

        assert_eq!(result.error, Some(VmError::InvalidInstruction(REVERT)));
        assert_eq!(result.gas_used, 1_000);
    }
}
