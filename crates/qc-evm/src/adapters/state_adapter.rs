//! # State Adapter
//!
//! In-memory world state. Serves as the read-only [`StateProvider`] under a
//! journaled ledger and as the owned world of a snapshot ledger.

use crate::domain::entities::{AccountState, StateChange};
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Bytes, StorageKey, StorageValue, U256};
use crate::ports::outbound::StateProvider;
use std::collections::HashMap;

/// In-memory world state.
#[derive(Clone, Debug, Default)]
pub struct InMemoryState {
    /// Account states.
    accounts: HashMap<Address, AccountState>,
    /// Contract code.
    code: HashMap<Address, Bytes>,
    /// Storage. Zero values are never stored.
    storage: HashMap<(Address, StorageKey), StorageValue>,
}

impl InMemoryState {
    /// Create a new empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn account_mut(&mut self, address: Address) -> &mut AccountState {
        self.accounts
            .entry(address)
            .or_insert_with(|| AccountState::new_eoa(U256::zero(), 0))
    }

    /// Set account state.
    pub fn set_account(&mut self, address: Address, state: AccountState) {
        self.accounts.insert(address, state);
    }

    /// Set balance for an address.
    pub fn set_balance(&mut self, address: Address, balance: U256) {
        self.account_mut(address).balance = balance;
    }

    /// Set nonce for an address.
    pub fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.account_mut(address).nonce = nonce;
    }

    /// Set code for a contract.
    pub fn set_code(&mut self, address: Address, code: Bytes) {
        // Update code hash
        let code_hash = if code.is_empty() {
            AccountState::EMPTY_CODE_HASH
        } else {
            keccak256(code.as_slice())
        };
        self.account_mut(address).code_hash = code_hash;

        if code.is_empty() {
            self.code.remove(&address);
        } else {
            self.code.insert(address, code);
        }
    }

    /// Set storage value.
    pub fn set_storage_value(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        if value.is_zero() {
            self.storage.remove(&(address, key));
        } else {
            self.storage.insert((address, key), value);
        }
    }

    /// Drop every storage slot of an account.
    pub fn clear_storage(&mut self, address: Address) {
        self.storage.retain(|(owner, _), _| *owner != address);
    }

    /// Remove an account with its code and storage.
    pub fn remove_account(&mut self, address: Address) {
        self.accounts.remove(&address);
        self.code.remove(&address);
        self.clear_storage(address);
    }

    /// Returns true if the account is present.
    #[must_use]
    pub fn contains(&self, address: Address) -> bool {
        self.accounts.contains_key(&address)
    }

    /// Number of accounts present.
    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Applies changes reported by a committed ledger, in order.
    pub fn apply(&mut self, changes: &[StateChange]) {
        for change in changes {
            match change {
                StateChange::BalanceSet { address, balance } => self.set_balance(*address, *balance),
                StateChange::NonceSet { address, nonce } => self.set_nonce(*address, *nonce),
                StateChange::CodeSet { address, code } => self.set_code(*address, code.clone()),
                StateChange::StorageWrite {
                    address,
                    key,
                    value,
                } => self.set_storage_value(*address, *key, *value),
                StateChange::StorageDelete { address, key } => {
                    self.set_storage_value(*address, *key, StorageValue::ZERO);
                }
                StateChange::AccountDestroyed { address } => self.remove_account(*address),
            }
        }
    }
}

impl StateProvider for InMemoryState {
    fn account(&self, address: Address) -> Option<AccountState> {
        self.accounts.get(&address).cloned()
    }

    fn code(&self, address: Address) -> Bytes {
        self.code.get(&address).cloned().unwrap_or_default()
    }

    fn storage(&self, address: Address, key: StorageKey) -> StorageValue {
        self.storage
            .get(&(address, key))
            .copied()
            .unwrap_or(StorageValue::ZERO)
    }

    fn has_storage(&self, address: Address) -> bool {
        self.storage.keys().any(|(owner, _)| *owner == address)
    }
}

// =============================================================================
// TESTS
// =============================================================================
