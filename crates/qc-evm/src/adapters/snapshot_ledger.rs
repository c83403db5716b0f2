//! # Snapshot Ledger
//!
//! Ledger that owns its world state outright. A snapshot clones the whole
//! state together with the warm sets; rollback restores the clone. Suited to
//! tests and small states where a journal is not worth the bookkeeping.

use crate::adapters::access_list::InMemoryAccessList;
use crate::adapters::state_adapter::InMemoryState;
use crate::domain::value_objects::{Address, Bytes, StorageKey, StorageValue, U256};
use crate::errors::StateError;
use crate::ports::outbound::{AccessStatus, Ledger, SnapshotId, StateProvider};
use std::collections::HashMap;

/// Owned state with cloned snapshots.
#[derive(Clone, Debug, Default)]
pub struct SnapshotLedger {
    state: InMemoryState,
    access_list: InMemoryAccessList,
    originals: HashMap<(Address, StorageKey), StorageValue>,
    snapshots: Vec<(InMemoryState, InMemoryAccessList)>,
}

impl SnapshotLedger {
    /// Wraps an existing state.
    pub fn new(state: InMemoryState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    /// Current state.
    pub fn state(&self) -> &InMemoryState {
        &self.state
    }

    /// Consumes the ledger, returning the state.
    pub fn into_state(self) -> InMemoryState {
        self.state
    }

    /// Starts a new transaction: warm sets and original storage values reset.
    pub fn begin_transaction(&mut self) {
        self.access_list.clear();
        self.originals.clear();
        self.snapshots.clear();
    }

    fn check_open(&self, id: SnapshotId) -> Result<(), StateError> {
        if id.0 < self.snapshots.len() {
            Ok(())
        } else {
            Err(StateError::UnknownSnapshot(id.0))
        }
    }
}

impl Ledger for SnapshotLedger {
    fn balance(&self, address: Address) -> U256 {
        self.state
            .account(address)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    fn set_balance(&mut self, address: Address, balance: U256) {
        self.state.set_balance(address, balance);
    }

    fn nonce(&self, address: Address) -> u64 {
        self.state.account(address).map(|a| a.nonce).unwrap_or(0)
    }

    fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.state.set_nonce(address, nonce);
    }

    fn code(&self, address: Address) -> Bytes {
        self.state.code(address)
    }

    fn set_code(&mut self, address: Address, code: Bytes) {
        self.state.set_code(address, code);
    }

    fn storage(&self, address: Address, key: StorageKey) -> StorageValue {
        self.state.storage(address, key)
    }

    fn set_storage(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        let current = self.state.storage(address, key);
        self.originals.entry((address, key)).or_insert(current);
        self.state.set_storage_value(address, key, value);
    }

    fn committed_storage(&self, address: Address, key: StorageKey) -> StorageValue {
        self.originals
            .get(&(address, key))
            .copied()
            .unwrap_or_else(|| self.state.storage(address, key))
    }

    fn has_storage(&self, address: Address) -> bool {
        self.state.has_storage(address)
    }

    fn clear_storage(&mut self, address: Address) {
        self.state.clear_storage(address);
    }

    fn account_exists(&self, address: Address) -> bool {
        self.state.contains(address)
    }

    fn destroy_account(&mut self, address: Address) {
        self.state.remove_account(address);
    }

    fn access_account(&mut self, address: Address) -> AccessStatus {
        self.access_list.touch_account(address)
    }

    fn access_storage_key(&mut self, address: Address, key: StorageKey) -> AccessStatus {
        self.access_list.touch_storage(address, key)
    }

    fn snapshot(&mut self) -> SnapshotId {
        self.snapshots
            .push((self.state.clone(), self.access_list.clone()));
        SnapshotId(self.snapshots.len() - 1)
    }

    fn commit(&mut self, id: SnapshotId) -> Result<(), StateError> {
        self.check_open(id)?;
        self.snapshots.truncate(id.0);
        Ok(())
    }

    fn rollback(&mut self, id: SnapshotId) -> Result<(), StateError> {
        self.check_open(id)?;
        if let Some((state, access_list)) = self.snapshots.drain(id.0..).next() {
            self.state = state;
            self.access_list = access_list;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
