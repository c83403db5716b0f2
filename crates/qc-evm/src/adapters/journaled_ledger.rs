//! # Journaled Ledger
//!
//! Write overlay over a read-only [`StateProvider`]. Reads check the overlay
//! first and fall through to the provider. Every mutation pushes an undo
//! entry onto a journal; a snapshot is a journal length and rolling back
//! replays the entries above it in reverse.
//!
//! The provider is never written. [`JournaledLedger::changes`] reports the net
//! effect for the caller to persist.

use crate::adapters::access_list::InMemoryAccessList;
use crate::domain::entities::{AccountState, StateChange};
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue, U256};
use crate::errors::StateError;
use crate::ports::outbound::{AccessStatus, Ledger, SnapshotId, StateProvider};
use std::collections::HashMap;
use tracing::trace;

/// Overlay copy of one account.
#[derive(Clone, Debug, PartialEq, Eq)]
struct CachedAccount {
    balance: U256,
    nonce: u64,
    code: Bytes,
    exists: bool,
    code_changed: bool,
    /// Provider storage is hidden (account destroyed or storage cleared).
    storage_cleared: bool,
}

/// Undo record.
#[derive(Clone, Debug)]
enum JournalEntry {
    /// Account overlay before the change, `None` if it was not cached.
    Account {
        address: Address,
        previous: Option<CachedAccount>,
    },
    /// Storage overlay before the change, `None` if the slot was not cached.
    Storage {
        address: Address,
        key: StorageKey,
        previous: Option<StorageValue>,
    },
    /// Overlay slots removed by `clear_storage`.
    StorageCleared {
        address: Address,
        slots: Vec<(StorageKey, StorageValue)>,
    },
    AccountWarmed(Address),
    SlotWarmed(Address, StorageKey),
}

/// Journaled overlay ledger.
#[derive(Debug)]
pub struct JournaledLedger<P> {
    provider: P,
    accounts: HashMap<Address, CachedAccount>,
    storage: HashMap<(Address, StorageKey), StorageValue>,
    /// Values at transaction start for slots written in this transaction.
    originals: HashMap<(Address, StorageKey), StorageValue>,
    access_list: InMemoryAccessList,
    journal: Vec<JournalEntry>,
    open_snapshots: Vec<usize>,
}

impl<P: StateProvider> JournaledLedger<P> {
    /// Creates an empty overlay over `provider`.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            accounts: HashMap::new(),
            storage: HashMap::new(),
            originals: HashMap::new(),
            access_list: InMemoryAccessList::new(),
            journal: Vec::new(),
            open_snapshots: Vec::new(),
        }
    }

    /// The underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Starts a new transaction: warm sets and original storage values reset.
    pub fn begin_transaction(&mut self) {
        self.access_list.clear();
        self.originals.clear();
        self.journal.clear();
        self.open_snapshots.clear();
    }

    /// Number of open snapshots.
    pub fn depth(&self) -> usize {
        self.open_snapshots.len()
    }

    fn cached(&self, address: Address) -> Option<&CachedAccount> {
        self.accounts.get(&address)
    }

    fn load(&self, address: Address) -> CachedAccount {
        if let Some(account) = self.cached(address) {
            return account.clone();
        }
        let record = self.provider.account(address);
        CachedAccount {
            balance: record.as_ref().map(|a| a.balance).unwrap_or_default(),
            nonce: record.as_ref().map(|a| a.nonce).unwrap_or_default(),
            code: self.provider.code(address),
            exists: record.is_some(),
            code_changed: false,
            storage_cleared: false,
        }
    }

    /// Applies `update` to the account, journaling its previous overlay.
    fn modify_account(&mut self, address: Address, update: impl FnOnce(&mut CachedAccount)) {
        let previous = self.accounts.get(&address).cloned();
        let mut account = self.load(address);
        update(&mut account);
        account.exists = true;
        self.journal.push(JournalEntry::Account { address, previous });
        self.accounts.insert(address, account);
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Account { address, previous } => match previous {
                Some(account) => {
                    self.accounts.insert(address, account);
                }
                None => {
                    self.accounts.remove(&address);
                }
            },
            JournalEntry::Storage {
                address,
                key,
                previous,
            } => match previous {
                Some(value) => {
                    self.storage.insert((address, key), value);
                }
                None => {
                    self.storage.remove(&(address, key));
                }
            },
            JournalEntry::StorageCleared { address, slots } => {
                for (key, value) in slots {
                    self.storage.insert((address, key), value);
                }
            }
            JournalEntry::AccountWarmed(address) => self.access_list.remove_account(address),
            JournalEntry::SlotWarmed(address, key) => self.access_list.remove_storage(address, key),
        }
    }

    fn remove_overlay_slots(&mut self, address: Address) -> Vec<(StorageKey, StorageValue)> {
        let keys: Vec<StorageKey> = self
            .storage
            .keys()
            .filter(|(owner, _)| *owner == address)
            .map(|(_, key)| *key)
            .collect();
        keys.into_iter()
            .filter_map(|key| self.storage.remove(&(address, key)).map(|value| (key, value)))
            .collect()
    }

    fn find_snapshot(&self, id: SnapshotId) -> Result<usize, StateError> {
        self.open_snapshots
            .iter()
            .rposition(|&length| length == id.0)
            .ok_or(StateError::UnknownSnapshot(id.0))
    }

    /// Net changes of the overlay against the provider, ordered by address.
    pub fn changes(&self) -> Vec<StateChange> {
        let mut addresses: Vec<Address> = self.accounts.keys().copied().collect();
        for (address, _) in self.storage.keys() {
            if !self.accounts.contains_key(address) {
                addresses.push(*address);
            }
        }
        addresses.sort();
        addresses.dedup();

        let mut changes = Vec::new();
        for address in addresses {
            let baseline = self.provider.account(address);
            let cleared = self.cached(address).is_some_and(|a| a.storage_cleared);

            if let Some(account) = self.cached(address) {
                if cleared && baseline.is_some() {
                    changes.push(StateChange::AccountDestroyed { address });
                }
                let baseline = if cleared { None } else { baseline };
                if account.exists {
                    if baseline.as_ref().map(|a| a.balance) != Some(account.balance) {
                        changes.push(StateChange::BalanceSet {
                            address,
                            balance: account.balance,
                        });
                    }
                    if baseline.as_ref().map_or(0, |a| a.nonce) != account.nonce {
                        changes.push(StateChange::NonceSet {
                            address,
                            nonce: account.nonce,
                        });
                    }
                    if account.code_changed {
                        changes.push(StateChange::CodeSet {
                            address,
                            code: account.code.clone(),
                        });
                    }
                }
            }

            let mut slots: Vec<(StorageKey, StorageValue)> = self
                .storage
                .iter()
                .filter(|((owner, _), _)| *owner == address)
                .map(|((_, key), value)| (*key, *value))
                .collect();
            slots.sort_by_key(|(key, _)| *key);
            for (key, value) in slots {
                let before = if cleared {
                    StorageValue::ZERO
                } else {
                    self.provider.storage(address, key)
                };
                if before == value {
                    continue;
                }
                if value.is_zero() {
                    changes.push(StateChange::StorageDelete { address, key });
                } else {
                    changes.push(StateChange::StorageWrite {
                        address,
                        key,
                        value,
                    });
                }
            }
        }
        changes
    }
}

impl<P: StateProvider> Ledger for JournaledLedger<P> {
    fn balance(&self, address: Address) -> U256 {
        match self.cached(address) {
            Some(account) => account.balance,
            None => self
                .provider
                .account(address)
                .map(|a| a.balance)
                .unwrap_or_default(),
        }
    }

    fn set_balance(&mut self, address: Address, balance: U256) {
        self.modify_account(address, |account| account.balance = balance);
    }

    fn nonce(&self, address: Address) -> u64 {
        match self.cached(address) {
            Some(account) => account.nonce,
            None => self
                .provider
                .account(address)
                .map(|a| a.nonce)
                .unwrap_or_default(),
        }
    }

    fn set_nonce(&mut self, address: Address, nonce: u64) {
        self.modify_account(address, |account| account.nonce = nonce);
    }

    fn code(&self, address: Address) -> Bytes {
        match self.cached(address) {
            Some(account) => account.code.clone(),
            None => self.provider.code(address),
        }
    }

    fn set_code(&mut self, address: Address, code: Bytes) {
        self.modify_account(address, |account| {
            account.code = code;
            account.code_changed = true;
        });
    }

    fn code_hash(&self, address: Address) -> Hash {
        match self.cached(address) {
            Some(account) if account.code.is_empty() => AccountState::EMPTY_CODE_HASH,
            Some(account) => keccak256(account.code.as_slice()),
            None => self
                .provider
                .account(address)
                .map_or(AccountState::EMPTY_CODE_HASH, |a| a.code_hash),
        }
    }

    fn storage(&self, address: Address, key: StorageKey) -> StorageValue {
        if let Some(value) = self.storage.get(&(address, key)) {
            return *value;
        }
        if self.cached(address).is_some_and(|a| a.storage_cleared) {
            return StorageValue::ZERO;
        }
        self.provider.storage(address, key)
    }

    fn set_storage(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        let current = self.storage(address, key);
        self.originals.entry((address, key)).or_insert(current);
        let previous = self.storage.insert((address, key), value);
        self.journal.push(JournalEntry::Storage {
            address,
            key,
            previous,
        });
    }

    fn committed_storage(&self, address: Address, key: StorageKey) -> StorageValue {
        self.originals
            .get(&(address, key))
            .copied()
            .unwrap_or_else(|| self.storage(address, key))
    }

    fn has_storage(&self, address: Address) -> bool {
        let overlay = self
            .storage
            .iter()
            .any(|((owner, _), value)| *owner == address && !value.is_zero());
        // Provider slots zeroed in the overlay still count.
        overlay
            || (!self.cached(address).is_some_and(|a| a.storage_cleared)
                && self.provider.has_storage(address))
    }

    fn clear_storage(&mut self, address: Address) {
        let slots = self.remove_overlay_slots(address);
        self.journal
            .push(JournalEntry::StorageCleared { address, slots });
        self.modify_account(address, |account| account.storage_cleared = true);
    }

    fn account_exists(&self, address: Address) -> bool {
        match self.cached(address) {
            Some(account) => account.exists,
            None => self.provider.account(address).is_some(),
        }
    }

    fn destroy_account(&mut self, address: Address) {
        let slots = self.remove_overlay_slots(address);
        self.journal
            .push(JournalEntry::StorageCleared { address, slots });
        let previous = self.accounts.get(&address).cloned();
        self.journal.push(JournalEntry::Account { address, previous });
        self.accounts.insert(
            address,
            CachedAccount {
                balance: U256::zero(),
                nonce: 0,
                code: Bytes::new(),
                exists: false,
                code_changed: false,
                storage_cleared: true,
            },
        );
        trace!(%address, "account destroyed");
    }

    fn access_account(&mut self, address: Address) -> AccessStatus {
        let status = self.access_list.touch_account(address);
        if status.is_cold() {
            self.journal.push(JournalEntry::AccountWarmed(address));
        }
        status
    }

    fn access_storage_key(&mut self, address: Address, key: StorageKey) -> AccessStatus {
        let status = self.access_list.touch_storage(address, key);
        if status.is_cold() {
            self.journal.push(JournalEntry::SlotWarmed(address, key));
        }
        status
    }

    fn snapshot(&mut self) -> SnapshotId {
        let id = self.journal.len();
        self.open_snapshots.push(id);
        SnapshotId(id)
    }

    fn commit(&mut self, id: SnapshotId) -> Result<(), StateError> {
        let position = self.find_snapshot(id)?;
        self.open_snapshots.truncate(position);
        Ok(())
    }

    fn rollback(&mut self, id: SnapshotId) -> Result<(), StateError> {
        let position = self.find_snapshot(id)?;
        self.open_snapshots.truncate(position);
        while self.journal.len() > id.0 {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::state_adapter::InMemoryState;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn slot(n: u64) -> StorageKey {
        StorageKey::from_u256(U256::from(n))
    }

    fn value(n: u64) -> StorageValue {
        StorageValue::from_u256(U256::from(n))
    }

    fn funded_state() -> InMemoryState {
        let mut state = InMemoryState::new();
        state.set_balance(addr(1), U256::from(1000));
        state.set_storage_value(addr(2), slot(0), value(7));
        state
    }

    #[test]
    fn test_reads_fall_through_to_provider() {
        let state = funded_state();
        let ledger = JournaledLedger::new(&state);
        assert_eq!(ledger.balance(addr(1)), U256::from(1000));
        assert_eq!(ledger.storage(addr(2), slot(0)), value(7));
        assert!(ledger.account_exists(addr(1)));
        assert!(!ledger.account_exists(addr(3)));
    }

    #[test]
    fn test_storage_only_account_collides() {
        let state = funded_state();
        let mut ledger = JournaledLedger::new(&state);
        assert!(ledger.has_storage(addr(2)));
        assert!(ledger.contract_collision(addr(2)));

        ledger.set_storage(addr(3), slot(1), value(1));
        assert!(ledger.contract_collision(addr(3)));

        ledger.clear_storage(addr(2));
        assert!(!ledger.has_storage(addr(2)));
        assert!(!ledger.contract_collision(addr(2)));
    }

    #[test]
    fn test_rollback_restores_values() {
        let state = funded_state();
        let mut ledger = JournaledLedger::new(&state);

        let snapshot = ledger.snapshot();
        ledger.transfer(addr(1), addr(3), U256::from(400)).unwrap();
        ledger.set_storage(addr(2), slot(0), value(9));
        ledger.set_code(addr(3), Bytes::from_slice(&[0x00]));
        assert_eq!(ledger.balance(addr(3)), U256::from(400));

        ledger.rollback(snapshot).unwrap();

        assert_eq!(ledger.balance(addr(1)), U256::from(1000));
        assert_eq!(ledger.balance(addr(3)), U256::zero());
        assert!(!ledger.account_exists(addr(3)));
        assert_eq!(ledger.storage(addr(2), slot(0)), value(7));
        assert!(ledger.code(addr(3)).is_empty());
        assert!(ledger.changes().is_empty());
    }

    #[test]
    fn test_nested_commit_then_outer_rollback() {
        let state = funded_state();
        let mut ledger = JournaledLedger::new(&state);

        let outer = ledger.snapshot();
        ledger.set_storage(addr(2), slot(1), value(1));
        let inner = ledger.snapshot();
        ledger.set_storage(addr(2), slot(2), value(2));
        ledger.commit(inner).unwrap();
        assert_eq!(ledger.depth(), 1);

        ledger.rollback(outer).unwrap();
        assert!(ledger.storage(addr(2), slot(1)).is_zero());
        assert!(ledger.storage(addr(2), slot(2)).is_zero());
        assert_eq!(ledger.depth(), 0);
    }

    #[test]
    fn test_unknown_snapshot() {
        let state = InMemoryState::new();
        let mut ledger = JournaledLedger::new(&state);
        let id = ledger.snapshot();
        ledger.commit(id).unwrap();
        assert_eq!(ledger.commit(id), Err(StateError::UnknownSnapshot(id.0)));
        assert_eq!(
            ledger.rollback(SnapshotId(99)),
            Err(StateError::UnknownSnapshot(99))
        );
    }

    #[test]
    fn test_rollback_unwarms() {
        let state = InMemoryState::new();
        let mut ledger = JournaledLedger::new(&state);
        ledger.access_account(addr(1));

        let snapshot = ledger.snapshot();
        assert_eq!(ledger.access_account(addr(2)), AccessStatus::Cold);
        assert_eq!(ledger.access_storage_key(addr(2), slot(0)), AccessStatus::Cold);
        ledger.rollback(snapshot).unwrap();

        assert_eq!(ledger.access_account(addr(1)), AccessStatus::Warm);
        assert_eq!(ledger.access_account(addr(2)), AccessStatus::Cold);
        assert_eq!(ledger.access_storage_key(addr(2), slot(0)), AccessStatus::Cold);
    }

    #[test]
    fn test_committed_storage_keeps_transaction_start_value() {
        let state = funded_state();
        let mut ledger = JournaledLedger::new(&state);
        ledger.set_storage(addr(2), slot(0), value(8));
        ledger.set_storage(addr(2), slot(0), value(9));
        assert_eq!(ledger.committed_storage(addr(2), slot(0)), value(7));
        assert_eq!(ledger.storage(addr(2), slot(0)), value(9));

        ledger.begin_transaction();
        assert_eq!(ledger.committed_storage(addr(2), slot(0)), value(9));
    }

    #[test]
    fn test_destroy_account_hides_provider_storage() {
        let state = funded_state();
        let mut ledger = JournaledLedger::new(&state);
        ledger.set_balance(addr(2), U256::from(5));
        ledger.destroy_account(addr(2));

        assert!(!ledger.account_exists(addr(2)));
        assert!(ledger.storage(addr(2), slot(0)).is_zero());
        assert!(ledger.is_dead(addr(2)));
    }

    #[test]
    fn test_changes_report_net_effect() {
        let state = funded_state();
        let mut ledger = JournaledLedger::new(&state);
        ledger.transfer(addr(1), addr(3), U256::from(1)).unwrap();
        ledger.set_storage(addr(2), slot(0), StorageValue::ZERO);
        ledger.set_storage(addr(2), slot(5), value(5));
        ledger.set_storage(addr(2), slot(5), StorageValue::ZERO); // net no-op

        let changes = ledger.changes();
        assert_eq!(
            changes,
            vec![
                StateChange::BalanceSet {
                    address: addr(1),
                    balance: U256::from(999),
                },
                StateChange::StorageDelete {
                    address: addr(2),
                    key: slot(0),
                },
                StateChange::BalanceSet {
                    address: addr(3),
                    balance: U256::from(1),
                },
            ]
        );

        let mut applied = state.clone();
        applied.apply(&changes);
        assert_eq!(applied.account(addr(3)).map(|a| a.balance), Some(U256::one()));
        assert!(applied.storage(addr(2), slot(0)).is_zero());
    }
}
