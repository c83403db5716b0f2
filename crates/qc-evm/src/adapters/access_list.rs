//! # Access List Adapter
//!
//! Implementation of EIP-2929 warm/cold account and storage tracking, shared
//! by both ledgers. Warming is reversible so a rollback can un-warm.

use crate::domain::value_objects::{Address, StorageKey};
use crate::ports::outbound::AccessStatus;
use std::collections::{HashMap, HashSet};

/// In-memory access list implementation.
#[derive(Clone, Debug, Default)]
pub struct InMemoryAccessList {
    /// Warm accounts.
    warm_accounts: HashSet<Address>,
    /// Warm storage slots (address -> set of keys).
    warm_storage: HashMap<Address, HashSet<StorageKey>>,
}

impl InMemoryAccessList {
    /// Create a new empty access list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-warmed accounts (e.g., from EIP-2930 access list transaction).
    #[must_use]
    pub fn with_prewarmed(
        accounts: impl IntoIterator<Item = Address>,
        storage: impl IntoIterator<Item = (Address, StorageKey)>,
    ) -> Self {
        let mut list = Self::new();

        for addr in accounts {
            list.warm_accounts.insert(addr);
        }

        for (addr, key) in storage {
            list.warm_storage.entry(addr).or_default().insert(key);
        }

        list
    }

    /// Check and mark account as accessed.
    pub fn touch_account(&mut self, address: Address) -> AccessStatus {
        if self.warm_accounts.insert(address) {
            AccessStatus::Cold
        } else {
            AccessStatus::Warm
        }
    }

    /// Check and mark storage slot as accessed.
    pub fn touch_storage(&mut self, address: Address, key: StorageKey) -> AccessStatus {
        if self.warm_storage.entry(address).or_default().insert(key) {
            AccessStatus::Cold
        } else {
            AccessStatus::Warm
        }
    }

    /// Makes an account cold again.
    pub fn remove_account(&mut self, address: Address) {
        self.warm_accounts.remove(&address);
    }

    /// Makes a storage slot cold again.
    pub fn remove_storage(&mut self, address: Address, key: StorageKey) {
        if let Some(slots) = self.warm_storage.get_mut(&address) {
            slots.remove(&key);
            if slots.is_empty() {
                self.warm_storage.remove(&address);
            }
        }
    }

    /// Check if account is warm.
    #[must_use]
    pub fn is_account_warm(&self, address: Address) -> bool {
        self.warm_accounts.contains(&address)
    }

    /// Check if storage slot is warm.
    #[must_use]
    pub fn is_storage_warm(&self, address: Address, key: StorageKey) -> bool {
        self.warm_storage
            .get(&address)
            .is_some_and(|slots| slots.contains(&key))
    }

    /// Clear all access tracking.
    pub fn clear(&mut self) {
        self.warm_accounts.clear();
        self.warm_storage.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================
