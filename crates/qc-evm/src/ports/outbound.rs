//! # Driven Ports (SPI - Outbound)
//!
//! These are the interfaces the execution engine depends on:
//! - [`StateProvider`]: read-only world state the ledger starts from
//! - [`Ledger`]: mutable, snapshot-guarded view of accounts and storage
//!
//! All calls are synchronous. A ledger is borrowed mutably by one engine
//! for the duration of an execution.

use crate::domain::entities::AccountState;
use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue, U256};
use crate::errors::StateError;
use std::sync::Arc;

// =============================================================================
// STATE PROVIDER
// =============================================================================

/// Read-only world state.
pub trait StateProvider {
    /// Account record, `None` if the account was never created.
    fn account(&self, address: Address) -> Option<AccountState>;

    /// Contract code (empty for EOAs and unknown accounts).
    fn code(&self, address: Address) -> Bytes;

    /// Storage slot (zero if never written).
    fn storage(&self, address: Address, key: StorageKey) -> StorageValue;

    /// Returns true if any slot of `address` holds a non-zero value.
    fn has_storage(&self, address: Address) -> bool;
}

impl<T: StateProvider + ?Sized> StateProvider for &T {
    fn account(&self, address: Address) -> Option<AccountState> {
        (**self).account(address)
    }

    fn code(&self, address: Address) -> Bytes {
        (**self).code(address)
    }

    fn storage(&self, address: Address, key: StorageKey) -> StorageValue {
        (**self).storage(address, key)
    }

    fn has_storage(&self, address: Address) -> bool {
        (**self).has_storage(address)
    }
}

impl<T: StateProvider + ?Sized> StateProvider for Arc<T> {
    fn account(&self, address: Address) -> Option<AccountState> {
        (**self).account(address)
    }

    fn code(&self, address: Address) -> Bytes {
        (**self).code(address)
    }

    fn storage(&self, address: Address, key: StorageKey) -> StorageValue {
        (**self).storage(address, key)
    }

    fn has_storage(&self, address: Address) -> bool {
        (**self).has_storage(address)
    }
}

// =============================================================================
// ACCESS LIST (EIP-2929)
// =============================================================================

/// Access status for storage/accounts (EIP-2929).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessStatus {
    /// First access in this transaction (cold).
    Cold,
    /// Already accessed in this transaction (warm).
    Warm,
}

impl AccessStatus {
    /// Returns true for a first access.
    #[must_use]
    pub fn is_cold(self) -> bool {
        self == Self::Cold
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// Token returned by [`Ledger::snapshot`].
///
/// Snapshots nest: a token must be committed or rolled back before any
/// token taken earlier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SnapshotId(pub usize);

/// Mutable world state seen by the engine.
///
/// Every mutation made while a snapshot is open is undone by rolling that
/// snapshot back, including access-list warming.
pub trait Ledger {
    /// Account balance (zero for unknown accounts).
    fn balance(&self, address: Address) -> U256;

    /// Overwrites a balance, creating the account if needed.
    fn set_balance(&mut self, address: Address, balance: U256);

    /// Account nonce (zero for unknown accounts).
    fn nonce(&self, address: Address) -> u64;

    /// Overwrites a nonce, creating the account if needed.
    fn set_nonce(&mut self, address: Address, nonce: u64);

    /// Contract code.
    fn code(&self, address: Address) -> Bytes;

    /// Deploys code, creating the account if needed.
    fn set_code(&mut self, address: Address, code: Bytes);

    /// Current storage value.
    fn storage(&self, address: Address, key: StorageKey) -> StorageValue;

    /// Writes a storage slot.
    fn set_storage(&mut self, address: Address, key: StorageKey, value: StorageValue);

    /// Storage value at the start of the current transaction.
    fn committed_storage(&self, address: Address, key: StorageKey) -> StorageValue;

    /// Returns true if any slot of `address` currently holds a non-zero value.
    fn has_storage(&self, address: Address) -> bool;

    /// Drops every storage slot of `address`.
    fn clear_storage(&mut self, address: Address);

    /// Returns true if the account is present in state.
    fn account_exists(&self, address: Address) -> bool;

    /// Removes the account with its code and storage.
    fn destroy_account(&mut self, address: Address);

    /// Marks an account warm, returning its previous status.
    fn access_account(&mut self, address: Address) -> AccessStatus;

    /// Marks a storage slot warm, returning its previous status.
    fn access_storage_key(&mut self, address: Address, key: StorageKey) -> AccessStatus;

    /// Opens a snapshot.
    fn snapshot(&mut self) -> SnapshotId;

    /// Keeps every change made since `id`; the changes now belong to the
    /// enclosing snapshot.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSnapshot` if `id` is not open.
    fn commit(&mut self, id: SnapshotId) -> Result<(), StateError>;

    /// Undoes every change made since `id`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSnapshot` if `id` is not open.
    fn rollback(&mut self, id: SnapshotId) -> Result<(), StateError>;

    /// Adds to a balance.
    ///
    /// # Errors
    ///
    /// Returns `BalanceOverflow` if the sum exceeds 2^256 - 1.
    fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        let balance = self
            .balance(address)
            .checked_add(amount)
            .ok_or(StateError::BalanceOverflow(address))?;
        self.set_balance(address, balance);
        Ok(())
    }

    /// Subtracts from a balance.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientBalance` if the balance is below `amount`.
    fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        let available = self.balance(address);
        let balance = available
            .checked_sub(amount)
            .ok_or(StateError::InsufficientBalance {
                address,
                required: amount,
                available,
            })?;
        self.set_balance(address, balance);
        Ok(())
    }

    /// Increments a nonce, returning the value before the increment.
    ///
    /// # Errors
    ///
    /// Returns `NonceOverflow` at 2^64 - 1.
    fn inc_nonce(&mut self, address: Address) -> Result<u64, StateError> {
        let nonce = self.nonce(address);
        let next = nonce
            .checked_add(1)
            .ok_or(StateError::NonceOverflow(address))?;
        self.set_nonce(address, next);
        Ok(nonce)
    }

    /// Keccak256 of the code, or the empty code hash.
    fn code_hash(&self, address: Address) -> Hash {
        let code = self.code(address);
        if code.is_empty() {
            AccountState::EMPTY_CODE_HASH
        } else {
            crate::domain::services::keccak256(code.as_slice())
        }
    }

    /// Empty in the EIP-161 sense: no nonce, no balance, no code.
    fn is_empty(&self, address: Address) -> bool {
        self.nonce(address) == 0 && self.balance(address).is_zero() && self.code(address).is_empty()
    }

    /// Absent or empty.
    fn is_dead(&self, address: Address) -> bool {
        !self.account_exists(address) || self.is_empty(address)
    }

    /// A creation at `address` would overwrite an existing contract.
    fn contract_collision(&self, address: Address) -> bool {
        self.nonce(address) != 0 || !self.code(address).is_empty() || self.has_storage(address)
    }

    /// Transfers `value`, failing without changes when the sender is short.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientBalance` or `BalanceOverflow`.
    fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), StateError> {
        if value.is_zero() {
            return Ok(());
        }
        let available = self.balance(from);
        if available < value {
            return Err(StateError::InsufficientBalance {
                address: from,
                required: value,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balance(to)
            .checked_add(value)
            .ok_or(StateError::BalanceOverflow(to))?;
        self.set_balance(from, available - value);
        self.set_balance(to, credited);
        Ok(())
    }
}
