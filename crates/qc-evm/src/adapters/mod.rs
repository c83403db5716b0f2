//! # Adapters Layer (Outer Hexagon)
//!
//! Concrete implementations of the driven ports.
//!
//! - [`JournaledLedger`]: undo-journal overlay over any [`StateProvider`](crate::ports::StateProvider)
//! - [`SnapshotLedger`]: owned state, snapshots by cloning
//! - [`InMemoryState`]: hash-map world state
//! - [`InMemoryAccessList`]: EIP-2929 warm sets shared by both ledgers

pub mod access_list;
pub mod journaled_ledger;
pub mod snapshot_ledger;
pub mod state_adapter;

pub use access_list::*;
pub use journaled_ledger::*;
pub use snapshot_ledger::*;
pub use state_adapter::*;
