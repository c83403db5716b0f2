//! # Integration Scenarios
//!
//! Bytecode programs executed through [`qc_evm::evm::Evm`] against
//! `JournaledLedger<InMemoryState>` and `SnapshotLedger`.

pub mod fixtures;

mod call_depth;
mod execution_flows;
mod fork_rules;
mod tracer_hooks;
