//! # Driving Ports (API - Inbound)
//!
//! The interface exposed by the execution engine. Transaction processors
//! build a root [`Message`] and hand it to a [`MessageExecutor`].

use crate::domain::entities::{ExecutionResult, Message};

/// Executes a root message against the executor's ledger.
pub trait MessageExecutor {
    /// Runs `message` to completion.
    ///
    /// Failures never escape as `Err`: reverts and errors are reported in
    /// the result, with world state rolled back.
    fn execute(&mut self, message: Message) -> ExecutionResult;
}
