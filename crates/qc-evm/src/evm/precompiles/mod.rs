//! # Precompiled Contracts
//!
//! Native contracts at reserved addresses. The engine asks a
//! [`PrecompileSet`] whether a call target is native before loading code.

pub mod ecrecover;
pub mod identity;
pub mod sha256;

use crate::domain::fork::Fork;
use crate::domain::services::precompiles;
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::PrecompileError;

pub use ecrecover::Ecrecover;
pub use identity::Identity;
pub use sha256::Sha256Precompile;

/// Precompile execution result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrecompileOutput {
    /// Gas used by the precompile.
    pub gas_used: u64,
    /// Output data.
    pub output: Bytes,
}

/// Trait for precompiled contracts.
pub trait Precompile: Send + Sync {
    /// Execute the precompile with given input.
    ///
    /// # Errors
    ///
    /// `OutOfGas` when `gas_limit` is below the cost; the caller then
    /// consumes all gas of the frame.
    fn execute(&self, input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError>;

    /// Get the address of this precompile.
    fn address(&self) -> Address;
}

/// Fork-aware registry of precompiles.
pub trait PrecompileSet {
    /// The precompile at `address` on `fork`, if any.
    fn lookup(&self, fork: Fork, address: Address) -> Option<&dyn Precompile>;

    /// Every active precompile address on `fork`.
    fn addresses(&self, fork: Fork) -> Vec<Address>;

    /// Returns true if `address` is native on `fork`.
    fn contains(&self, fork: Fork, address: Address) -> bool {
        self.lookup(fork, address).is_some()
    }
}

impl<T: PrecompileSet + ?Sized> PrecompileSet for &T {
    fn lookup(&self, fork: Fork, address: Address) -> Option<&dyn Precompile> {
        (**self).lookup(fork, address)
    }

    fn addresses(&self, fork: Fork) -> Vec<Address> {
        (**self).addresses(fork)
    }
}

/// ecrecover, SHA256 and identity. All three are live from Frontier.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardPrecompiles {
    ecrecover: Ecrecover,
    sha256: Sha256Precompile,
    identity: Identity,
}

impl StandardPrecompiles {
    /// Create the standard registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrecompileSet for StandardPrecompiles {
    fn lookup(&self, _fork: Fork, address: Address) -> Option<&dyn Precompile> {
        match address {
            precompiles::ECRECOVER => Some(&self.ecrecover),
            precompiles::SHA256 => Some(&self.sha256),
            precompiles::IDENTITY => Some(&self.identity),
            _ => None,
        }
    }

    fn addresses(&self, _fork: Fork) -> Vec<Address> {
        vec![precompiles::ECRECOVER, precompiles::SHA256, precompiles::IDENTITY]
    }
}

/// Registry with no precompiles.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoPrecompiles;

impl PrecompileSet for NoPrecompiles {
    fn lookup(&self, _fork: Fork, _address: Address) -> Option<&dyn Precompile> {
        None
    }

    fn addresses(&self, _fork: Fork) -> Vec<Address> {
        Vec::new()
    }
}

/// Base plus per-word cost, saturating.
pub(crate) fn linear_cost(input_len: usize, base: u64, per_word: u64) -> u64 {
    let words = (input_len as u64).div_ceil(32);
    base.saturating_add(per_word.saturating_mul(words))
}

// =============================================================================
// TESTS
// =============================================================================
