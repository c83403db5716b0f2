//! # Identity Precompile (0x04)
//!
//! Simply returns the input data as output.

use super::{linear_cost, Precompile, PrecompileOutput};
use crate::domain::services::precompiles::IDENTITY;
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::PrecompileError;

/// Gas cost per word.
const IDENTITY_WORD_COST: u64 = 3;
/// Base gas cost.
const IDENTITY_BASE_COST: u64 = 15;

/// Identity precompile - returns input as output.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl Precompile for Identity {
    fn execute(&self, input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
        let gas_cost = linear_cost(input.len(), IDENTITY_BASE_COST, IDENTITY_WORD_COST);
        if gas_cost > gas_limit {
            return Err(PrecompileError::OutOfGas);
        }

        Ok(PrecompileOutput {
            gas_used: gas_cost,
            output: Bytes::from_slice(input),
        })
    }

    fn address(&self) -> Address {
        IDENTITY
    }
}
