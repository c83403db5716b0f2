//! # SHA256 Precompile (0x02)
//!
//! Computes SHA-256 hash of input.

use super::{linear_cost, Precompile, PrecompileOutput};
use crate::domain::services::precompiles::SHA256;
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::PrecompileError;
use sha2::{Digest, Sha256};

/// Gas cost per word.
const SHA256_WORD_COST: u64 = 12;
/// Base gas cost.
const SHA256_BASE_COST: u64 = 60;

/// SHA256 precompile.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Precompile;

impl Precompile for Sha256Precompile {
    fn execute(&self, input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
        let gas_cost = linear_cost(input.len(), SHA256_BASE_COST, SHA256_WORD_COST);
        if gas_cost > gas_limit {
            return Err(PrecompileError::OutOfGas);
        }

        let hash = Sha256::digest(input);
        Ok(PrecompileOutput {
            gas_used: gas_cost,
            output: Bytes::from_slice(&hash),
        })
    }

    fn address(&self) -> Address {
        SHA256
    }
}
