//! # Ecrecover Precompile (0x01)
//!
//! Recovers the signer address from an ECDSA signature.
//!
//! Input format (128 bytes, zero-padded):
//! - bytes 0-31: message hash
//! - bytes 32-63: v (recovery id, must be 27 or 28)
//! - bytes 64-95: r
//! - bytes 96-127: s
//!
//! Output is the address left-padded to 32 bytes, or empty when the
//! signature does not recover. Gas is charged either way.

use super::{Precompile, PrecompileOutput};
use crate::domain::services::{derive_address_from_pubkey, precompiles::ECRECOVER};
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::PrecompileError;
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use tracing::trace;

/// Fixed gas cost for ecrecover.
const ECRECOVER_GAS: u64 = 3000;

/// Ecrecover precompile.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ecrecover;

impl Precompile for Ecrecover {
    fn execute(&self, input: &[u8], gas_limit: u64) -> Result<PrecompileOutput, PrecompileError> {
        if ECRECOVER_GAS > gas_limit {
            return Err(PrecompileError::OutOfGas);
        }

        let mut padded = [0u8; 128];
        let len = input.len().min(128);
        padded[..len].copy_from_slice(&input[..len]);

        let output = match recover(&padded) {
            Some(address) => {
                let mut word = [0u8; 32];
                word[12..].copy_from_slice(address.as_bytes());
                Bytes::from_slice(&word)
            }
            None => Bytes::new(),
        };

        Ok(PrecompileOutput {
            gas_used: ECRECOVER_GAS,
            output,
        })
    }

    fn address(&self) -> Address {
        ECRECOVER
    }
}

/// Recovers the signer, `None` for any malformed input.
fn recover(input: &[u8; 128]) -> Option<Address> {
    let hash = &input[0..32];
    let v = &input[32..64];

    // v is a full word; only 27 and 28 are accepted
    if v[..31].iter().any(|&b| b != 0) {
        return None;
    }
    let is_y_odd = match v[31] {
        27 => false,
        28 => true,
        _ => return None,
    };

    // Rejects r or s equal to zero or not below the curve order
    let signature = Signature::from_slice(&input[64..128]).ok()?;

    // k256 only verifies low-s signatures; flip the parity when normalizing
    let (signature, is_y_odd) = match signature.normalize_s() {
        Some(normalized) => (normalized, !is_y_odd),
        None => (signature, is_y_odd),
    };
    let recovery_id = RecoveryId::new(is_y_odd, false);

    let key = match VerifyingKey::recover_from_prehash(hash, &signature, recovery_id) {
        Ok(key) => key,
        Err(err) => {
            trace!(%err, "ecrecover failed");
            return None;
        }
    };

    let encoded = key.to_encoded_point(false);
    // Skip the 0x04 prefix
    Some(derive_address_from_pubkey(&encoded.as_bytes()[1..]))
}
