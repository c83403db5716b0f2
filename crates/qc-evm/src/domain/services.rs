//! # Domain Services
//!
//! Pure hashing and address-derivation functions used by the engine.
//! These functions are deterministic and have no side effects.

use crate::domain::value_objects::{Address, Hash, U256};
use sha3::{Digest, Keccak256};

// =============================================================================
// CONTRACT ADDRESS COMPUTATION
// =============================================================================

/// Computes the contract address for CREATE opcode.
///
/// Address = keccak256(rlp(\[sender, nonce\]))\[12:\]
///
/// Per Ethereum Yellow Paper, section 7.
#[must_use]
pub fn compute_contract_address(sender: Address, nonce: u64) -> Address {
    let nonce_bytes = nonce.to_be_bytes();
    let significant = &nonce_bytes[nonce.leading_zeros() as usize / 8..];
    let nonce_len = match significant {
        [byte] if *byte < 0x80 => 1,
        bytes => 1 + bytes.len(),
    };

    // The payload is at most 30 bytes, so both headers are single-byte
    let mut rlp = Vec::with_capacity(32);
    rlp.push(0xc0 + (21 + nonce_len) as u8);
    rlp.push(0x80 + 20);
    rlp.extend_from_slice(sender.as_bytes());
    match significant {
        [byte] if *byte < 0x80 => rlp.push(*byte),
        bytes => {
            rlp.push(0x80 + bytes.len() as u8);
            rlp.extend_from_slice(bytes);
        }
    }

    address_from_digest(&Keccak256::digest(&rlp))
}

/// Computes the contract address for CREATE2 opcode.
///
/// Address = keccak256(0xff ++ sender ++ salt ++ `keccak256(init_code)`)\[12:\]
///
/// Per EIP-1014.
#[must_use]
pub fn compute_contract_address_create2(sender: Address, salt: U256, init_code: &[u8]) -> Address {
    let mut data = Vec::with_capacity(85);
    data.push(0xff);
    data.extend_from_slice(sender.as_bytes());
    data.extend_from_slice(Hash::from_word(salt).as_bytes());
    data.extend_from_slice(&Keccak256::digest(init_code));

    address_from_digest(&Keccak256::digest(&data))
}

/// Last 20 bytes of a 32-byte digest.
fn address_from_digest(digest: &[u8]) -> Address {
    let mut addr = [0u8; 20];
    addr.copy_from_slice(&digest[12..32]);
    Address::new(addr)
}

// =============================================================================
// KECCAK256 UTILITY
// =============================================================================

/// Computes keccak256 hash of data.
#[must_use]
pub fn keccak256(data: &[u8]) -> Hash {
    let hash = Keccak256::digest(data);
    Hash::new(hash.into())
}

// =============================================================================
// ADDRESS DERIVATION
// =============================================================================

/// Derives address from public key (compressed or uncompressed).
///
/// Address = `keccak256(public_key)`\[12:\]
///
/// Note: For ECDSA, the public key should be the uncompressed form (64 bytes)
/// without the 0x04 prefix.
#[must_use]
pub fn derive_address_from_pubkey(public_key: &[u8]) -> Address {
    address_from_digest(&Keccak256::digest(public_key))
}

// =============================================================================
// PRECOMPILE ADDRESSES
// =============================================================================

/// Addresses of the precompiles shipped with the standard registry.
pub mod precompiles {
    use super::Address;

    /// ecrecover (0x01)
    pub const ECRECOVER: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1]);

    /// SHA256 (0x02)
    pub const SHA256: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]);

    /// Identity / data copy (0x04)
    pub const IDENTITY: Address =
        Address([0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 4]);

    /// Returns the reserved precompile address for a given number (1-9).
    #[must_use]
    pub fn from_number(n: u8) -> Option<Address> {
        if (1..=9).contains(&n) {
            let mut addr = [0u8; 20];
            addr[19] = n;
            Some(Address::new(addr))
        } else {
            None
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
