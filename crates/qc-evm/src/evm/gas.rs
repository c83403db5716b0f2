//! # EVM Gas Metering
//!
//! The per-frame [`GasMeter`] and the fork-dependent gas schedule.
//! Covers EIP-150 (63/64 rule), EIP-160 (EXP), EIP-1283/2200 (net metering),
//! EIP-2929 (access lists), EIP-3529 (refund reduction) and EIP-3860 (init code).

use crate::domain::fork::Fork;
use crate::domain::value_objects::U256;
use crate::errors::VmError;

// =============================================================================
// BASE GAS COSTS
// =============================================================================

/// Gas costs for common operations.
pub mod costs {
    /// Zero gas.
    pub const ZERO: u64 = 0;
    /// Base cost (e.g., for `ADDRESS`).
    pub const BASE: u64 = 2;
    /// Very low cost (e.g., for `ADD`).
    pub const VERY_LOW: u64 = 3;
    /// Low cost (e.g., for `MUL`).
    pub const LOW: u64 = 5;
    /// Mid cost.
    pub const MID: u64 = 8;
    /// High cost.
    pub const HIGH: u64 = 10;
    /// Jump destination cost.
    pub const JUMPDEST: u64 = 1;

    // Memory costs
    /// Gas per word for memory copy.
    pub const COPY: u64 = 3;

    // Access costs (EIP-2929)
    /// Warm account or slot access.
    pub const WARM_ACCESS: u64 = 100;
    /// Cold account access.
    pub const COLD_ACCOUNT_ACCESS: u64 = 2600;
    /// Cold storage read.
    pub const COLD_SLOAD: u64 = 2100;

    // SSTORE costs
    /// Setting a zero slot to non-zero.
    pub const SSTORE_SET: u64 = 20_000;
    /// Changing a non-zero slot (before EIP-2929 adjusts it).
    pub const SSTORE_RESET: u64 = 5000;
    /// Refund for clearing a slot before London.
    pub const SSTORE_CLEAR_REFUND: u64 = 15_000;
    /// Refund for clearing a slot from London (EIP-3529).
    pub const SSTORE_CLEAR_REFUND_LONDON: u64 = 4800;
    /// SSTORE fails when no more than this much gas is left (EIP-2200).
    pub const SSTORE_SENTRY: u64 = 2300;

    // Call costs
    /// Cost for value transfer.
    pub const CALL_VALUE: u64 = 9000;
    /// Cost for creating new account.
    pub const NEW_ACCOUNT: u64 = 25_000;
    /// Stipend given to called contract when value > 0.
    pub const CALL_STIPEND: u64 = 2300;

    // Create costs
    /// CREATE opcode base cost.
    pub const CREATE: u64 = 32_000;
    /// Per byte of deployed code.
    pub const CODE_DEPOSIT: u64 = 200;
    /// Per word of init code (EIP-3860).
    pub const INIT_CODE_WORD: u64 = 2;

    // Log costs
    /// LOG base cost.
    pub const LOG: u64 = 375;
    /// LOG cost per topic.
    pub const LOG_TOPIC: u64 = 375;
    /// LOG cost per byte of data.
    pub const LOG_DATA: u64 = 8;

    // Other
    /// KECCAK256 (SHA3) base cost.
    pub const KECCAK256: u64 = 30;
    /// KECCAK256 and CREATE2 hashing cost per word.
    pub const KECCAK256_WORD: u64 = 6;
    /// EXP base cost.
    pub const EXP: u64 = 10;
    /// EXP cost per exponent byte before Spurious Dragon.
    pub const EXP_BYTE_FRONTIER: u64 = 10;
    /// EXP cost per exponent byte (EIP-160).
    pub const EXP_BYTE: u64 = 50;
    /// SELFDESTRUCT base cost from Tangerine Whistle.
    pub const SELFDESTRUCT: u64 = 5000;
    /// SELFDESTRUCT refund before London.
    pub const SELFDESTRUCT_REFUND: u64 = 24_000;
    /// SELFBALANCE cost.
    pub const SELFBALANCE: u64 = 5;
    /// BLOCKHASH cost.
    pub const BLOCKHASH: u64 = 20;
}

// =============================================================================
// GAS METER
// =============================================================================

/// Tracks gas consumption of one frame.
///
/// ## Invariants
/// - `remaining <= limit` at all times
/// - A failed `consume` leaves the meter unchanged
/// - The refund counter never goes below zero
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasMeter {
    limit: u64,
    remaining: u64,
    refund: u64,
}

impl GasMeter {
    /// Creates a new gas meter with the given limit.
    #[must_use]
    pub const fn new(limit: u64) -> Self {
        Self {
            limit,
            remaining: limit,
            refund: 0,
        }
    }

    /// Creates a meter that starts from an inherited refund counter.
    ///
    /// Child frames start from the parent's refund so SSTORE refund
    /// subtraction can cancel refunds granted earlier in the transaction.
    #[must_use]
    pub const fn with_refund(limit: u64, refund: u64) -> Self {
        Self {
            limit,
            remaining: limit,
            refund,
        }
    }

    /// Returns the gas limit.
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Returns remaining gas.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Returns gas used so far.
    #[must_use]
    pub const fn used(&self) -> u64 {
        self.limit - self.remaining
    }

    /// Returns accumulated refund.
    #[must_use]
    pub const fn refund(&self) -> u64 {
        self.refund
    }

    /// Consumes gas.
    ///
    /// # Errors
    ///
    /// Returns `OutOfGas` if `amount > remaining`; the meter is unchanged.
    pub fn consume(&mut self, amount: u64) -> Result<(), VmError> {
        if amount > self.remaining {
            return Err(VmError::OutOfGas);
        }
        self.remaining -= amount;
        Ok(())
    }

    /// Consumes everything that is left.
    pub fn consume_all(&mut self) {
        self.remaining = 0;
    }

    /// Gives back gas a finished child frame did not use.
    pub fn return_gas(&mut self, amount: u64) {
        self.remaining = self.remaining.saturating_add(amount).min(self.limit);
    }

    /// Adds to refund counter.
    pub fn add_refund(&mut self, amount: u64) {
        self.refund = self.refund.saturating_add(amount);
    }

    /// Subtracts from refund counter, flooring at zero.
    pub fn sub_refund(&mut self, amount: u64) {
        self.refund = self.refund.saturating_sub(amount);
    }

    /// Replaces the refund counter with a successful child's counter.
    pub fn set_refund(&mut self, refund: u64) {
        self.refund = refund;
    }

    /// Refund actually granted: `min(refund, gas_used / quotient)`.
    #[must_use]
    pub fn final_refund(&self, gas_used: u64, fork: Fork) -> u64 {
        self.refund.min(gas_used / fork.refund_quotient())
    }
}

// =============================================================================
// FORK-DEPENDENT STATIC COSTS
// =============================================================================

/// BALANCE: 20, 400 (EIP-150), 700 (EIP-1884), warm 100 (EIP-2929).
#[must_use]
pub fn balance_cost(fork: Fork) -> u64 {
    match fork {
        f if f >= Fork::Berlin => costs::WARM_ACCESS,
        f if f >= Fork::Istanbul => 700,
        f if f >= Fork::TangerineWhistle => 400,
        _ => 20,
    }
}

/// EXTCODESIZE and EXTCODECOPY: 20, 700 (EIP-150), warm 100 (EIP-2929).
#[must_use]
pub fn ext_code_cost(fork: Fork) -> u64 {
    match fork {
        f if f >= Fork::Berlin => costs::WARM_ACCESS,
        f if f >= Fork::TangerineWhistle => 700,
        _ => 20,
    }
}

/// EXTCODEHASH: 400, 700 (EIP-1884), warm 100 (EIP-2929).
#[must_use]
pub fn ext_code_hash_cost(fork: Fork) -> u64 {
    match fork {
        f if f >= Fork::Berlin => costs::WARM_ACCESS,
        f if f >= Fork::Istanbul => 700,
        _ => 400,
    }
}

/// SLOAD: 50, 200 (EIP-150), 800 (EIP-1884), warm 100 (EIP-2929).
#[must_use]
pub fn sload_cost(fork: Fork) -> u64 {
    match fork {
        f if f >= Fork::Berlin => costs::WARM_ACCESS,
        f if f >= Fork::Istanbul => 800,
        f if f >= Fork::TangerineWhistle => 200,
        _ => 50,
    }
}

/// CALL family base: 40, 700 (EIP-150), warm 100 (EIP-2929).
#[must_use]
pub fn call_cost(fork: Fork) -> u64 {
    match fork {
        f if f >= Fork::Berlin => costs::WARM_ACCESS,
        f if f >= Fork::TangerineWhistle => 700,
        _ => 40,
    }
}

/// SELFDESTRUCT base: free until EIP-150.
#[must_use]
pub fn selfdestruct_cost(fork: Fork) -> u64 {
    if fork >= Fork::TangerineWhistle {
        costs::SELFDESTRUCT
    } else {
        costs::ZERO
    }
}

/// Extra charge for touching a cold account on top of the warm static cost.
#[must_use]
pub const fn cold_account_surcharge() -> u64 {
    costs::COLD_ACCOUNT_ACCESS - costs::WARM_ACCESS
}

/// Extra charge for reading a cold slot on top of the warm static cost.
#[must_use]
pub const fn cold_sload_surcharge() -> u64 {
    costs::COLD_SLOAD - costs::WARM_ACCESS
}

// =============================================================================
// DYNAMIC COSTS
// =============================================================================

fn words(size: usize) -> u64 {
    size.div_ceil(32) as u64
}

/// Per-byte part of EXP: 10 per exponent byte, 50 from Spurious Dragon.
#[must_use]
pub fn exp_byte_cost(fork: Fork, exponent: U256) -> u64 {
    if exponent.is_zero() {
        return 0;
    }
    let per_byte = if fork >= Fork::SpuriousDragon {
        costs::EXP_BYTE
    } else {
        costs::EXP_BYTE_FRONTIER
    };
    // Count bytes in exponent
    let byte_size = (256 - u64::from(exponent.leading_zeros())).div_ceil(8);
    per_byte * byte_size
}

/// Per-word part of KECCAK256, also the CREATE2 hashing cost.
#[must_use]
pub fn keccak256_word_cost(data_size: usize) -> u64 {
    costs::KECCAK256_WORD.saturating_mul(words(data_size))
}

/// Topic and data part of LOG0..LOG4.
#[must_use]
pub fn log_dynamic_cost(data_size: usize, topic_count: usize) -> u64 {
    (costs::LOG_TOPIC * topic_count as u64)
        .saturating_add(costs::LOG_DATA.saturating_mul(data_size as u64))
}

/// Calculate gas cost for COPY operations (CALLDATACOPY, CODECOPY, etc.).
#[must_use]
pub fn copy_gas_cost(size: usize) -> u64 {
    costs::COPY.saturating_mul(words(size))
}

/// Init code word cost (EIP-3860), zero before Shanghai.
#[must_use]
pub fn init_code_cost(fork: Fork, init_code_size: usize) -> u64 {
    if fork >= Fork::Shanghai {
        costs::INIT_CODE_WORD.saturating_mul(words(init_code_size))
    } else {
        0
    }
}

/// Code deposit cost for a successful creation.
#[must_use]
pub fn code_deposit_cost(code_size: usize) -> u64 {
    costs::CODE_DEPOSIT.saturating_mul(code_size as u64)
}

/// Gas handed to a child frame, before any stipend.
///
/// Before EIP-150 the full requested amount must be available. From EIP-150
/// the request is capped at all but one 64th of the remaining gas.
///
/// # Errors
///
/// Returns `OutOfGas` before Tangerine Whistle when the request cannot be met.
pub fn call_gas(fork: Fork, available: u64, requested: U256) -> Result<u64, VmError> {
    if fork >= Fork::TangerineWhistle {
        let cap = available - available / 64;
        if requested > U256::from(cap) {
            Ok(cap)
        } else {
            Ok(requested.low_u64())
        }
    } else if requested > U256::from(available) {
        Err(VmError::OutOfGas)
    } else {
        Ok(requested.low_u64())
    }
}

/// Gas reserved for a CREATE child: all remaining, minus one 64th from EIP-150.
#[must_use]
pub fn create_gas(fork: Fork, available: u64) -> u64 {
    if fork >= Fork::TangerineWhistle {
        available - available / 64
    } else {
        available
    }
}

/// Outcome of pricing an SSTORE.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SstoreCost {
    /// Gas charged, excluding the cold slot surcharge.
    pub gas: u64,
    /// Added to the refund counter.
    pub refund_add: u64,
    /// Removed from the refund counter, applied before `refund_add`.
    pub refund_sub: u64,
}

/// Prices an SSTORE from the slot's original, current and new values.
#[must_use]
pub fn sstore_cost(fork: Fork, original: U256, current: U256, new: U256) -> SstoreCost {
    let clear_refund = if fork >= Fork::London {
        costs::SSTORE_CLEAR_REFUND_LONDON
    } else {
        costs::SSTORE_CLEAR_REFUND
    };

    if !fork.has_net_gas_metering() {
        let gas = if current.is_zero() && !new.is_zero() {
            costs::SSTORE_SET
        } else {
            costs::SSTORE_RESET
        };
        let refund_add = if !current.is_zero() && new.is_zero() {
            clear_refund
        } else {
            0
        };
        return SstoreCost {
            gas,
            refund_add,
            refund_sub: 0,
        };
    }

    let noop_cost = match fork {
        Fork::Constantinople => 200,
        f if f >= Fork::Berlin => costs::WARM_ACCESS,
        _ => 800,
    };
    let reset_cost = if fork >= Fork::Berlin {
        costs::SSTORE_RESET - costs::COLD_SLOAD
    } else {
        costs::SSTORE_RESET
    };

    let mut cost = SstoreCost {
        gas: noop_cost,
        ..SstoreCost::default()
    };

    if current == new {
        return cost;
    }

    if original == current {
        if original.is_zero() {
            cost.gas = costs::SSTORE_SET;
        } else {
            cost.gas = reset_cost;
            if new.is_zero() {
                cost.refund_add = clear_refund;
            }
        }
        return cost;
    }

    // Slot already dirty in this transaction
    if !original.is_zero() {
        if current.is_zero() {
            cost.refund_sub = clear_refund;
        } else if new.is_zero() {
            cost.refund_add = clear_refund;
        }
    }
    if original == new {
        let restored = if original.is_zero() {
            costs::SSTORE_SET
        } else {
            reset_cost
        };
        cost.refund_add += restored - noop_cost;
    }
    cost
}

// =============================================================================
// TESTS
// =============================================================================
