//! # Domain Invariants
//!
//! Properties every finished frame must satisfy. The engine asserts them in
//! debug builds after each finalization; tests call them directly.

use crate::domain::entities::{ExecutionResult, ExecutionStatus, VmConfig};
use crate::domain::fork::Fork;

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// Gas Limit Enforcement
///
/// A frame cannot use more gas than it was given.
#[must_use]
pub fn check_gas_limit_invariant(result: &ExecutionResult, gas_limit: u64) -> bool {
    result.gas_used <= gas_limit
}

/// No Effects on Failure
///
/// Reverted and failed frames surface no logs, no self-destructs and no address.
#[must_use]
pub fn check_revert_rollback_invariant(result: &ExecutionResult) -> bool {
    if result.status == ExecutionStatus::Success {
        result.error.is_none()
    } else {
        result.error.is_some()
            && result.logs.is_empty()
            && result.self_destructs.is_empty()
            && result.created_address.is_none()
    }
}

/// Error Consumes Gas
///
/// Anything but success or revert leaves no gas unused.
#[must_use]
pub fn check_error_gas_invariant(result: &ExecutionResult, gas_limit: u64) -> bool {
    result.status != ExecutionStatus::Error || result.gas_used == gas_limit
}

/// Refund Cap
///
/// The refund reported for a root frame never exceeds `gas_used / quotient`.
#[must_use]
pub fn check_refund_cap_invariant(result: &ExecutionResult, fork: Fork) -> bool {
    result.gas_refund <= result.gas_used / fork.refund_quotient()
}

/// Call Depth Limit
#[must_use]
pub fn check_call_depth_invariant(depth: usize, config: &VmConfig) -> bool {
    depth <= config.max_call_depth
}

/// Check every invariant of a finished root frame.
#[must_use]
pub fn check_all_invariants(
    result: &ExecutionResult,
    gas_limit: u64,
    depth: usize,
    config: &VmConfig,
) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if !check_gas_limit_invariant(result, gas_limit) {
        violations.push(InvariantViolation::GasLimitExceeded {
            used: result.gas_used,
            limit: gas_limit,
        });
    }

    if !check_revert_rollback_invariant(result) {
        violations.push(InvariantViolation::EffectsOnFailure {
            logs: result.logs.len(),
            self_destructs: result.self_destructs.len(),
        });
    }

    if result.error.as_ref().is_some_and(|e| e.consumes_all_gas())
        && !check_error_gas_invariant(result, gas_limit)
    {
        violations.push(InvariantViolation::GasNotConsumed {
            used: result.gas_used,
            limit: gas_limit,
        });
    }

    if !check_refund_cap_invariant(result, config.fork) {
        violations.push(InvariantViolation::RefundOverCap {
            refund: result.gas_refund,
            used: result.gas_used,
        });
    }

    if !check_call_depth_invariant(depth, config) {
        violations.push(InvariantViolation::CallDepthExceeded {
            depth,
            max: config.max_call_depth,
        });
    }

    if violations.is_empty() {
        InvariantCheckResult::Valid
    } else {
        InvariantCheckResult::Invalid(violations)
    }
}

// =============================================================================
// INVARIANT TYPES
// =============================================================================

/// Result of checking all invariants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantCheckResult {
    /// All invariants hold.
    Valid,
    /// One or more invariants violated.
    Invalid(Vec<InvariantViolation>),
}

impl InvariantCheckResult {
    /// Returns true if all invariants hold.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Specific invariant violation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvariantViolation {
    /// Gas limit exceeded.
    GasLimitExceeded { used: u64, limit: u64 },
    /// Failed frame surfaced effects.
    EffectsOnFailure { logs: usize, self_destructs: usize },
    /// Failed frame kept gas.
    GasNotConsumed { used: u64, limit: u64 },
    /// Refund above the fork's cap.
    RefundOverCap { refund: u64, used: u64 },
    /// Call depth exceeded.
    CallDepthExceeded { depth: usize, max: usize },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GasLimitExceeded { used, limit } => {
                write!(f, "gas limit exceeded: used {used} > limit {limit}")
            }
            Self::EffectsOnFailure {
                logs,
                self_destructs,
            } => {
                write!(
                    f,
                    "failed frame kept effects: {logs} logs, {self_destructs} self-destructs"
                )
            }
            Self::GasNotConsumed { used, limit } => {
                write!(f, "failed frame used {used} of {limit} gas")
            }
            Self::RefundOverCap { refund, used } => {
                write!(f, "refund {refund} over cap for {used} gas used")
            }
            Self::CallDepthExceeded { depth, max } => {
                write!(f, "call depth exceeded: {depth} > {max}")
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
