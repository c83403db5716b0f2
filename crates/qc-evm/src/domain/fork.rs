//! # Protocol Forks
//!
//! Totally ordered protocol versions. Every fork-dependent rule in the engine
//! compares against a [`Fork`] value selected once per execution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ethereum hard fork, ordered by activation.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Fork {
    /// Genesis rules.
    Frontier,
    /// EIP-2, EIP-7 (DELEGATECALL).
    Homestead,
    /// EIP-150 gas repricing and the 63/64 call rule.
    #[serde(alias = "tangerine")]
    TangerineWhistle,
    /// EIP-160, EIP-161 (dead accounts), EIP-170 (code size).
    #[serde(alias = "spurious")]
    SpuriousDragon,
    /// REVERT, RETURNDATA*, STATICCALL.
    Byzantium,
    /// Shifts, CREATE2, EXTCODEHASH, EIP-1283 net metering.
    Constantinople,
    /// Constantinople without EIP-1283.
    Petersburg,
    /// EIP-1884, EIP-2200, CHAINID, SELFBALANCE.
    Istanbul,
    /// EIP-2929 warm/cold access.
    Berlin,
    /// EIP-3529 refund reduction, EIP-3541, BASEFEE.
    London,
    /// The Merge (PREVRANDAO).
    Paris,
    /// PUSH0, EIP-3651, EIP-3860.
    #[default]
    Shanghai,
}

impl Fork {
    /// Every fork in activation order.
    pub const ALL: [Fork; 12] = [
        Fork::Frontier,
        Fork::Homestead,
        Fork::TangerineWhistle,
        Fork::SpuriousDragon,
        Fork::Byzantium,
        Fork::Constantinople,
        Fork::Petersburg,
        Fork::Istanbul,
        Fork::Berlin,
        Fork::London,
        Fork::Paris,
        Fork::Shanghai,
    ];

    /// Position in [`Fork::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Lowercase name, as accepted by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Fork::Frontier => "frontier",
            Fork::Homestead => "homestead",
            Fork::TangerineWhistle => "tangerinewhistle",
            Fork::SpuriousDragon => "spuriousdragon",
            Fork::Byzantium => "byzantium",
            Fork::Constantinople => "constantinople",
            Fork::Petersburg => "petersburg",
            Fork::Istanbul => "istanbul",
            Fork::Berlin => "berlin",
            Fork::London => "london",
            Fork::Paris => "paris",
            Fork::Shanghai => "shanghai",
        }
    }

    /// Divisor capping the refund against gas used (EIP-3529 raises it to 5).
    #[must_use]
    pub fn refund_quotient(self) -> u64 {
        if self >= Fork::London {
            5
        } else {
            2
        }
    }

    /// SSTORE uses net gas metering (EIP-1283 in Constantinople, EIP-2200 from Istanbul).
    #[must_use]
    pub fn has_net_gas_metering(self) -> bool {
        self == Fork::Constantinople || self >= Fork::Istanbul
    }

    /// Account and slot access is priced warm/cold (EIP-2929).
    #[must_use]
    pub fn has_access_lists(self) -> bool {
        self >= Fork::Berlin
    }
}

impl fmt::Display for Fork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unknown fork name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown fork: {0}")]
pub struct UnknownFork(pub String);

impl FromStr for Fork {
    type Err = UnknownFork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "tangerine" => return Ok(Fork::TangerineWhistle),
            "spurious" => return Ok(Fork::SpuriousDragon),
            "merge" => return Ok(Fork::Paris),
            _ => {}
        }
        Fork::ALL
            .into_iter()
            .find(|fork| fork.name() == normalized)
            .ok_or_else(|| UnknownFork(s.to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
