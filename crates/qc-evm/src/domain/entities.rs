//! # Core Domain Entities
//!
//! Main business entities for bytecode execution: the message that starts a
//! frame, the environment it reads, and the result it produces.

use crate::domain::fork::Fork;
use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue, U256};
use crate::errors::{ConfigError, VmError};
use serde::{Deserialize, Serialize};
use std::env;
use tracing::{info, warn};

// =============================================================================
// MESSAGE
// =============================================================================

/// How a frame was entered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// Plain message call.
    Call,
    /// Run the target's code against the caller's storage, with value.
    CallCode,
    /// Run the target's code in the caller's context, keeping sender and value.
    DelegateCall,
    /// Read-only call (Byzantium).
    StaticCall,
    /// Contract creation with a nonce-derived address.
    Create,
    /// Contract creation with a salt-derived address (Constantinople).
    Create2 {
        /// User supplied salt.
        salt: U256,
    },
}

impl CallKind {
    /// Returns true for CREATE and CREATE2.
    #[must_use]
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create | Self::Create2 { .. })
    }

    /// Returns true when entering the frame moves `value` from sender to recipient.
    #[must_use]
    pub fn transfers_value(&self) -> bool {
        !matches!(self, Self::DelegateCall | Self::StaticCall)
    }
}

/// A call or contract-creation request.
///
/// For create kinds `input` holds the init code and `recipient` the new
/// contract address (the engine computes it for the root message).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Entry kind.
    pub kind: CallKind,
    /// Caller seen by CALLER.
    pub sender: Address,
    /// Account whose storage and balance the frame acts on.
    pub recipient: Address,
    /// Account whose code runs.
    pub code_address: Address,
    /// Calldata, or init code for creations.
    pub input: Bytes,
    /// Value seen by CALLVALUE.
    pub value: U256,
    /// Gas available to the frame.
    pub gas_limit: u64,
    /// State changes forbidden.
    pub is_static: bool,
    /// Nesting depth, 0 for the root message.
    pub depth: usize,
}

impl Message {
    /// Top-level message call.
    #[must_use]
    pub fn call(sender: Address, recipient: Address, value: U256, input: Bytes, gas_limit: u64) -> Self {
        Self {
            kind: CallKind::Call,
            sender,
            recipient,
            code_address: recipient,
            input,
            value,
            gas_limit,
            is_static: false,
            depth: 0,
        }
    }

    /// Top-level contract creation.
    #[must_use]
    pub fn create(sender: Address, value: U256, init_code: Bytes, gas_limit: u64) -> Self {
        Self {
            kind: CallKind::Create,
            sender,
            recipient: Address::ZERO,
            code_address: Address::ZERO,
            input: init_code,
            value,
            gas_limit,
            is_static: false,
            depth: 0,
        }
    }

    /// Top-level salted contract creation.
    #[must_use]
    pub fn create2(
        sender: Address,
        value: U256,
        init_code: Bytes,
        salt: U256,
        gas_limit: u64,
    ) -> Self {
        Self {
            kind: CallKind::Create2 { salt },
            ..Self::create(sender, value, init_code, gas_limit)
        }
    }

    /// Marks the message static.
    #[must_use]
    pub fn into_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Returns true for CREATE and CREATE2 messages.
    #[must_use]
    pub fn is_create(&self) -> bool {
        self.kind.is_create()
    }
}

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Block context for execution.
///
/// Provides access to block-level information during EVM execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockContext {
    /// Block number.
    pub number: u64,
    /// Block timestamp (unix seconds).
    pub timestamp: u64,
    /// Coinbase address (block proposer).
    pub coinbase: Address,
    /// Block difficulty before Paris, PREVRANDAO after.
    pub difficulty: U256,
    /// Block gas limit.
    pub gas_limit: u64,
    /// Base fee (EIP-1559).
    pub base_fee: U256,
    /// Chain ID (EIP-155).
    pub chain_id: u64,
    /// Hashes of preceding blocks, oldest first; the last entry is block `number - 1`.
    #[serde(default)]
    pub recent_hashes: Vec<Hash>,
}

impl BlockContext {
    /// Number of ancestors visible to BLOCKHASH.
    pub const BLOCKHASH_WINDOW: u64 = 256;

    /// BLOCKHASH semantics: zero outside the 256 most recent ancestors.
    #[must_use]
    pub fn block_hash(&self, number: u64) -> Hash {
        if number >= self.number || self.number - number > Self::BLOCKHASH_WINDOW {
            return Hash::ZERO;
        }
        let distance = self.number - number;
        usize::try_from(distance)
            .ok()
            .and_then(|d| self.recent_hashes.len().checked_sub(d))
            .and_then(|i| self.recent_hashes.get(i))
            .copied()
            .unwrap_or(Hash::ZERO)
    }
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            number: 0,
            timestamp: 0,
            coinbase: Address::ZERO,
            difficulty: U256::zero(),
            gas_limit: 30_000_000,
            base_fee: U256::zero(),
            chain_id: 1,
            recent_hashes: Vec::new(),
        }
    }
}

/// Transaction-wide values visible to every frame.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TxContext {
    /// Externally owned account that signed the transaction.
    pub origin: Address,
    /// Effective gas price.
    pub gas_price: U256,
}

/// Everything a frame can read that is not world state.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Environment {
    /// Block being built or validated.
    pub block: BlockContext,
    /// Transaction being executed.
    pub tx: TxContext,
}

// =============================================================================
// EXECUTION RESULT
// =============================================================================

/// Terminal status of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// STOP, RETURN, SELFDESTRUCT or running off the end of the code.
    Success,
    /// REVERT: state rolled back, unused gas kept.
    Revert,
    /// Any other failure: state rolled back, all gas consumed.
    Error,
}

/// Result of executing one frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionResult {
    /// How the frame ended.
    pub status: ExecutionStatus,
    /// Gas consumed out of the frame's limit.
    pub gas_used: u64,
    /// Refund counter. For the root frame this is already capped.
    pub gas_refund: u64,
    /// RETURN or REVERT data; empty for a successful creation.
    pub output: Bytes,
    /// Logs emitted, empty unless successful.
    pub logs: Vec<Log>,
    /// Accounts registered by SELFDESTRUCT, empty unless successful.
    pub self_destructs: Vec<Address>,
    /// Failure detail for `Revert` and `Error`.
    pub error: Option<VmError>,
    /// Address of the deployed contract for successful creations.
    pub created_address: Option<Address>,
}

impl ExecutionResult {
    /// Creates a successful execution result.
    #[must_use]
    pub fn success(output: Bytes, gas_used: u64) -> Self {
        Self {
            status: ExecutionStatus::Success,
            gas_used,
            gas_refund: 0,
            output,
            logs: Vec::new(),
            self_destructs: Vec::new(),
            error: None,
            created_address: None,
        }
    }

    /// Creates a revert result carrying the revert data.
    #[must_use]
    pub fn revert(data: Bytes, gas_used: u64) -> Self {
        Self {
            status: ExecutionStatus::Revert,
            error: Some(VmError::Revert),
            ..Self::success(data, gas_used)
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failure(error: VmError, gas_used: u64) -> Self {
        Self {
            status: ExecutionStatus::Error,
            error: Some(error),
            ..Self::success(Bytes::new(), gas_used)
        }
    }

    /// Returns true if the frame succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// Decodes a Solidity `Error(string)` revert reason, if present.
    #[must_use]
    pub fn revert_reason(&self) -> Option<String> {
        if self.status != ExecutionStatus::Revert {
            return None;
        }
        decode_revert_reason(&self.output)
    }
}

/// Attempts to decode a revert reason from output data.
fn decode_revert_reason(data: &Bytes) -> Option<String> {
    // Error(string) selector: 0x08c379a0
    if data.len() < 68 {
        return None;
    }

    let selector = &data.as_slice()[0..4];
    if selector != [0x08, 0xc3, 0x79, 0xa0] {
        return None;
    }

    // selector (4) + offset word (32), then the length word
    let offset = 4 + 32;
    let len_word = U256::from_big_endian(&data.as_slice()[offset..offset + 32]);
    let len = usize::try_from(len_word).ok()?;

    let end = (offset + 32).checked_add(len)?;
    let string_bytes = data.as_slice().get(offset + 32..end)?;
    String::from_utf8(string_bytes.to_vec()).ok()
}

// =============================================================================
// STATE CHANGE
// =============================================================================

/// Net state transition reported after a committed execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateChange {
    /// Account balance now equals `balance`.
    BalanceSet { address: Address, balance: U256 },
    /// Account nonce now equals `nonce`.
    NonceSet { address: Address, nonce: u64 },
    /// Contract code deployed.
    CodeSet { address: Address, code: Bytes },
    /// Storage slot written with a non-zero value.
    StorageWrite {
        address: Address,
        key: StorageKey,
        value: StorageValue,
    },
    /// Storage slot cleared.
    StorageDelete { address: Address, key: StorageKey },
    /// Account removed by SELFDESTRUCT.
    AccountDestroyed { address: Address },
}

// =============================================================================
// LOG (EVENT)
// =============================================================================

/// Emitted log (event) from contract execution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Contract address that emitted the log.
    pub address: Address,
    /// Indexed topics (up to 4).
    pub topics: Vec<Hash>,
    /// Non-indexed data.
    pub data: Bytes,
}

impl Log {
    /// Creates a new log.
    #[must_use]
    pub fn new(address: Address, topics: Vec<Hash>, data: Bytes) -> Self {
        Self {
            address,
            topics,
            data,
        }
    }
}

// =============================================================================
// VM CONFIGURATION
// =============================================================================

/// Virtual Machine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Active protocol version.
    pub fork: Fork,
    /// Maximum call depth (default: 1024).
    pub max_call_depth: usize,
    /// Maximum code size in bytes (EIP-170: 24KB).
    pub max_code_size: usize,
    /// Maximum init code size in bytes (EIP-3860: 48KB).
    pub max_init_code_size: usize,
    /// Maximum stack size (default: 1024).
    pub stack_limit: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            fork: Fork::default(),
            max_call_depth: 1024,
            max_code_size: 24_576,      // 24 KB (EIP-170)
            max_init_code_size: 49_152, // 48 KB (EIP-3860)
            stack_limit: 1024,
        }
    }
}

impl VmConfig {
    /// Default limits on the given fork.
    #[must_use]
    pub fn for_fork(fork: Fork) -> Self {
        Self {
            fork,
            ..Self::default()
        }
    }

    /// Parses a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for malformed JSON or zero limits.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        info!(fork = %config.fork, max_call_depth = config.max_call_depth, "loaded VM configuration");
        Ok(config)
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QC_EVM_FORK`: fork name (default: shanghai)
    /// - `QC_EVM_MAX_CALL_DEPTH`: call depth limit (default: 1024)
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let fork = match env::var("QC_EVM_FORK") {
            Ok(name) => name.parse().unwrap_or_else(|err| {
                warn!(%err, "falling back to default fork");
                defaults.fork
            }),
            Err(_) => defaults.fork,
        };

        let max_call_depth = env::var("QC_EVM_MAX_CALL_DEPTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|depth| *depth > 0)
            .unwrap_or(defaults.max_call_depth);

        let config = Self {
            fork,
            max_call_depth,
            ..defaults
        };
        info!(fork = %config.fork, max_call_depth, "VM configuration from environment");
        config
    }

    /// Rejects limits that would make every execution fail.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_call_depth == 0 {
            return Err(ConfigError::Invalid("max_call_depth must be positive".into()));
        }
        if self.stack_limit == 0 {
            return Err(ConfigError::Invalid("stack_limit must be positive".into()));
        }
        if self.max_code_size == 0 || self.max_init_code_size == 0 {
            return Err(ConfigError::Invalid("code size limits must be positive".into()));
        }
        Ok(())
    }
}

// =============================================================================
// ACCOUNT STATE
// =============================================================================

/// Account state in the state trie.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Account balance.
    pub balance: U256,
    /// Account nonce.
    pub nonce: u64,
    /// Code hash (keccak256 of code, or empty hash for EOA).
    pub code_hash: Hash,
    /// Storage root (merkle root of storage trie).
    pub storage_root: Hash,
}

impl AccountState {
    /// Empty code hash (keccak256 of empty bytes).
    #[rustfmt::skip]
    pub const EMPTY_CODE_HASH: Hash = Hash([
        0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c,
        0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
        0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b,
        0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
    ]);

    /// Creates a new empty EOA.
    #[must_use]
    pub fn new_eoa(balance: U256, nonce: u64) -> Self {
        Self {
            balance,
            nonce,
            code_hash: Self::EMPTY_CODE_HASH,
            storage_root: Hash::ZERO,
        }
    }

    /// Returns true if the account has no code.
    #[must_use]
    pub fn has_empty_code(&self) -> bool {
        self.code_hash == Self::EMPTY_CODE_HASH || self.code_hash == Hash::ZERO
    }

    /// Returns true if this account is empty in the EIP-161 sense.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce == 0 && self.has_empty_code()
    }
}

// =============================================================================
// TESTS
// =============================================================================
