//! # EVM Opcodes
//!
//! Opcode bytes, the decoded [`Instruction`] set and the per-fork
//! [`InstructionTable`] the dispatch loop indexes.
//!
//! Tables are built once per fork by a startup loop: base entries are added
//! in activation order and the PUSH, DUP, SWAP and LOG families are filled in
//! by loops. Entries introduced after the active fork are left out, so their
//! bytes decode as invalid instructions.

use crate::domain::fork::Fork;
use crate::evm::gas::{self, costs};
use std::fmt;
use std::sync::OnceLock;

// =============================================================================
// OPCODE BYTES
// =============================================================================

pub const STOP: u8 = 0x00;
pub const ADD: u8 = 0x01;
pub const MUL: u8 = 0x02;
pub const SUB: u8 = 0x03;
pub const DIV: u8 = 0x04;
pub const SDIV: u8 = 0x05;
pub const MOD: u8 = 0x06;
pub const SMOD: u8 = 0x07;
pub const ADDMOD: u8 = 0x08;
pub const MULMOD: u8 = 0x09;
pub const EXP: u8 = 0x0A;
pub const SIGNEXTEND: u8 = 0x0B;

pub const LT: u8 = 0x10;
pub const GT: u8 = 0x11;
pub const SLT: u8 = 0x12;
pub const SGT: u8 = 0x13;
pub const EQ: u8 = 0x14;
pub const ISZERO: u8 = 0x15;
pub const AND: u8 = 0x16;
pub const OR: u8 = 0x17;
pub const XOR: u8 = 0x18;
pub const NOT: u8 = 0x19;
pub const BYTE: u8 = 0x1A;
pub const SHL: u8 = 0x1B;
pub const SHR: u8 = 0x1C;
pub const SAR: u8 = 0x1D;

pub const KECCAK256: u8 = 0x20;

pub const ADDRESS: u8 = 0x30;
pub const BALANCE: u8 = 0x31;
pub const ORIGIN: u8 = 0x32;
pub const CALLER: u8 = 0x33;
pub const CALLVALUE: u8 = 0x34;
pub const CALLDATALOAD: u8 = 0x35;
pub const CALLDATASIZE: u8 = 0x36;
pub const CALLDATACOPY: u8 = 0x37;
pub const CODESIZE: u8 = 0x38;
pub const CODECOPY: u8 = 0x39;
pub const GASPRICE: u8 = 0x3A;
pub const EXTCODESIZE: u8 = 0x3B;
pub const EXTCODECOPY: u8 = 0x3C;
pub const RETURNDATASIZE: u8 = 0x3D;
pub const RETURNDATACOPY: u8 = 0x3E;
pub const EXTCODEHASH: u8 = 0x3F;

pub const BLOCKHASH: u8 = 0x40;
pub const COINBASE: u8 = 0x41;
pub const TIMESTAMP: u8 = 0x42;
pub const NUMBER: u8 = 0x43;
pub const PREVRANDAO: u8 = 0x44; // Was DIFFICULTY
pub const GASLIMIT: u8 = 0x45;
pub const CHAINID: u8 = 0x46;
pub const SELFBALANCE: u8 = 0x47;
pub const BASEFEE: u8 = 0x48;

pub const POP: u8 = 0x50;
pub const MLOAD: u8 = 0x51;
pub const MSTORE: u8 = 0x52;
pub const MSTORE8: u8 = 0x53;
pub const SLOAD: u8 = 0x54;
pub const SSTORE: u8 = 0x55;
pub const JUMP: u8 = 0x56;
pub const JUMPI: u8 = 0x57;
pub const PC: u8 = 0x58;
pub const MSIZE: u8 = 0x59;
pub const GAS: u8 = 0x5A;
pub const JUMPDEST: u8 = 0x5B;

pub const PUSH0: u8 = 0x5F;
pub const PUSH1: u8 = 0x60;
pub const PUSH2: u8 = 0x61;
pub const PUSH20: u8 = 0x73;
pub const PUSH32: u8 = 0x7F;
pub const DUP1: u8 = 0x80;
pub const DUP2: u8 = 0x81;
pub const DUP16: u8 = 0x8F;
pub const SWAP1: u8 = 0x90;
pub const SWAP16: u8 = 0x9F;
pub const LOG0: u8 = 0xA0;
pub const LOG1: u8 = 0xA1;
pub const LOG4: u8 = 0xA4;

pub const CREATE: u8 = 0xF0;
pub const CALL: u8 = 0xF1;
pub const CALLCODE: u8 = 0xF2;
pub const RETURN: u8 = 0xF3;
pub const DELEGATECALL: u8 = 0xF4;
pub const CREATE2: u8 = 0xF5;
pub const STATICCALL: u8 = 0xFA;
pub const REVERT: u8 = 0xFD;
pub const INVALID: u8 = 0xFE;
pub const SELFDESTRUCT: u8 = 0xFF;

// =============================================================================
// INSTRUCTION
// =============================================================================

/// Decoded EVM instruction.
///
/// Opcode families carry their parameter: `Push(n)` reads `n` immediate
/// bytes (`Push(0)` is PUSH0), `Dup(n)` and `Swap(n)` are 1-indexed, `Log(n)`
/// takes `n` topics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Instruction {
    // Stop and Arithmetic
    Stop,
    Add,
    Mul,
    Sub,
    Div,
    SDiv,
    Mod,
    SMod,
    AddMod,
    MulMod,
    Exp,
    SignExtend,

    // Comparison & Bitwise
    Lt,
    Gt,
    SLt,
    SGt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,

    Keccak256,

    // Environmental Information
    Address,
    Balance,
    Origin,
    Caller,
    CallValue,
    CallDataLoad,
    CallDataSize,
    CallDataCopy,
    CodeSize,
    CodeCopy,
    GasPrice,
    ExtCodeSize,
    ExtCodeCopy,
    ReturnDataSize,
    ReturnDataCopy,
    ExtCodeHash,

    // Block Information
    BlockHash,
    Coinbase,
    Timestamp,
    Number,
    PrevRandao,
    GasLimit,
    ChainId,
    SelfBalance,
    BaseFee,

    // Stack, Memory, Storage, Flow
    Pop,
    MLoad,
    MStore,
    MStore8,
    SLoad,
    SStore,
    Jump,
    JumpI,
    Pc,
    MSize,
    Gas,
    JumpDest,

    // Families
    Push(u8),
    Dup(u8),
    Swap(u8),
    Log(u8),

    // System
    Create,
    Call,
    CallCode,
    Return,
    DelegateCall,
    Create2,
    StaticCall,
    Revert,
    Invalid,
    SelfDestruct,
}

impl Instruction {
    /// Gas charged before the handler runs on `fork`.
    ///
    /// Memory expansion, copy, access-list surcharges, SSTORE and the value
    /// parts of CALL are priced by the handlers.
    #[must_use]
    pub fn static_gas(self, fork: Fork) -> u64 {
        use Instruction::*;
        match self {
            Stop | Return | Revert | Invalid | SStore => costs::ZERO,

            Address | Origin | Caller | CallValue | CallDataSize | CodeSize | GasPrice
            | ReturnDataSize | Coinbase | Timestamp | Number | PrevRandao | GasLimit | ChainId
            | BaseFee | Pop | Pc | MSize | Gas | Push(0) => costs::BASE,

            Add | Sub | Lt | Gt | SLt | SGt | Eq | IsZero | And | Or | Xor | Not | Byte | Shl
            | Shr | Sar | CallDataLoad | CallDataCopy | CodeCopy | ReturnDataCopy | MLoad
            | MStore | MStore8 | Push(_) | Dup(_) | Swap(_) => costs::VERY_LOW,

            Mul | Div | SDiv | Mod | SMod | SignExtend | SelfBalance => costs::LOW,

            AddMod | MulMod | Jump => costs::MID,

            JumpI | Exp => costs::HIGH,

            JumpDest => costs::JUMPDEST,
            Keccak256 => costs::KECCAK256,
            BlockHash => costs::BLOCKHASH,

            Balance => gas::balance_cost(fork),
            ExtCodeSize | ExtCodeCopy => gas::ext_code_cost(fork),
            ExtCodeHash => gas::ext_code_hash_cost(fork),
            SLoad => gas::sload_cost(fork),
            Call | CallCode | DelegateCall | StaticCall => gas::call_cost(fork),
            SelfDestruct => gas::selfdestruct_cost(fork),

            Log(_) => costs::LOG,
            Create | Create2 => costs::CREATE,
        }
    }

    /// Number of immediate bytes following the opcode.
    #[must_use]
    pub fn immediate_size(self) -> usize {
        match self {
            Instruction::Push(n) => usize::from(n),
            _ => 0,
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Instruction::*;
        let name = match self {
            Push(n) => return write!(f, "PUSH{n}"),
            Dup(n) => return write!(f, "DUP{n}"),
            Swap(n) => return write!(f, "SWAP{n}"),
            Log(n) => return write!(f, "LOG{n}"),
            Stop => "STOP",
            Add => "ADD",
            Mul => "MUL",
            Sub => "SUB",
            Div => "DIV",
            SDiv => "SDIV",
            Mod => "MOD",
            SMod => "SMOD",
            AddMod => "ADDMOD",
            MulMod => "MULMOD",
            Exp => "EXP",
            SignExtend => "SIGNEXTEND",
            Lt => "LT",
            Gt => "GT",
            SLt => "SLT",
            SGt => "SGT",
            Eq => "EQ",
            IsZero => "ISZERO",
            And => "AND",
            Or => "OR",
            Xor => "XOR",
            Not => "NOT",
            Byte => "BYTE",
            Shl => "SHL",
            Shr => "SHR",
            Sar => "SAR",
            Keccak256 => "KECCAK256",
            Address => "ADDRESS",
            Balance => "BALANCE",
            Origin => "ORIGIN",
            Caller => "CALLER",
            CallValue => "CALLVALUE",
            CallDataLoad => "CALLDATALOAD",
            CallDataSize => "CALLDATASIZE",
            CallDataCopy => "CALLDATACOPY",
            CodeSize => "CODESIZE",
            CodeCopy => "CODECOPY",
            GasPrice => "GASPRICE",
            ExtCodeSize => "EXTCODESIZE",
            ExtCodeCopy => "EXTCODECOPY",
            ReturnDataSize => "RETURNDATASIZE",
            ReturnDataCopy => "RETURNDATACOPY",
            ExtCodeHash => "EXTCODEHASH",
            BlockHash => "BLOCKHASH",
            Coinbase => "COINBASE",
            Timestamp => "TIMESTAMP",
            Number => "NUMBER",
            PrevRandao => "PREVRANDAO",
            GasLimit => "GASLIMIT",
            ChainId => "CHAINID",
            SelfBalance => "SELFBALANCE",
            BaseFee => "BASEFEE",
            Pop => "POP",
            MLoad => "MLOAD",
            MStore => "MSTORE",
            MStore8 => "MSTORE8",
            SLoad => "SLOAD",
            SStore => "SSTORE",
            Jump => "JUMP",
            JumpI => "JUMPI",
            Pc => "PC",
            MSize => "MSIZE",
            Gas => "GAS",
            JumpDest => "JUMPDEST",
            Create => "CREATE",
            Call => "CALL",
            CallCode => "CALLCODE",
            Return => "RETURN",
            DelegateCall => "DELEGATECALL",
            Create2 => "CREATE2",
            StaticCall => "STATICCALL",
            Revert => "REVERT",
            Invalid => "INVALID",
            SelfDestruct => "SELFDESTRUCT",
        };
        f.write_str(name)
    }
}

// =============================================================================
// INSTRUCTION TABLE
// =============================================================================

/// One table slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpInfo {
    /// Decoded instruction.
    pub instruction: Instruction,
    /// Gas charged before execution.
    pub static_gas: u64,
    /// Fork that introduced the opcode.
    pub introduced: Fork,
}

/// Opcode byte to instruction mapping for one fork.
#[derive(Clone, Debug)]
pub struct InstructionTable {
    fork: Fork,
    entries: [Option<OpInfo>; 256],
}

/// Non-family opcodes with the fork that introduced them.
const BASE_INSTRUCTIONS: &[(u8, Instruction, Fork)] = &[
    (STOP, Instruction::Stop, Fork::Frontier),
    (ADD, Instruction::Add, Fork::Frontier),
    (MUL, Instruction::Mul, Fork::Frontier),
    (SUB, Instruction::Sub, Fork::Frontier),
    (DIV, Instruction::Div, Fork::Frontier),
    (SDIV, Instruction::SDiv, Fork::Frontier),
    (MOD, Instruction::Mod, Fork::Frontier),
    (SMOD, Instruction::SMod, Fork::Frontier),
    (ADDMOD, Instruction::AddMod, Fork::Frontier),
    (MULMOD, Instruction::MulMod, Fork::Frontier),
    (EXP, Instruction::Exp, Fork::Frontier),
    (SIGNEXTEND, Instruction::SignExtend, Fork::Frontier),
    (LT, Instruction::Lt, Fork::Frontier),
    (GT, Instruction::Gt, Fork::Frontier),
    (SLT, Instruction::SLt, Fork::Frontier),
    (SGT, Instruction::SGt, Fork::Frontier),
    (EQ, Instruction::Eq, Fork::Frontier),
    (ISZERO, Instruction::IsZero, Fork::Frontier),
    (AND, Instruction::And, Fork::Frontier),
    (OR, Instruction::Or, Fork::Frontier),
    (XOR, Instruction::Xor, Fork::Frontier),
    (NOT, Instruction::Not, Fork::Frontier),
    (BYTE, Instruction::Byte, Fork::Frontier),
    (KECCAK256, Instruction::Keccak256, Fork::Frontier),
    (ADDRESS, Instruction::Address, Fork::Frontier),
    (BALANCE, Instruction::Balance, Fork::Frontier),
    (ORIGIN, Instruction::Origin, Fork::Frontier),
    (CALLER, Instruction::Caller, Fork::Frontier),
    (CALLVALUE, Instruction::CallValue, Fork::Frontier),
    (CALLDATALOAD, Instruction::CallDataLoad, Fork::Frontier),
    (CALLDATASIZE, Instruction::CallDataSize, Fork::Frontier),
    (CALLDATACOPY, Instruction::CallDataCopy, Fork::Frontier),
    (CODESIZE, Instruction::CodeSize, Fork::Frontier),
    (CODECOPY, Instruction::CodeCopy, Fork::Frontier),
    (GASPRICE, Instruction::GasPrice, Fork::Frontier),
    (EXTCODESIZE, Instruction::ExtCodeSize, Fork::Frontier),
    (EXTCODECOPY, Instruction::ExtCodeCopy, Fork::Frontier),
    (BLOCKHASH, Instruction::BlockHash, Fork::Frontier),
    (COINBASE, Instruction::Coinbase, Fork::Frontier),
    (TIMESTAMP, Instruction::Timestamp, Fork::Frontier),
    (NUMBER, Instruction::Number, Fork::Frontier),
    (PREVRANDAO, Instruction::PrevRandao, Fork::Frontier),
    (GASLIMIT, Instruction::GasLimit, Fork::Frontier),
    (POP, Instruction::Pop, Fork::Frontier),
    (MLOAD, Instruction::MLoad, Fork::Frontier),
    (MSTORE, Instruction::MStore, Fork::Frontier),
    (MSTORE8, Instruction::MStore8, Fork::Frontier),
    (SLOAD, Instruction::SLoad, Fork::Frontier),
    (SSTORE, Instruction::SStore, Fork::Frontier),
    (JUMP, Instruction::Jump, Fork::Frontier),
    (JUMPI, Instruction::JumpI, Fork::Frontier),
    (PC, Instruction::Pc, Fork::Frontier),
    (MSIZE, Instruction::MSize, Fork::Frontier),
    (GAS, Instruction::Gas, Fork::Frontier),
    (JUMPDEST, Instruction::JumpDest, Fork::Frontier),
    (CREATE, Instruction::Create, Fork::Frontier),
    (CALL, Instruction::Call, Fork::Frontier),
    (CALLCODE, Instruction::CallCode, Fork::Frontier),
    (RETURN, Instruction::Return, Fork::Frontier),
    (INVALID, Instruction::Invalid, Fork::Frontier),
    (SELFDESTRUCT, Instruction::SelfDestruct, Fork::Frontier),
    (DELEGATECALL, Instruction::DelegateCall, Fork::Homestead),
    (RETURNDATASIZE, Instruction::ReturnDataSize, Fork::Byzantium),
    (RETURNDATACOPY, Instruction::ReturnDataCopy, Fork::Byzantium),
    (STATICCALL, Instruction::StaticCall, Fork::Byzantium),
    (REVERT, Instruction::Revert, Fork::Byzantium),
    (SHL, Instruction::Shl, Fork::Constantinople),
    (SHR, Instruction::Shr, Fork::Constantinople),
    (SAR, Instruction::Sar, Fork::Constantinople),
    (EXTCODEHASH, Instruction::ExtCodeHash, Fork::Constantinople),
    (CREATE2, Instruction::Create2, Fork::Constantinople),
    (CHAINID, Instruction::ChainId, Fork::Istanbul),
    (SELFBALANCE, Instruction::SelfBalance, Fork::Istanbul),
    (BASEFEE, Instruction::BaseFee, Fork::London),
    (PUSH0, Instruction::Push(0), Fork::Shanghai),
];

impl InstructionTable {
    /// Shared table for `fork`, built on first use.
    #[must_use]
    pub fn for_fork(fork: Fork) -> &'static InstructionTable {
        static TABLES: OnceLock<Vec<InstructionTable>> = OnceLock::new();
        let tables = TABLES.get_or_init(|| Fork::ALL.into_iter().map(Self::build).collect());
        &tables[fork.index()]
    }

    fn build(fork: Fork) -> Self {
        let mut table = Self {
            fork,
            entries: [None; 256],
        };

        for &(byte, instruction, introduced) in BASE_INSTRUCTIONS {
            table.insert(byte, instruction, introduced);
        }
        for n in 1..=32u8 {
            table.insert(PUSH1 + n - 1, Instruction::Push(n), Fork::Frontier);
        }
        for n in 1..=16u8 {
            table.insert(DUP1 + n - 1, Instruction::Dup(n), Fork::Frontier);
            table.insert(SWAP1 + n - 1, Instruction::Swap(n), Fork::Frontier);
        }
        for n in 0..=4u8 {
            table.insert(LOG0 + n, Instruction::Log(n), Fork::Frontier);
        }

        table
    }

    fn insert(&mut self, byte: u8, instruction: Instruction, introduced: Fork) {
        if introduced > self.fork {
            return;
        }
        self.entries[usize::from(byte)] = Some(OpInfo {
            instruction,
            static_gas: instruction.static_gas(self.fork),
            introduced,
        });
    }

    /// Fork this table was built for.
    #[must_use]
    pub fn fork(&self) -> Fork {
        self.fork
    }

    /// Looks up an opcode byte; `None` if unassigned on this fork.
    #[must_use]
    pub fn get(&self, opcode: u8) -> Option<&OpInfo> {
        self.entries[usize::from(opcode)].as_ref()
    }
}

// =============================================================================
// TESTS
// =============================================================================
