//! # EVM Implementation
//!
//! Bytecode execution: the primitives a frame owns, the dispatch loop and
//! the engine that drives nested frames.
//!
//! ## Components
//!
//! - `engine.rs` - Frame stack driver, snapshots, root setup
//! - `interpreter.rs` - Dispatch loop and opcode handlers
//! - `system.rs` - SSTORE, LOG, CALL/CREATE family, SELFDESTRUCT
//! - `frame.rs` - Per-call execution state
//! - `gas.rs` - Gas metering and the fork schedule
//! - `memory.rs` - Memory management
//! - `stack.rs` - Stack operations
//! - `code.rs` - Program counter and JUMPDEST analysis
//! - `opcodes.rs` - Opcode definitions and per-fork tables
//! - `arithmetic.rs` - Signed and 512-bit word arithmetic
//! - `precompiles/` - Precompiled contracts

pub mod arithmetic;
pub mod code;
pub mod engine;
pub mod frame;
pub mod gas;
pub mod interpreter;
pub mod memory;
pub mod opcodes;
pub mod precompiles;
pub mod stack;
mod system;

pub use code::CodeStream;
pub use engine::Evm;
pub use frame::{Continuation, Frame, FrameState};
pub use gas::GasMeter;
pub use interpreter::{CallRequest, CreateRequest, Flow, Interpreter};
pub use memory::Memory;
pub use opcodes::{Instruction, InstructionTable, OpInfo};
pub use precompiles::{NoPrecompiles, Precompile, PrecompileOutput, PrecompileSet, StandardPrecompiles};
pub use stack::Stack;
