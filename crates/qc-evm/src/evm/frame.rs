//! # Call Frame
//!
//! One activation of a call or contract creation. A frame owns its stack,
//! memory, gas meter and code; the engine keeps frames in a `Vec` where the
//! parent of a frame is the element below it.

use crate::domain::entities::{Log, Message};
use crate::domain::value_objects::{Address, Bytes};
use crate::errors::VmError;
use crate::evm::code::CodeStream;
use crate::evm::gas::GasMeter;
use crate::evm::memory::Memory;
use crate::evm::stack::Stack;
use crate::ports::outbound::SnapshotId;

/// Lifecycle of a frame.
///
/// `Created → Prepared → Running → Suspended ⇄ Resuming → Finalizing → Done`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameState {
    /// Pushed, nothing done yet.
    Created,
    /// Snapshot taken, value moved, code loaded.
    Prepared,
    /// Inside the dispatch loop.
    Running,
    /// Waiting on a child frame.
    Suspended,
    /// Child result merged, dispatch continues.
    Resuming,
    /// Committing or rolling back.
    Finalizing,
    /// Outcome available.
    Done,
}

/// What to do with a child's result when the parent resumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Continuation {
    /// Copy output to `[ret_offset, ret_offset + ret_len)` and push 1/0.
    Call {
        /// Memory offset for the returned bytes.
        ret_offset: usize,
        /// Bytes reserved for the returned data.
        ret_len: usize,
    },
    /// Push the new address or 0.
    Create,
}

/// Execution state of one call or creation.
#[derive(Debug)]
pub struct Frame {
    /// Message that opened the frame.
    pub message: Message,
    /// Operand stack.
    pub stack: Stack,
    /// Scratch memory.
    pub memory: Memory,
    /// Gas and refund counters.
    pub gas: GasMeter,
    /// Code being run.
    pub code: CodeStream,
    /// RETURN or REVERT data.
    pub output: Bytes,
    /// Output of the last finished child.
    pub return_data: Bytes,
    /// Logs emitted by this frame and its successful children.
    pub logs: Vec<Log>,
    /// Accounts registered by SELFDESTRUCT.
    pub self_destructs: Vec<Address>,
    /// Lifecycle state.
    pub state: FrameState,
    /// Ledger snapshot held by the frame.
    pub snapshot: Option<SnapshotId>,
    /// Set while suspended on a child.
    pub continuation: Option<Continuation>,
    /// Failure that ended the frame, set on entering `Finalizing`.
    pub error: Option<VmError>,
}

impl Frame {
    /// New frame in `Created` state.
    ///
    /// `refund` seeds the refund counter so a child continues the parent's
    /// running total.
    #[must_use]
    pub fn new(message: Message, refund: u64, stack_limit: usize) -> Self {
        let gas = GasMeter::with_refund(message.gas_limit, refund);
        Self {
            message,
            stack: Stack::with_limit(stack_limit),
            memory: Memory::new(),
            gas,
            code: CodeStream::default(),
            output: Bytes::new(),
            return_data: Bytes::new(),
            logs: Vec::new(),
            self_destructs: Vec::new(),
            state: FrameState::Created,
            snapshot: None,
            continuation: None,
            error: None,
        }
    }

    /// Installs the code to run.
    pub fn load_code(&mut self, code: Bytes) {
        self.code = CodeStream::new(code);
    }

    /// Account the frame acts on.
    #[must_use]
    pub fn address(&self) -> Address {
        self.message.recipient
    }

    /// Nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.message.depth
    }

    /// Returns true if the frame may not change state.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.message.is_static
    }

    /// Returns true if `address` is already registered for deletion here.
    #[must_use]
    pub fn has_self_destructed(&self, address: Address) -> bool {
        self.self_destructs.contains(&address)
    }

    /// Registers `address` for deletion once.
    pub fn register_self_destruct(&mut self, address: Address) {
        if !self.has_self_destructed(address) {
            self.self_destructs.push(address);
        }
    }

    /// Moves to `Finalizing`, recording the failure if there is one.
    pub fn end(&mut self, error: Option<VmError>) {
        self.error = error;
        self.state = FrameState::Finalizing;
    }

    /// Takes over logs and registrations of a successful child.
    pub fn absorb(&mut self, logs: Vec<Log>, self_destructs: Vec<Address>) {
        self.logs.extend(logs);
        for address in self_destructs {
            self.register_self_destruct(address);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
