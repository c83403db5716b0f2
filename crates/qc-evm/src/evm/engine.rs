//! # Call Engine
//!
//! Drives a root message and every call or creation it spawns to completion.
//!
//! Frames live in a `Vec` owned by [`Evm::execute`]; the parent of a frame is
//! the element below it. Each turn of the driver loop moves the top frame one
//! step through its lifecycle:
//!
//! ```text
//! Created ──prepare──▶ Prepared ──enter──▶ Running ──CALL/CREATE──▶ Suspended
//!                                             │                        │
//!                                             │          child Done    ▼
//!                                             │  ◀──────────────── Resuming
//!                                             ▼
//!                                        Finalizing ──commit/rollback──▶ Done
//! ```
//!
//! Every frame holds a ledger snapshot from `Prepared` on. A frame that fails
//! rolls back its own snapshot only; the parent sees a failed child and
//! carries on.

use crate::domain::entities::{
    CallKind, Environment, ExecutionResult, ExecutionStatus, Message, VmConfig,
};
use crate::domain::fork::Fork;
use crate::domain::invariants::check_all_invariants;
use crate::domain::services::{compute_contract_address, compute_contract_address_create2};
use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::{PrecompileError, StateError, VmError};
use crate::evm::frame::{Continuation, Frame, FrameState};
use crate::evm::gas::{self, GasMeter};
use crate::evm::interpreter::{bool_word, Flow, Interpreter};
use crate::evm::opcodes::InstructionTable;
use crate::evm::precompiles::PrecompileSet;
use crate::ports::inbound::MessageExecutor;
use crate::ports::outbound::Ledger;
use crate::ports::tracer::Tracer;
use tracing::{debug, field, instrument, warn, Span};

/// EVM execution engine bound to one ledger.
pub struct Evm<'a, L: Ledger, P: PrecompileSet, T: Tracer> {
    ledger: &'a mut L,
    precompiles: P,
    tracer: T,
    env: Environment,
    config: VmConfig,
    table: &'static InstructionTable,
}

impl<'a, L: Ledger, P: PrecompileSet, T: Tracer> Evm<'a, L, P, T> {
    /// Creates an engine for `config.fork`.
    pub fn new(
        ledger: &'a mut L,
        precompiles: P,
        tracer: T,
        env: Environment,
        config: VmConfig,
    ) -> Self {
        let table = InstructionTable::for_fork(config.fork);
        Self {
            ledger,
            precompiles,
            tracer,
            env,
            config,
            table,
        }
    }

    /// The ledger the engine writes to.
    pub fn ledger(&self) -> &L {
        self.ledger
    }

    /// Active limits.
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Runs a root message to completion.
    ///
    /// The root's `gas_refund` is already capped by the fork's refund
    /// quotient and is zero unless the message succeeded.
    #[instrument(
        skip_all,
        fields(
            kind = ?message.kind,
            sender = %message.sender,
            recipient = tracing::field::Empty,
            gas_limit = message.gas_limit,
            fork = %self.config.fork,
        )
    )]
    pub fn execute(&mut self, mut message: Message) -> ExecutionResult {
        let fork = self.config.fork;
        let gas_limit = message.gas_limit;
        let depth = message.depth;

        if depth > self.config.max_call_depth {
            warn!(depth, "root message above the call depth limit");
            return ExecutionResult::failure(
                VmError::CallDepthExceeded {
                    depth,
                    max: self.config.max_call_depth,
                },
                0,
            );
        }

        if message.is_create() {
            let address = self.creation_address(&message);
            message.recipient = address;
            message.code_address = address;
        }
        Span::current().record("recipient", field::display(message.recipient));

        if fork.has_access_lists() {
            self.ledger.access_account(message.sender);
            self.ledger.access_account(message.recipient);
            for address in self.precompiles.addresses(fork) {
                self.ledger.access_account(address);
            }
            // EIP-3651
            if fork >= Fork::Shanghai {
                self.ledger.access_account(self.env.block.coinbase);
            }
        }

        let mut result = self.drive(message);
        result.gas_refund = if result.is_success() {
            GasMeter::with_refund(gas_limit, result.gas_refund).final_refund(result.gas_used, fork)
        } else {
            0
        };

        debug_assert!(
            check_all_invariants(&result, gas_limit, depth, &self.config).is_valid(),
            "root result violates execution invariants: {result:?}"
        );
        debug!(
            status = ?result.status,
            gas_used = result.gas_used,
            gas_refund = result.gas_refund,
            "message executed"
        );
        result
    }

    fn creation_address(&self, message: &Message) -> Address {
        match message.kind {
            CallKind::Create2 { salt } => {
                compute_contract_address_create2(message.sender, salt, message.input.as_slice())
            }
            _ => compute_contract_address(message.sender, self.ledger.nonce(message.sender)),
        }
    }

    // =========================================================================
    // DRIVER LOOP
    // =========================================================================

    fn drive(&mut self, root: Message) -> ExecutionResult {
        let mut frames = vec![Frame::new(root, 0, self.config.stack_limit)];

        loop {
            let is_root = frames.len() == 1;
            let Some(frame) = frames.last_mut() else {
                unreachable!("driver loop runs out of frames before the root finishes");
            };

            let state = frame.state;
            match state {
                FrameState::Created => self.prepare(frame),
                FrameState::Prepared => self.enter(frame),
                FrameState::Running | FrameState::Resuming => self.run_top(&mut frames),
                FrameState::Finalizing => {
                    let outcome = self.finalize(frame, is_root);
                    let Some(child) = frames.pop() else {
                        unreachable!("finalized frame missing from the stack");
                    };
                    match frames.last_mut() {
                        Some(parent) => {
                            if let Err(err) = resume(parent, &child, outcome) {
                                parent.end(Some(err));
                            }
                        }
                        None => return outcome,
                    }
                }
                FrameState::Suspended | FrameState::Done => {
                    unreachable!("frame in state {state:?} on top of the stack")
                }
            }
        }
    }

    // =========================================================================
    // CREATED → PREPARED
    // =========================================================================

    fn prepare(&mut self, frame: &mut Frame) {
        self.tracer.on_frame_prepare(frame.depth());
        let prepared = if frame.message.is_create() {
            self.prepare_create(frame)
        } else {
            self.prepare_call(frame)
        };

        let message = &frame.message;
        self.tracer.on_frame_start(
            message.sender,
            message.recipient,
            message.is_create(),
            message.input.as_slice(),
            message.gas_limit,
            message.value,
        );

        match prepared {
            Ok(()) => frame.state = FrameState::Prepared,
            Err(err) => {
                debug!(depth = frame.depth(), %err, "frame aborted before execution");
                frame.end(Some(err));
            }
        }
    }

    fn prepare_call(&mut self, frame: &mut Frame) -> Result<(), VmError> {
        let (sender, recipient, value) = (frame.message.sender, frame.address(), frame.message.value);
        frame.snapshot = Some(self.ledger.snapshot());

        if frame.message.kind.transfers_value() {
            self.transfer(sender, recipient, value)?;
        }
        if !self
            .precompiles
            .contains(self.config.fork, frame.message.code_address)
        {
            frame.load_code(self.ledger.code(frame.message.code_address));
        }
        Ok(())
    }

    fn prepare_create(&mut self, frame: &mut Frame) -> Result<(), VmError> {
        let fork = self.config.fork;
        let (sender, address, value) = (frame.message.sender, frame.address(), frame.message.value);

        // Nonce bump and target warming survive a failed creation
        self.ledger
            .inc_nonce(sender)
            .map_err(|_| VmError::NonceOverflow(sender))?;
        if fork.has_access_lists() {
            self.ledger.access_account(address);
        }
        frame.snapshot = Some(self.ledger.snapshot());

        if self.ledger.contract_collision(address) {
            warn!(%address, "contract address collision");
            return Err(VmError::AddressCollision(address));
        }
        self.ledger.clear_storage(address);
        // EIP-161
        let initial_nonce = u64::from(fork >= Fork::SpuriousDragon);
        self.ledger.set_nonce(address, initial_nonce);
        self.transfer(sender, address, value)?;

        frame.load_code(frame.message.input.clone());
        Ok(())
    }

    fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), VmError> {
        self.ledger
            .transfer(from, to, value)
            .map_err(|err| match err {
                StateError::InsufficientBalance {
                    required,
                    available,
                    ..
                } => VmError::InsufficientBalance {
                    required,
                    available,
                },
                other => VmError::State(other),
            })
    }

    // =========================================================================
    // PREPARED → RUNNING
    // =========================================================================

    fn enter(&mut self, frame: &mut Frame) {
        if frame.message.is_create() {
            frame.state = FrameState::Running;
            return;
        }
        let Some(precompile) = self
            .precompiles
            .lookup(self.config.fork, frame.message.code_address)
        else {
            frame.state = FrameState::Running;
            return;
        };

        let result = precompile
            .execute(frame.message.input.as_slice(), frame.gas.remaining())
            .and_then(|out| {
                frame
                    .gas
                    .consume(out.gas_used)
                    .map_err(|_| PrecompileError::OutOfGas)?;
                frame.output = out.output;
                Ok(())
            });
        frame.end(result.err().map(VmError::PrecompileFailure));
    }

    /// Runs the top frame until it halts, fails or spawns a child.
    fn run_top(&mut self, frames: &mut Vec<Frame>) {
        let Some((frame, ancestors)) = frames.split_last_mut() else {
            return;
        };
        frame.state = FrameState::Running;

        let flow = Interpreter::new(
            frame,
            ancestors,
            &mut *self.ledger,
            &self.env,
            &self.config,
            self.table,
        )
        .run(&mut self.tracer);

        let (message, continuation) = match flow {
            Ok(Flow::Call(request)) => (
                request.message,
                Continuation::Call {
                    ret_offset: request.ret_offset,
                    ret_len: request.ret_len,
                },
            ),
            Ok(Flow::Create(request)) => (request.message, Continuation::Create),
            Ok(_) => {
                frame.end(None);
                return;
            }
            Err(err) => {
                frame.end(Some(err));
                return;
            }
        };

        debug!(
            depth = message.depth,
            kind = ?message.kind,
            recipient = %message.recipient,
            gas = message.gas_limit,
            "spawning child frame"
        );
        frame.continuation = Some(continuation);
        frame.state = FrameState::Suspended;
        let child = Frame::new(message, frame.gas.refund(), self.config.stack_limit);
        frames.push(child);
    }

    // =========================================================================
    // FINALIZING → DONE
    // =========================================================================

    fn finalize(&mut self, frame: &mut Frame, is_root: bool) -> ExecutionResult {
        let mut error = frame.error.take();

        if error.is_none() && frame.message.is_create() {
            error = self.deposit_code(frame).err();
        }
        if error.is_none() && is_root {
            for address in &frame.self_destructs {
                self.ledger.destroy_account(*address);
            }
        }

        if let Some(id) = frame.snapshot.take() {
            let settled = match error {
                None => self.ledger.commit(id),
                Some(_) => self.ledger.rollback(id),
            };
            if let Err(err) = settled {
                warn!(%err, "ledger rejected snapshot");
                if error.is_none() {
                    error = Some(VmError::State(err));
                }
            }
        }

        let result = match error {
            None => {
                let is_create = frame.message.is_create();
                ExecutionResult {
                    status: ExecutionStatus::Success,
                    gas_used: frame.gas.used(),
                    gas_refund: frame.gas.refund(),
                    output: std::mem::take(&mut frame.output),
                    logs: std::mem::take(&mut frame.logs),
                    self_destructs: std::mem::take(&mut frame.self_destructs),
                    error: None,
                    created_address: is_create.then(|| frame.address()),
                }
            }
            Some(VmError::Revert) => {
                ExecutionResult::revert(std::mem::take(&mut frame.output), frame.gas.used())
            }
            Some(err) => {
                if err.consumes_all_gas() {
                    frame.gas.consume_all();
                }
                ExecutionResult::failure(err, frame.gas.used())
            }
        };

        self.tracer
            .on_frame_end(&result.output, result.gas_used, result.error.as_ref());
        debug!(
            depth = frame.depth(),
            status = ?result.status,
            gas_used = result.gas_used,
            "frame finished"
        );
        frame.state = FrameState::Done;
        result
    }

    /// Installs the returned bytes as contract code, leaving `output` empty.
    fn deposit_code(&mut self, frame: &mut Frame) -> Result<(), VmError> {
        let fork = self.config.fork;
        let code = std::mem::take(&mut frame.output);

        // EIP-3541
        if fork >= Fork::London && code.as_slice().first() == Some(&0xEF) {
            return Err(VmError::InvalidCodePrefix);
        }
        // EIP-170
        if fork >= Fork::SpuriousDragon && code.len() > self.config.max_code_size {
            return Err(VmError::CodeSizeExceeded {
                size: code.len(),
                max: self.config.max_code_size,
            });
        }

        match frame.gas.consume(gas::code_deposit_cost(code.len())) {
            Ok(()) => self.ledger.set_code(frame.address(), code),
            Err(err) if fork >= Fork::Homestead => return Err(err),
            Err(_) => debug!(address = %frame.address(), "code deposit unaffordable, keeping empty code"),
        }
        Ok(())
    }
}

/// Merges a finished child into its parent and resumes the parent.
fn resume(parent: &mut Frame, child: &Frame, outcome: ExecutionResult) -> Result<(), VmError> {
    parent.gas.return_gas(child.gas.remaining());
    let success = outcome.is_success();
    if success {
        parent.gas.set_refund(child.gas.refund());
        parent.absorb(outcome.logs, outcome.self_destructs);
    }

    match parent.continuation.take() {
        Some(Continuation::Call {
            ret_offset,
            ret_len,
        }) => {
            let len = ret_len.min(outcome.output.len());
            parent
                .memory
                .write(ret_offset, &outcome.output.as_slice()[..len])?;
            parent.return_data = outcome.output;
            parent.stack.push(bool_word(success))?;
        }
        Some(Continuation::Create) => {
            let address = outcome.created_address.filter(|_| success);
            parent.return_data = if success {
                Bytes::new()
            } else {
                outcome.output
            };
            parent
                .stack
                .push(address.map_or(U256::zero(), |created| created.to_word()))?;
        }
        None => {}
    }

    parent.state = FrameState::Resuming;
    Ok(())
}

impl<L: Ledger, P: PrecompileSet, T: Tracer> MessageExecutor for Evm<'_, L, P, T> {
    fn execute(&mut self, message: Message) -> ExecutionResult {
        Evm::execute(self, message)
    }
}

// =============================================================================
// TESTS
// =============================================================================
