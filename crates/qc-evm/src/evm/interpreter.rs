//! # EVM Interpreter
//!
//! The dispatch loop for one frame. Each iteration fetches the byte at the
//! program counter, decodes it through the fork's [`InstructionTable`],
//! charges the fixed cost and runs the handler. Handlers price their dynamic
//! part (memory, copy, access) from the current stack before mutating
//! anything.
//!
//! The loop returns to the engine on STOP, RETURN, SELFDESTRUCT, any error
//! (REVERT included) or a CALL/CREATE request. System handlers live in
//! [`super::system`].

use crate::domain::entities::{Environment, Message, VmConfig};
use crate::domain::fork::Fork;
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Bytes, StorageKey, U256};
use crate::errors::VmError;
use crate::evm::arithmetic;
use crate::evm::frame::Frame;
use crate::evm::gas;
use crate::evm::memory::clamp_offset;
use crate::evm::opcodes::{Instruction, InstructionTable, INVALID};
use crate::ports::outbound::Ledger;
use crate::ports::tracer::Tracer;
use tracing::trace;

/// Child call requested by a CALL-family opcode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallRequest {
    /// Message for the child frame, gas stipend included.
    pub message: Message,
    /// Where the parent wants the returned bytes.
    pub ret_offset: usize,
    /// How many returned bytes the parent reserved.
    pub ret_len: usize,
}

/// Child creation requested by CREATE or CREATE2.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateRequest {
    /// Message for the child frame; `recipient` is the new address.
    pub message: Message,
}

/// Control flow after one instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Advance past the instruction and its immediates.
    Continue,
    /// The handler set the program counter.
    Jumped,
    /// Frame finished successfully.
    Halt,
    /// Suspend on a child call.
    Call(Box<CallRequest>),
    /// Suspend on a child creation.
    Create(Box<CreateRequest>),
}

/// Runs one frame against a ledger.
pub struct Interpreter<'a, L: Ledger> {
    /// Frame being executed.
    pub(crate) frame: &'a mut Frame,
    /// Frames below this one, root first.
    pub(crate) ancestors: &'a [Frame],
    /// World state.
    pub(crate) ledger: &'a mut L,
    /// Block and transaction context.
    pub(crate) env: &'a Environment,
    /// Engine limits.
    pub(crate) config: &'a VmConfig,
    /// Opcode table of the active fork.
    pub(crate) table: &'static InstructionTable,
}

impl<'a, L: Ledger> Interpreter<'a, L> {
    /// Create a new interpreter.
    pub fn new(
        frame: &'a mut Frame,
        ancestors: &'a [Frame],
        ledger: &'a mut L,
        env: &'a Environment,
        config: &'a VmConfig,
        table: &'static InstructionTable,
    ) -> Self {
        Self {
            frame,
            ancestors,
            ledger,
            env,
            config,
            table,
        }
    }

    /// Active fork.
    pub(crate) fn fork(&self) -> Fork {
        self.table.fork()
    }

    /// Runs until the frame halts, fails or suspends.
    ///
    /// Returns `Halt`, `Call` or `Create`; never `Continue` or `Jumped`.
    ///
    /// # Errors
    ///
    /// Any [`VmError`] raised by an instruction, `Revert` included. Output
    /// of RETURN and REVERT is left in `frame.output`.
    pub fn run<T: Tracer>(&mut self, tracer: &mut T) -> Result<Flow, VmError> {
        let depth = self.frame.depth();
        loop {
            let pc = self.frame.code.pc();
            // Running off the end is an implicit STOP
            let Some(byte) = self.frame.code.current() else {
                return Ok(Flow::Halt);
            };
            let Some(info) = self.table.get(byte).copied() else {
                // Unassigned on this fork; traced as INVALID
                let err = VmError::InvalidInstruction(byte);
                let gas = self.frame.gas.remaining();
                tracer.on_opcode_start(pc, Instruction::Invalid, gas, depth);
                tracer.on_gas_cost(Instruction::Invalid, 0, gas, depth);
                trace!(pc, byte, "undefined instruction");
                tracer.on_fault(
                    pc,
                    Instruction::Invalid,
                    gas,
                    self.frame.gas.refund(),
                    &self.frame.return_data,
                    depth,
                    &err,
                );
                return Err(err);
            };
            let instruction = info.instruction;

            let index = tracer.on_opcode_start(pc, instruction, self.frame.gas.remaining(), depth);
            tracer.on_gas_cost(instruction, info.static_gas, self.frame.gas.remaining(), depth);

            let result = self
                .frame
                .gas
                .consume(info.static_gas)
                .and_then(|()| self.step(instruction));

            let flow = match result {
                Ok(flow) => flow,
                Err(err) => {
                    // REVERT completes normally from the tracer's point of view
                    if err.is_revert() {
                        tracer.on_opcode_end(
                            pc,
                            instruction,
                            self.frame.gas.remaining(),
                            self.frame.gas.refund(),
                            &self.frame.return_data,
                            depth,
                            index,
                        );
                    } else {
                        trace!(pc, %instruction, %err, "instruction failed");
                        tracer.on_fault(
                            pc,
                            instruction,
                            self.frame.gas.remaining(),
                            self.frame.gas.refund(),
                            &self.frame.return_data,
                            depth,
                            &err,
                        );
                    }
                    return Err(err);
                }
            };

            tracer.on_opcode_end(
                pc,
                instruction,
                self.frame.gas.remaining(),
                self.frame.gas.refund(),
                &self.frame.return_data,
                depth,
                index,
            );

            match flow {
                Flow::Continue => self.frame.code.advance(1 + instruction.immediate_size()),
                Flow::Jumped => {}
                Flow::Halt => return Ok(Flow::Halt),
                Flow::Call(_) | Flow::Create(_) => {
                    self.frame.code.advance(1);
                    return Ok(flow);
                }
            }
        }
    }

    /// Executes one instruction. The fixed cost is already paid.
    pub(crate) fn step(&mut self, instruction: Instruction) -> Result<Flow, VmError> {
        match instruction {
            // =================================================================
            // STOP & ARITHMETIC
            // =================================================================
            Instruction::Stop => return Ok(Flow::Halt),

            Instruction::Add => self.binary(|a, b| a.overflowing_add(b).0)?,
            Instruction::Mul => self.binary(|a, b| a.overflowing_mul(b).0)?,
            Instruction::Sub => self.binary(|a, b| a.overflowing_sub(b).0)?,
            Instruction::Div => self.binary(|a, b| a.checked_div(b).unwrap_or_default())?,
            Instruction::SDiv => self.binary(arithmetic::signed_div)?,
            Instruction::Mod => self.binary(|a, b| a.checked_rem(b).unwrap_or_default())?,
            Instruction::SMod => self.binary(arithmetic::signed_mod)?,

            Instruction::AddMod => {
                let [a, b, n] = self.frame.stack.pop_n::<3>()?;
                self.frame.stack.push(arithmetic::add_mod(a, b, n))?;
            }

            Instruction::MulMod => {
                let [a, b, n] = self.frame.stack.pop_n::<3>()?;
                self.frame.stack.push(arithmetic::mul_mod(a, b, n))?;
            }

            Instruction::Exp => {
                let [base, exponent] = self.frame.stack.pop_n::<2>()?;
                self.frame
                    .gas
                    .consume(gas::exp_byte_cost(self.fork(), exponent))?;
                self.frame.stack.push(arithmetic::exp(base, exponent))?;
            }

            Instruction::SignExtend => self.binary(arithmetic::sign_extend)?,

            // =================================================================
            // COMPARISON & BITWISE
            // =================================================================
            Instruction::Lt => self.binary(|a, b| bool_word(a < b))?,
            Instruction::Gt => self.binary(|a, b| bool_word(a > b))?,
            Instruction::SLt => self.binary(|a, b| bool_word(arithmetic::signed_lt(a, b)))?,
            Instruction::SGt => self.binary(|a, b| bool_word(arithmetic::signed_lt(b, a)))?,
            Instruction::Eq => self.binary(|a, b| bool_word(a == b))?,

            Instruction::IsZero => {
                let a = self.frame.stack.pop()?;
                self.frame.stack.push(bool_word(a.is_zero()))?;
            }

            Instruction::And => self.binary(|a, b| a & b)?,
            Instruction::Or => self.binary(|a, b| a | b)?,
            Instruction::Xor => self.binary(|a, b| a ^ b)?,

            Instruction::Not => {
                let a = self.frame.stack.pop()?;
                self.frame.stack.push(!a)?;
            }

            Instruction::Byte => self.binary(arithmetic::byte)?,
            Instruction::Shl => self.binary(arithmetic::shl)?,
            Instruction::Shr => self.binary(arithmetic::shr)?,
            Instruction::Sar => self.binary(arithmetic::sar)?,

            Instruction::Keccak256 => {
                let [offset, size] = self.frame.stack.pop_n::<2>()?;
                let (offset, size) = (clamp_offset(offset), clamp_offset(size));
                self.frame.memory.extend(offset, size, &mut self.frame.gas)?;
                self.frame.gas.consume(gas::keccak256_word_cost(size))?;
                let hash = keccak256(&self.frame.memory.read(offset, size));
                self.frame.stack.push(hash.to_word())?;
            }

            // =================================================================
            // ENVIRONMENTAL INFORMATION
            // =================================================================
            Instruction::Address => self.push_address(self.frame.address())?,

            Instruction::Balance => {
                let address = self.pop_address()?;
                self.charge_account_access(address)?;
                let balance = self.ledger.balance(address);
                self.frame.stack.push(balance)?;
            }

            Instruction::Origin => self.push_address(self.env.tx.origin)?,
            Instruction::Caller => self.push_address(self.frame.message.sender)?,
            Instruction::CallValue => self.frame.stack.push(self.frame.message.value)?,

            Instruction::CallDataLoad => {
                let offset = self.frame.stack.pop()?;
                let word = padded_slice(self.frame.message.input.as_slice(), offset, 32);
                self.frame.stack.push(U256::from_big_endian(&word))?;
            }

            Instruction::CallDataSize => {
                let size = self.frame.message.input.len();
                self.frame.stack.push(U256::from(size))?;
            }

            Instruction::CallDataCopy => {
                let input = self.frame.message.input.clone();
                self.copy_to_memory(input.as_slice())?;
            }

            Instruction::CodeSize => {
                let size = self.frame.code.len();
                self.frame.stack.push(U256::from(size))?;
            }

            Instruction::CodeCopy => {
                let code = Bytes::from_slice(self.frame.code.as_slice());
                self.copy_to_memory(code.as_slice())?;
            }

            Instruction::GasPrice => self.frame.stack.push(self.env.tx.gas_price)?,

            Instruction::ExtCodeSize => {
                let address = self.pop_address()?;
                self.charge_account_access(address)?;
                let size = self.ledger.code(address).len();
                self.frame.stack.push(U256::from(size))?;
            }

            Instruction::ExtCodeCopy => {
                let address = self.pop_address()?;
                self.charge_account_access(address)?;
                let code = self.ledger.code(address);
                self.copy_to_memory(code.as_slice())?;
            }

            Instruction::ReturnDataSize => {
                let size = self.frame.return_data.len();
                self.frame.stack.push(U256::from(size))?;
            }

            Instruction::ReturnDataCopy => {
                let [dest, src, size] = self.frame.stack.pop_n::<3>()?;
                let end = src.checked_add(size);
                if end.map_or(true, |end| end > U256::from(self.frame.return_data.len())) {
                    return Err(VmError::OutOfBoundsMemoryAccess {
                        offset: clamp_offset(src),
                        size: clamp_offset(size),
                    });
                }
                let data = self.frame.return_data.clone();
                self.write_copy(dest, src, size, data.as_slice())?;
            }

            Instruction::ExtCodeHash => {
                let address = self.pop_address()?;
                self.charge_account_access(address)?;
                let hash = if self.ledger.is_dead(address) {
                    U256::zero()
                } else {
                    self.ledger.code_hash(address).to_word()
                };
                self.frame.stack.push(hash)?;
            }

            // =================================================================
            // BLOCK INFORMATION
            // =================================================================
            Instruction::BlockHash => {
                let number = self.frame.stack.pop()?;
                let hash = if number > U256::from(u64::MAX) {
                    U256::zero()
                } else {
                    self.env.block.block_hash(number.low_u64()).to_word()
                };
                self.frame.stack.push(hash)?;
            }

            Instruction::Coinbase => self.push_address(self.env.block.coinbase)?,
            Instruction::Timestamp => self.frame.stack.push(U256::from(self.env.block.timestamp))?,
            Instruction::Number => self.frame.stack.push(U256::from(self.env.block.number))?,
            Instruction::PrevRandao => self.frame.stack.push(self.env.block.difficulty)?,
            Instruction::GasLimit => self.frame.stack.push(U256::from(self.env.block.gas_limit))?,
            Instruction::ChainId => self.frame.stack.push(U256::from(self.env.block.chain_id))?,

            Instruction::SelfBalance => {
                let balance = self.ledger.balance(self.frame.address());
                self.frame.stack.push(balance)?;
            }

            Instruction::BaseFee => self.frame.stack.push(self.env.block.base_fee)?,

            // =================================================================
            // STACK, MEMORY, STORAGE
            // =================================================================
            Instruction::Pop => {
                self.frame.stack.pop()?;
            }

            Instruction::MLoad => {
                let offset = clamp_offset(self.frame.stack.pop()?);
                self.frame.memory.extend(offset, 32, &mut self.frame.gas)?;
                let value = self.frame.memory.read_word(offset);
                self.frame.stack.push(value)?;
            }

            Instruction::MStore => {
                let [offset, value] = self.frame.stack.pop_n::<2>()?;
                let offset = clamp_offset(offset);
                self.frame.memory.extend(offset, 32, &mut self.frame.gas)?;
                self.frame.memory.write_word(offset, value)?;
            }

            Instruction::MStore8 => {
                let [offset, value] = self.frame.stack.pop_n::<2>()?;
                let offset = clamp_offset(offset);
                self.frame.memory.extend(offset, 1, &mut self.frame.gas)?;
                self.frame.memory.write_byte(offset, value.byte(0))?;
            }

            Instruction::SLoad => {
                let key = StorageKey::from_u256(self.frame.stack.pop()?);
                let address = self.frame.address();
                if self.fork().has_access_lists()
                    && self.ledger.access_storage_key(address, key).is_cold()
                {
                    self.frame.gas.consume(gas::cold_sload_surcharge())?;
                }
                let value = self.ledger.storage(address, key);
                self.frame.stack.push(value.to_u256())?;
            }

            Instruction::SStore => self.op_sstore()?,

            // =================================================================
            // FLOW
            // =================================================================
            Instruction::Jump => {
                let dest = self.frame.stack.pop()?;
                self.jump(dest)?;
                return Ok(Flow::Jumped);
            }

            Instruction::JumpI => {
                let [dest, condition] = self.frame.stack.pop_n::<2>()?;
                if !condition.is_zero() {
                    self.jump(dest)?;
                    return Ok(Flow::Jumped);
                }
            }

            Instruction::Pc => {
                let pc = self.frame.code.pc();
                self.frame.stack.push(U256::from(pc))?;
            }

            Instruction::MSize => {
                let size = self.frame.memory.len();
                self.frame.stack.push(U256::from(size))?;
            }

            Instruction::Gas => {
                let remaining = self.frame.gas.remaining();
                self.frame.stack.push(U256::from(remaining))?;
            }

            Instruction::JumpDest => {}

            // =================================================================
            // PUSH, DUP, SWAP, LOG
            // =================================================================
            Instruction::Push(0) => self.frame.stack.push(U256::zero())?,

            Instruction::Push(n) => {
                let bytes = self.frame.code.read_immediate(usize::from(n));
                self.frame.stack.push(U256::from_big_endian(&bytes))?;
            }

            Instruction::Dup(n) => self.frame.stack.dup(usize::from(n))?,
            Instruction::Swap(n) => self.frame.stack.swap(usize::from(n))?,
            Instruction::Log(n) => self.op_log(usize::from(n))?,

            // =================================================================
            // SYSTEM
            // =================================================================
            Instruction::Create | Instruction::Create2 => return self.op_create(instruction),
            Instruction::Call
            | Instruction::CallCode
            | Instruction::DelegateCall
            | Instruction::StaticCall => return self.op_call(instruction),

            Instruction::Return => {
                self.set_output()?;
                return Ok(Flow::Halt);
            }

            Instruction::Revert => {
                self.set_output()?;
                return Err(VmError::Revert);
            }

            Instruction::Invalid => return Err(VmError::InvalidInstruction(INVALID)),

            Instruction::SelfDestruct => return self.op_selfdestruct(),
        }

        Ok(Flow::Continue)
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn binary(&mut self, op: impl FnOnce(U256, U256) -> U256) -> Result<(), VmError> {
        let [a, b] = self.frame.stack.pop_n::<2>()?;
        self.frame.stack.push(op(a, b))
    }

    pub(crate) fn pop_address(&mut self) -> Result<Address, VmError> {
        Ok(Address::from_word(self.frame.stack.pop()?))
    }

    fn push_address(&mut self, address: Address) -> Result<(), VmError> {
        self.frame.stack.push(address.to_word())
    }

    fn jump(&mut self, dest: U256) -> Result<(), VmError> {
        let dest = usize::try_from(dest).map_err(|_| VmError::InvalidJumpDestination(usize::MAX))?;
        self.frame.code.jump(dest)
    }

    /// Charges the EIP-2929 cold surcharge and warms `address`.
    pub(crate) fn charge_account_access(&mut self, address: Address) -> Result<(), VmError> {
        if self.fork().has_access_lists() && self.ledger.access_account(address).is_cold() {
            self.frame.gas.consume(gas::cold_account_surcharge())?;
        }
        Ok(())
    }

    /// CALLDATACOPY, CODECOPY, EXTCODECOPY: pops `(dest, src, size)`.
    fn copy_to_memory(&mut self, source: &[u8]) -> Result<(), VmError> {
        let [dest, src, size] = self.frame.stack.pop_n::<3>()?;
        self.write_copy(dest, src, size, source)
    }

    fn write_copy(&mut self, dest: U256, src: U256, size: U256, source: &[u8]) -> Result<(), VmError> {
        let (dest, size) = (clamp_offset(dest), clamp_offset(size));
        self.frame.memory.extend(dest, size, &mut self.frame.gas)?;
        self.frame.gas.consume(gas::copy_gas_cost(size))?;
        if size == 0 {
            return Ok(());
        }
        let data = padded_slice(source, src, size);
        self.frame.memory.write(dest, &data)
    }

    /// RETURN and REVERT: pops `(offset, size)` into `frame.output`.
    fn set_output(&mut self) -> Result<(), VmError> {
        let [offset, size] = self.frame.stack.pop_n::<2>()?;
        let (offset, size) = (clamp_offset(offset), clamp_offset(size));
        self.frame.memory.extend(offset, size, &mut self.frame.gas)?;
        self.frame.output = Bytes::from_vec(self.frame.memory.read(offset, size));
        Ok(())
    }
}

/// 1 for true, 0 for false.
pub(crate) fn bool_word(value: bool) -> U256 {
    if value {
        U256::one()
    } else {
        U256::zero()
    }
}

/// `len` bytes of `source` from `offset`, zero-padded past the end.
pub(crate) fn padded_slice(source: &[u8], offset: U256, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    if offset < U256::from(source.len()) {
        let start = offset.low_u64() as usize;
        let available = (source.len() - start).min(len);
        out[..available].copy_from_slice(&source[start..start + available]);
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================
