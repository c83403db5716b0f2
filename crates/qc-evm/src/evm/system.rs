//! # System Instructions
//!
//! Handlers that touch world state beyond a plain read: SSTORE, LOG, the
//! CALL family, CREATE/CREATE2 and SELFDESTRUCT.
//!
//! State-changing handlers reject static frames before any mutation. CALL
//! and CREATE do not run the child themselves; they price the request,
//! reserve the child's gas and hand a [`Flow::Call`] or [`Flow::Create`] back
//! to the engine.

use crate::domain::entities::{CallKind, Log, Message};
use crate::domain::fork::Fork;
use crate::domain::services::{compute_contract_address, compute_contract_address_create2};
use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue, U256};
use crate::errors::VmError;
use crate::evm::gas::{self, costs};
use crate::evm::interpreter::{CallRequest, CreateRequest, Flow, Interpreter};
use crate::evm::memory::clamp_offset;
use crate::evm::opcodes::Instruction;
use crate::ports::outbound::Ledger;
use tracing::{debug, trace};

impl<L: Ledger> Interpreter<'_, L> {
    fn require_non_static(&self) -> Result<(), VmError> {
        if self.frame.is_static() {
            return Err(VmError::StaticStateChangeViolation);
        }
        Ok(())
    }

    /// Child depth is within the limit and the frame can pay `value`.
    fn can_spawn(&self, value: U256) -> bool {
        if self.frame.depth() + 1 > self.config.max_call_depth {
            debug!(depth = self.frame.depth(), "call depth limit reached");
            return false;
        }
        if !value.is_zero() && self.ledger.balance(self.frame.address()) < value {
            debug!(%value, "insufficient balance for child frame");
            return false;
        }
        true
    }

    /// Child not spawned: reserved gas goes back and 0 is pushed.
    fn skip_spawn(&mut self, reserved: u64) -> Result<Flow, VmError> {
        self.frame.gas.return_gas(reserved);
        self.frame.return_data = Bytes::new();
        self.frame.stack.push(U256::zero())?;
        Ok(Flow::Continue)
    }

    /// Is `address` registered for deletion in this frame or an ancestor?
    fn is_registered_self_destruct(&self) -> bool {
        let address = self.frame.address();
        self.frame.has_self_destructed(address)
            || self.ancestors.iter().any(|f| f.has_self_destructed(address))
    }

    // =========================================================================
    // SSTORE
    // =========================================================================

    pub(crate) fn op_sstore(&mut self) -> Result<(), VmError> {
        self.require_non_static()?;
        let fork = self.fork();

        // EIP-2200 sentry
        if fork >= Fork::Istanbul && self.frame.gas.remaining() <= costs::SSTORE_SENTRY {
            return Err(VmError::OutOfGas);
        }

        let [key, value] = self.frame.stack.pop_n::<2>()?;
        let key = StorageKey::from_u256(key);
        let address = self.frame.address();

        if fork.has_access_lists() && self.ledger.access_storage_key(address, key).is_cold() {
            self.frame.gas.consume(costs::COLD_SLOAD)?;
        }

        let original = self.ledger.committed_storage(address, key).to_u256();
        let current = self.ledger.storage(address, key).to_u256();
        let cost = gas::sstore_cost(fork, original, current, value);

        self.frame.gas.consume(cost.gas)?;
        self.frame.gas.sub_refund(cost.refund_sub);
        self.frame.gas.add_refund(cost.refund_add);
        self.ledger
            .set_storage(address, key, StorageValue::from_u256(value));
        Ok(())
    }

    // =========================================================================
    // LOG
    // =========================================================================

    pub(crate) fn op_log(&mut self, topic_count: usize) -> Result<(), VmError> {
        self.require_non_static()?;

        let [offset, size] = self.frame.stack.pop_n::<2>()?;
        let mut topics = Vec::with_capacity(topic_count);
        for _ in 0..topic_count {
            topics.push(Hash::from_word(self.frame.stack.pop()?));
        }

        let (offset, size) = (clamp_offset(offset), clamp_offset(size));
        self.frame.memory.extend(offset, size, &mut self.frame.gas)?;
        self.frame
            .gas
            .consume(gas::log_dynamic_cost(size, topic_count))?;

        let data = Bytes::from_vec(self.frame.memory.read(offset, size));
        let log = Log::new(self.frame.address(), topics, data);
        self.frame.logs.push(log);
        Ok(())
    }

    // =========================================================================
    // CALL FAMILY
    // =========================================================================

    pub(crate) fn op_call(&mut self, instruction: Instruction) -> Result<Flow, VmError> {
        let fork = self.fork();
        let [requested, target] = self.frame.stack.pop_n::<2>()?;
        let target = Address::from_word(target);
        let value = match instruction {
            Instruction::Call | Instruction::CallCode => self.frame.stack.pop()?,
            _ => U256::zero(),
        };
        let [in_offset, in_len, out_offset, out_len] = self.frame.stack.pop_n::<4>()?;

        if instruction == Instruction::Call && !value.is_zero() {
            self.require_non_static()?;
        }

        self.charge_account_access(target)?;

        let (in_offset, in_len) = (clamp_offset(in_offset), clamp_offset(in_len));
        let (out_offset, out_len) = (clamp_offset(out_offset), clamp_offset(out_len));
        self.frame
            .memory
            .extend(in_offset, in_len, &mut self.frame.gas)?;
        self.frame
            .memory
            .extend(out_offset, out_len, &mut self.frame.gas)?;

        if !value.is_zero() {
            self.frame.gas.consume(costs::CALL_VALUE)?;
        }
        if instruction == Instruction::Call {
            let new_account = if fork >= Fork::SpuriousDragon {
                !value.is_zero() && self.ledger.is_dead(target)
            } else {
                !self.ledger.account_exists(target)
            };
            if new_account {
                self.frame.gas.consume(costs::NEW_ACCOUNT)?;
            }
        }

        let mut child_gas = gas::call_gas(fork, self.frame.gas.remaining(), requested)?;
        self.frame.gas.consume(child_gas)?;
        if !value.is_zero() {
            child_gas += costs::CALL_STIPEND;
        }

        if !self.can_spawn(value) {
            return self.skip_spawn(child_gas);
        }

        let input = Bytes::from_vec(self.frame.memory.read(in_offset, in_len));
        let parent = &self.frame.message;
        let (kind, sender, recipient, value) = match instruction {
            Instruction::CallCode => (CallKind::CallCode, parent.recipient, parent.recipient, value),
            Instruction::DelegateCall => {
                (CallKind::DelegateCall, parent.sender, parent.recipient, parent.value)
            }
            Instruction::StaticCall => (CallKind::StaticCall, parent.recipient, target, U256::zero()),
            _ => (CallKind::Call, parent.recipient, target, value),
        };
        let message = Message {
            kind,
            sender,
            recipient,
            code_address: target,
            input,
            value,
            gas_limit: child_gas,
            is_static: parent.is_static || kind == CallKind::StaticCall,
            depth: parent.depth + 1,
        };

        trace!(%instruction, %target, gas = child_gas, "spawning call");
        Ok(Flow::Call(Box::new(CallRequest {
            message,
            ret_offset: out_offset,
            ret_len: out_len,
        })))
    }

    // =========================================================================
    // CREATE / CREATE2
    // =========================================================================

    pub(crate) fn op_create(&mut self, instruction: Instruction) -> Result<Flow, VmError> {
        self.require_non_static()?;
        let fork = self.fork();

        let [value, offset, size] = self.frame.stack.pop_n::<3>()?;
        let salt = match instruction {
            Instruction::Create2 => Some(self.frame.stack.pop()?),
            _ => None,
        };

        let (offset, size) = (clamp_offset(offset), clamp_offset(size));
        self.frame.memory.extend(offset, size, &mut self.frame.gas)?;

        if fork >= Fork::Shanghai && size > self.config.max_init_code_size {
            return Err(VmError::InitCodeSizeExceeded {
                size,
                max: self.config.max_init_code_size,
            });
        }
        self.frame.gas.consume(gas::init_code_cost(fork, size))?;
        if salt.is_some() {
            self.frame.gas.consume(gas::keccak256_word_cost(size))?;
        }

        let init_code = self.frame.memory.read(offset, size);
        let creator = self.frame.address();
        let (kind, address) = match salt {
            Some(salt) => (
                CallKind::Create2 { salt },
                compute_contract_address_create2(creator, salt, &init_code),
            ),
            None => (
                CallKind::Create,
                compute_contract_address(creator, self.ledger.nonce(creator)),
            ),
        };

        let child_gas = gas::create_gas(fork, self.frame.gas.remaining());
        self.frame.gas.consume(child_gas)?;

        if !self.can_spawn(value) {
            return self.skip_spawn(child_gas);
        }

        let message = Message {
            kind,
            sender: creator,
            recipient: address,
            code_address: address,
            input: Bytes::from_vec(init_code),
            value,
            gas_limit: child_gas,
            is_static: false,
            depth: self.frame.depth() + 1,
        };

        trace!(%instruction, %address, gas = child_gas, "spawning create");
        Ok(Flow::Create(Box::new(CreateRequest { message })))
    }

    // =========================================================================
    // SELFDESTRUCT
    // =========================================================================

    pub(crate) fn op_selfdestruct(&mut self) -> Result<Flow, VmError> {
        self.require_non_static()?;
        let fork = self.fork();
        let beneficiary = self.pop_address()?;
        let address = self.frame.address();

        if fork.has_access_lists() && self.ledger.access_account(beneficiary).is_cold() {
            self.frame.gas.consume(costs::COLD_ACCOUNT_ACCESS)?;
        }

        let balance = self.ledger.balance(address);
        let new_account = if fork >= Fork::SpuriousDragon {
            self.ledger.is_dead(beneficiary) && !balance.is_zero()
        } else if fork >= Fork::TangerineWhistle {
            !self.ledger.account_exists(beneficiary)
        } else {
            false
        };
        if new_account {
            self.frame.gas.consume(costs::NEW_ACCOUNT)?;
        }

        if fork < Fork::London && !self.is_registered_self_destruct() {
            self.frame.gas.add_refund(costs::SELFDESTRUCT_REFUND);
        }
        self.frame.register_self_destruct(address);

        if beneficiary != address {
            self.ledger.add_balance(beneficiary, balance)?;
        }
        // Burned when the beneficiary is the contract itself
        self.ledger.set_balance(address, U256::zero());

        trace!(%address, %beneficiary, %balance, "selfdestruct");
        Ok(Flow::Halt)
    }
}

// =============================================================================
// TESTS
// =============================================================================
