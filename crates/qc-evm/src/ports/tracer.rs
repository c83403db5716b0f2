//! # Tracer Port
//!
//! Observation hooks called by the engine. Every method has an empty default
//! body, so a tracer only implements what it records. Hooks get shared
//! references or copies and cannot influence execution.

use crate::domain::value_objects::{Address, Bytes, U256};
use crate::errors::VmError;
use crate::evm::opcodes::Instruction;

/// Execution observer.
#[allow(unused_variables)]
pub trait Tracer {
    /// A frame is about to be prepared (snapshot, transfer, nonce bump).
    fn on_frame_prepare(&mut self, depth: usize) {}

    /// A frame starts running.
    fn on_frame_start(
        &mut self,
        sender: Address,
        recipient: Address,
        is_create: bool,
        input: &[u8],
        gas_limit: u64,
        value: U256,
    ) {
    }

    /// An opcode is about to run. The returned index is handed back to
    /// [`Tracer::on_opcode_end`]. Bytes undefined on the active fork are
    /// reported as [`Instruction::Invalid`].
    fn on_opcode_start(&mut self, pc: usize, opcode: Instruction, gas: u64, depth: usize) -> usize {
        0
    }

    /// Static gas charged for the opcode about to run.
    fn on_gas_cost(&mut self, opcode: Instruction, cost: u64, gas_remaining: u64, depth: usize) {}

    /// An opcode finished without error. REVERT ends here too.
    #[allow(clippy::too_many_arguments)]
    fn on_opcode_end(
        &mut self,
        pc: usize,
        opcode: Instruction,
        gas: u64,
        refund: u64,
        return_data: &Bytes,
        depth: usize,
        index: usize,
    ) {
    }

    /// An opcode failed with anything but a revert; the frame is about to end.
    #[allow(clippy::too_many_arguments)]
    fn on_fault(
        &mut self,
        pc: usize,
        opcode: Instruction,
        gas: u64,
        refund: u64,
        return_data: &Bytes,
        depth: usize,
        error: &VmError,
    ) {
    }

    /// A frame finished.
    fn on_frame_end(&mut self, output: &Bytes, gas_used: u64, error: Option<&VmError>) {}
}

/// Tracer that records nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

impl<T: Tracer + ?Sized> Tracer for &mut T {
    fn on_frame_prepare(&mut self, depth: usize) {
        (**self).on_frame_prepare(depth);
    }

    fn on_frame_start(
        &mut self,
        sender: Address,
        recipient: Address,
        is_create: bool,
        input: &[u8],
        gas_limit: u64,
        value: U256,
    ) {
        (**self).on_frame_start(sender, recipient, is_create, input, gas_limit, value);
    }

    fn on_opcode_start(&mut self, pc: usize, opcode: Instruction, gas: u64, depth: usize) -> usize {
        (**self).on_opcode_start(pc, opcode, gas, depth)
    }

    fn on_gas_cost(&mut self, opcode: Instruction, cost: u64, gas_remaining: u64, depth: usize) {
        (**self).on_gas_cost(opcode, cost, gas_remaining, depth);
    }

    fn on_opcode_end(
        &mut self,
        pc: usize,
        opcode: Instruction,
        gas: u64,
        refund: u64,
        return_data: &Bytes,
        depth: usize,
        index: usize,
    ) {
        (**self).on_opcode_end(pc, opcode, gas, refund, return_data, depth, index);
    }

    fn on_fault(
        &mut self,
        pc: usize,
        opcode: Instruction,
        gas: u64,
        refund: u64,
        return_data: &Bytes,
        depth: usize,
        error: &VmError,
    ) {
        (**self).on_fault(pc, opcode, gas, refund, return_data, depth, error);
    }

    fn on_frame_end(&mut self, output: &Bytes, gas_used: u64, error: Option<&VmError>) {
        (**self).on_frame_end(output, gas_used, error);
    }
}
