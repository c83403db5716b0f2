//! # Tracer Hooks
//!
//! Order and pairing of the tracer callbacks over a nested call tree.

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use qc_evm::evm::opcodes::*;
    use qc_evm::prelude::*;

    #[derive(Debug, PartialEq, Eq)]
    enum FrameEvent {
        Prepare(usize),
        Start(Address, bool),
        End(bool),
    }

    #[derive(Default)]
    struct Recorder {
        frames: Vec<FrameEvent>,
        open: Vec<usize>,
        next_index: usize,
        starts: usize,
        ends: usize,
        gas_costs: usize,
        faults: Vec<(Instruction, VmError)>,
        max_depth: usize,
    }

    impl Tracer for Recorder {
        fn on_frame_prepare(&mut self, depth: usize) {
            self.frames.push(FrameEvent::Prepare(depth));
        }

        fn on_frame_start(
            &mut self,
            _sender: Address,
            recipient: Address,
            is_create: bool,
            _input: &[u8],
            _gas_limit: u64,
            _value: U256,
        ) {
            self.frames.push(FrameEvent::Start(recipient, is_create));
        }

        fn on_opcode_start(&mut self, _pc: usize, _opcode: Instruction, _gas: u64, depth: usize) -> usize {
            self.next_index += 1;
            self.starts += 1;
            self.max_depth = self.max_depth.max(depth);
            self.open.push(self.next_index);
            self.next_index
        }

        fn on_gas_cost(&mut self, _opcode: Instruction, _cost: u64, _gas_remaining: u64, _depth: usize) {
            self.gas_costs += 1;
        }

        fn on_opcode_end(
            &mut self,
            _pc: usize,
            _opcode: Instruction,
            _gas: u64,
            _refund: u64,
            _return_data: &Bytes,
            _depth: usize,
            index: usize,
        ) {
            assert_eq!(self.open.pop(), Some(index));
            self.ends += 1;
        }

        fn on_fault(
            &mut self,
            _pc: usize,
            opcode: Instruction,
            _gas: u64,
            _refund: u64,
            _return_data: &Bytes,
            _depth: usize,
            error: &VmError,
        ) {
            assert!(self.open.pop().is_some());
            self.faults.push((opcode, error.clone()));
        }

        fn on_frame_end(&mut self, _output: &Bytes, _gas_used: u64, error: Option<&VmError>) {
            self.frames.push(FrameEvent::End(error.is_none()));
        }
    }

    fn trace(callee_code: Bytes) -> (Recorder, ExecutionResult) {
        init_tracing();
        let code = Program::new()
            .call(CALL, 50_000, callee(), 0)
            .op(&[STOP])
            .build();
        let mut ledger = journaled(&[(contract(), code), (callee(), callee_code)]);
        let mut recorder = Recorder::default();

        let result = Evm::new(
            &mut ledger,
            StandardPrecompiles::new(),
            &mut recorder,
            Environment::default(),
            VmConfig::for_fork(Fork::Shanghai),
        )
        .execute(call(contract(), 200_000));

        (recorder, result)
    }

    #[test]
    fn test_frame_events_around_reverting_callee() {
        let (recorder, result) = trace(Program::new().push(0).push(0).op(&[REVERT]).build());

        assert!(result.is_success());
        assert_eq!(
            recorder.frames,
            vec![
                FrameEvent::Prepare(0),
                FrameEvent::Start(contract(), false),
                FrameEvent::Prepare(1),
                FrameEvent::Start(callee(), false),
                FrameEvent::End(false),
                FrameEvent::End(true),
            ]
        );
    }

    #[test]
    fn test_revert_is_not_a_fault() {
        let (recorder, _) = trace(Program::new().push(0).push(0).op(&[REVERT]).build());

        // 7 pushes, CALL and STOP in the caller; 2 pushes and REVERT in the callee
        assert_eq!(recorder.starts, 12);
        assert_eq!(recorder.ends, 12);
        assert_eq!(recorder.gas_costs, 12);
        assert!(recorder.faults.is_empty());
        assert!(recorder.open.is_empty());
        assert_eq!(recorder.max_depth, 1);
    }

    #[test]
    fn test_invalid_opcode_reports_fault() {
        let (recorder, result) = trace(Program::new().push(1).op(&[INVALID]).build());

        assert!(result.is_success());
        assert_eq!(
            recorder.faults,
            vec![(Instruction::Invalid, VmError::InvalidInstruction(INVALID))]
        );
        assert_eq!(recorder.starts, recorder.ends + recorder.faults.len());
        assert_eq!(recorder.gas_costs, recorder.starts);
        assert!(recorder.open.is_empty());
        assert_eq!(recorder.frames.last(), Some(&FrameEvent::End(true)));
    }

    #[test]
    fn test_undefined_opcode_reports_fault() {
        let (recorder, result) = trace(Program::new().push(1).op(&[0x0C]).build());

        assert!(result.is_success());
        assert_eq!(
            recorder.faults,
            vec![(Instruction::Invalid, VmError::InvalidInstruction(0x0C))]
        );
        assert_eq!(recorder.starts, recorder.ends + recorder.faults.len());
        assert_eq!(recorder.gas_costs, recorder.starts);
        assert!(recorder.open.is_empty());
    }

    #[test]
    fn test_opcode_before_its_fork_reports_fault() {
        let code = Program::new().push(0).push(0).op(&[REVERT]).build();
        let mut ledger = journaled(&[(contract(), code)]);
        let mut recorder = Recorder::default();

        let result = Evm::new(
            &mut ledger,
            NoPrecompiles,
            &mut recorder,
            Environment::default(),
            VmConfig::for_fork(Fork::SpuriousDragon),
        )
        .execute(call(contract(), 100_000));

        assert_eq!(result.error, Some(VmError::InvalidInstruction(REVERT)));
        assert_eq!(
            recorder.faults,
            vec![(Instruction::Invalid, VmError::InvalidInstruction(REVERT))]
        );
        assert_eq!(recorder.starts, 3);
        assert_eq!(recorder.ends, 2);
        assert!(recorder.open.is_empty());
    }

    #[test]
    fn test_static_violation_reports_fault() {
        let code = Program::new().push(1).push(0).op(&[SSTORE]).build();
        let mut ledger = journaled(&[(contract(), code)]);
        let mut recorder = Recorder::default();

        let result = Evm::new(
            &mut ledger,
            NoPrecompiles,
            &mut recorder,
            Environment::default(),
            VmConfig::for_fork(Fork::Shanghai),
        )
        .execute(call(contract(), 100_000).into_static());

        assert_eq!(result.status, ExecutionStatus::Error);
        assert_eq!(
            recorder.faults,
            vec![(Instruction::SStore, VmError::StaticStateChangeViolation)]
        );
        assert_eq!(recorder.frames.last(), Some(&FrameEvent::End(false)));
    }
}
