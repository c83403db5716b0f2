//! # QC-EVM Benchmarks
//!
//! | Group | Measures |
//! |-------|----------|
//! | `qc-evm/interpreter_loop` | Opcode dispatch in a JUMPI loop |
//! | `qc-evm/keccak256` | KECCAK256 with memory expansion |
//! | `qc-evm/call_chain` | Frame driver under deep recursion |
//! | `qc-evm/precompiles` | ecrecover through a root message |

use criterion::{criterion_group, criterion_main};
use qc_tests::benchmarks::qc_evm;

criterion_group!(
    benches,
    qc_evm::interpreter_loop,
    qc_evm::keccak_memory,
    qc_evm::call_chain,
    qc_evm::ecrecover_precompile,
);

criterion_main!(benches);
