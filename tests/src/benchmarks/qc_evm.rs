//! # QC-EVM Benchmarks
//!
//! Throughput of the interpreter loop and the frame driver:
//! - Tight JUMPI loop (dispatch and stack cost per opcode)
//! - KECCAK256 over growing memory
//! - Recursive CALL chains up to the depth limit
//! - ecrecover through the precompile path

use crate::integration::fixtures::{call, contract, execute, execute_with, journaled, Program};
use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use k256::ecdsa::SigningKey;
use qc_evm::evm::opcodes::*;
use qc_evm::prelude::*;
use std::time::Duration;

/// Counts `iterations` down to zero with a JUMPI loop.
fn countdown(iterations: u64) -> Bytes {
    let head = Program::new().push(iterations);
    let loop_start = head.clone().into_vec().len() as u64;
    head.op(&[JUMPDEST])
        .push(1)
        .op(&[SWAP1, SUB, DUP1])
        .push(loop_start)
        .op(&[JUMPI, STOP])
        .build()
}

pub fn interpreter_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-evm/interpreter_loop");
    group.measurement_time(Duration::from_secs(10));

    for iterations in [100u64, 1_000, 10_000] {
        let code = countdown(iterations);
        // Seven opcodes per iteration
        group.throughput(Throughput::Elements(iterations * 7));
        group.bench_with_input(BenchmarkId::new("countdown", iterations), &code, |b, code| {
            b.iter(|| {
                let mut ledger = journaled(&[(contract(), code.clone())]);
                let result = execute(Fork::Shanghai, &mut ledger, call(contract(), 10_000_000));
                black_box(result.gas_used)
            })
        });
    }

    group.finish();
}

pub fn keccak_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-evm/keccak256");

    for size in [32u64, 1_024, 32_768] {
        let code = Program::new()
            .push(size)
            .push(0)
            .op(&[KECCAK256])
            .return_top()
            .build();
        group.throughput(Throughput::Bytes(size));
        group.bench_with_input(BenchmarkId::new("hash_memory", size), &code, |b, code| {
            b.iter(|| {
                let mut ledger = journaled(&[(contract(), code.clone())]);
                black_box(execute(Fork::Shanghai, &mut ledger, call(contract(), 10_000_000)))
            })
        });
    }

    group.finish();
}

pub fn call_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-evm/call_chain");
    group.measurement_time(Duration::from_secs(10));

    // CALL self with all gas but 1024 until the depth limit stops it
    let code = Program::new()
        .push(32)
        .push(0)
        .push(0)
        .push(0)
        .push(0)
        .push_address(contract())
        .op(&[GAS, PUSH2, 0x04, 0x00, SWAP1, SUB, CALL, STOP])
        .build();

    for depth in [16usize, 128, 1024] {
        let config = VmConfig {
            max_call_depth: depth,
            ..VmConfig::for_fork(Fork::Frontier)
        };
        group.throughput(Throughput::Elements(depth as u64 + 1));
        group.bench_with_input(BenchmarkId::new("recursive_call", depth), &config, |b, config| {
            b.iter(|| {
                let mut ledger = journaled(&[(contract(), code.clone())]);
                let result = execute_with(config.clone(), &mut ledger, call(contract(), 10_000_000));
                black_box(result.gas_used)
            })
        });
    }

    group.finish();
}

pub fn ecrecover_precompile(c: &mut Criterion) {
    let mut group = c.benchmark_group("qc-evm/precompiles");

    let key = SigningKey::from_slice(&[0x42u8; 32]).unwrap();
    let hash = keccak256(b"benchmark message");
    let (signature, recovery_id) = key.sign_prehash_recoverable(hash.as_bytes()).unwrap();
    let mut input = [0u8; 128];
    input[..32].copy_from_slice(hash.as_bytes());
    input[63] = 27 + recovery_id.to_byte();
    input[64..].copy_from_slice(&signature.to_bytes());
    let input = Bytes::from_slice(&input);

    group.bench_function("ecrecover", |b| {
        b.iter(|| {
            let mut ledger = journaled(&[]);
            let message = Message::call(
                Address::from_low_u64(0xCA11),
                precompiles::ECRECOVER,
                U256::zero(),
                input.clone(),
                100_000,
            );
            black_box(execute(Fork::Shanghai, &mut ledger, message))
        })
    });

    group.finish();
}
