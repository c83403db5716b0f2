//! # qc-evm Benchmarks
//!
//! Benchmark bodies shared by `benches/evm_benchmarks.rs`.

pub mod qc_evm;
