//! # qc-evm Test Suite
//!
//! End-to-end execution scenarios and benchmarks for the bytecode engine.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── benchmarks/       # Criterion benchmark bodies
//! │   └── qc_evm.rs
//! │
//! └── integration/      # Whole call trees over both ledgers
//!     ├── fixtures.rs
//!     ├── execution_flows.rs
//!     ├── call_depth.rs
//!     ├── fork_rules.rs
//!     └── tracer_hooks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p qc-tests
//!
//! # By category
//! cargo test -p qc-tests integration::fork_rules
//!
//! # Benchmarks
//! cargo bench -p qc-tests
//! ```

#![allow(unused_variables)]
#![allow(unused_imports)]
#![allow(dead_code)]

pub mod benchmarks;
pub mod integration;
