//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions for bytecode execution.
//! These are the interfaces between the engine and the outside world.
//!
//! - **Driving Port (Inbound)**: `MessageExecutor`
//! - **Driven Ports (Outbound)**: `Ledger`, `StateProvider`, `Tracer`
//! - No concrete implementations in this module except `NoopTracer`

pub mod inbound;
pub mod outbound;
pub mod tracer;

pub use inbound::*;
pub use outbound::*;
pub use tracer::*;
