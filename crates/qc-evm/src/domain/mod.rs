//! # Domain Layer (Inner Hexagon)
//!
//! Pure types and functions for bytecode execution.
//! NO I/O, NO world-state access.

pub mod entities;
pub mod fork;
pub mod invariants;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use fork::*;
pub use invariants::*;
pub use services::*;
pub use value_objects::*;
