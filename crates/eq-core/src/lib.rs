//! eq-core: stable foundation for equilib.
//!
//! Contains:
//! - conditions (thermodynamic state variables, phase statuses, and
//!   problem-statement validation)
//! - numeric (point-equality and distance predicates shared by the hull
//!   and tie-point stages)
//! - error (problem-statement error types)

pub mod conditions;
pub mod error;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use conditions::{EvalConditions, PhaseStatus, GAS_CONSTANT};
pub use error::{EqError, EqResult};
pub use numeric::*;
