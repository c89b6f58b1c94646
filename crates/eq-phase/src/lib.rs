//! eq-phase: phase data model and per-phase Gibbs energy machinery.
//!
//! Provides:
//! - Sublattice/species data model with validated site fractions
//! - Parameter storage with species-pattern matching
//! - The four Gibbs energy models (reference, ideal mixing, Redlich-Kister
//!   excess, Inden-Hillert-Jarl magnetic), each producing a symbolic AST
//! - `CompositionSet`: a phase's model ASTs, their first and second
//!   derivative ASTs, sublattice-balance constraints, and the orthonormal
//!   null-space basis of those constraints
//! - Site-fraction to mole-fraction conversion
//!
//! Composition sets are constructed once per equilibrium calculation, or
//! cloned with variable renaming when a miscibility gap forces a second copy
//! of the same phase.

pub mod composition_set;
pub mod constraints;
pub mod convert;
pub mod error;
pub mod models;
pub mod parameters;
pub mod sublattice;

pub use composition_set::CompositionSet;
pub use constraints::{constraint_null_space, Constraint, ConstraintBasis};
pub use convert::site_fractions_to_mole_fractions;
pub use error::{PhaseError, PhaseResult};
pub use models::{
    EnergyModel, IdealMixing, IhjMagnetic, ModelKind, PureCompoundEnergy, RedlichKisterExcess,
};
pub use parameters::{Parameter, ParameterKind, ParameterSet};
pub use sublattice::{Phase, Species, SublatticeEntry, SublatticeSet};
