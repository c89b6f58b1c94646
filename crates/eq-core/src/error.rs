//! Errors in the problem statement itself.
//!
//! These are caught by [`crate::EvalConditions::validate`] before any phase
//! is sampled: a calculation posed without components, without a
//! temperature, or with mole fractions that do not balance can only fail
//! later and more obscurely.

use thiserror::Error;

pub type EqResult<T> = Result<T, EqError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EqError {
    #[error("No components listed in the conditions")]
    NoElements,

    #[error("State variable '{name}' is required but not set")]
    MissingStateVariable { name: char },

    #[error("Non-finite value for state variable '{name}': {value}")]
    NonFiniteStateVariable { name: char, value: f64 },

    #[error("No overall mole fraction given for component {element}")]
    MissingComposition { element: String },

    #[error("Overall mole fractions sum to {sum}, not 1")]
    UnbalancedComposition { sum: f64 },
}
