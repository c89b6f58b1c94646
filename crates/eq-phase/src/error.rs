//! Error types for phase-model operations.

use eq_expr::ExprError;
use thiserror::Error;

pub type PhaseResult<T> = Result<T, PhaseError>;

#[derive(Error, Debug)]
pub enum PhaseError {
    #[error("Expression error: {0}")]
    Expr(#[from] ExprError),

    #[error("Constraint basis failure: {what}")]
    ConstraintBasis { what: String },

    #[error("Unknown variable: {name}")]
    UnknownVariable { name: String },

    #[error("Invalid sublattice model: {what}")]
    InvalidSublattice { what: String },
}
