//! Error types for the global minimizer.

use eq_core::EqError;
use eq_expr::ExprError;
use eq_hull::HullError;
use eq_phase::PhaseError;
use thiserror::Error;

pub type MinimizeResult<T> = Result<T, MinimizeError>;

#[derive(Error, Debug)]
pub enum MinimizeError {
    #[error("Conditions error: {0}")]
    Conditions(#[from] EqError),

    #[error("Phase error: {0}")]
    Phase(#[from] PhaseError),

    #[error("Hull error: {0}")]
    Hull(#[from] HullError),

    #[error("Expression error: {0}")]
    Expr(#[from] ExprError),

    #[error("No active phases under the given conditions")]
    NoActivePhases,

    #[error("Unknown phase in hull map: {name}")]
    UnknownPhase { name: String },

    #[error("Hull map has no point with id {id}")]
    InvalidPointId { id: usize },

    #[error("Conditions are missing the mole fraction of element {element}")]
    MissingComposition { element: String },
}
