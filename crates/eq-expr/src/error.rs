//! Error types for expression operations.

use thiserror::Error;

pub type ExprResult<T> = Result<T, ExprError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("Undefined reference: {name}")]
    UndefinedReference { name: String },

    #[error("Piecewise expression evaluated outside all bounds (T={value})")]
    OutOfRange { value: f64 },

    #[error("Cyclic symbol reference: {name}")]
    CyclicSymbol { name: String },

    #[error("Malformed expression: {what}")]
    Malformed { what: &'static str },
}
