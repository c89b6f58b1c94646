//! Error types for hull computation.

use thiserror::Error;

pub type HullResult<T> = Result<T, HullError>;

#[derive(Error, Debug)]
pub enum HullError {
    #[error("Hull input is empty")]
    EmptyInput,

    #[error("Point dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}
