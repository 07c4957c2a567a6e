//! Error types in linfa-aln
//!

use thiserror::Error;

use crate::model::Monotonicity;

pub type Result<T> = std::result::Result<T, AlnError>;

#[derive(Error, Debug)]
pub enum AlnError {
    #[error("invalid argument {0}")]
    InvalidArgument(String),
    #[error("invalid parameter {0}")]
    Parameters(String),
    #[error("out of memory while allocating {0}")]
    OutOfMemory(&'static str),
    #[error("malformed model: {0}")]
    MalformedModel(String),
    #[error("variable {var} must be strictly decreasing over the whole network, but is {found:?}")]
    NotMonotonic { var: usize, found: Monotonicity },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "serde")]
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<std::collections::TryReserveError> for AlnError {
    fn from(_: std::collections::TryReserveError) -> Self {
        AlnError::OutOfMemory("buffer")
    }
}
