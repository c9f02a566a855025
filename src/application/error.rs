use thiserror::Error;

use crate::domain::{ErrorKind, LedgerError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    /// The ledger-level kind, if this error came from a ledger rule or bad input.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            AppError::Ledger(err) => Some(err.kind()),
            AppError::InvalidInput(_) => Some(ErrorKind::InvalidInput),
            AppError::Storage(_) => None,
        }
    }
}
