use thiserror::Error;

use crate::domain::customer::CustomerId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("stored customer data is unreadable: {0}")]
    Read(String),
    #[error("customer `{0}` was not found")]
    NotFound(CustomerId),
    #[error("invalid customer data: {0}")]
    Validation(String),
    #[error("store operation failed: {0}")]
    Operation(String),
}

impl StoreError {
    /// Stable label for the error class, used in API bodies and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Read(_) => "read",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Operation(_) => "operation",
        }
    }
}
