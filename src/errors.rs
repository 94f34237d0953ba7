use thiserror::Error;

/// Error type that captures household storage, configuration, and validation failures.
#[derive(Debug, Error)]
pub enum HouseholdError {
    #[error("Persistence error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    #[error("Member not found: {0}")]
    MemberNotFound(String),
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub type Result<T> = std::result::Result<T, HouseholdError>;

impl From<std::io::Error> for HouseholdError {
    fn from(err: std::io::Error) -> Self {
        HouseholdError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for HouseholdError {
    fn from(err: serde_json::Error) -> Self {
        HouseholdError::Storage(err.to_string())
    }
}
