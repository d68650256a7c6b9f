use thiserror::Error;

use tripdesk_core::errors::DomainError;
use tripdesk_db::repositories::RepositoryError;

/// Failure classes for lifecycle operations. Precondition failures abort
/// before any mutation; repository errors after the precondition checks mean
/// the whole transaction rolled back.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("not allowed: {0}")]
    Unauthorized(&'static str),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("invalid input: {0}")]
    BadInput(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

// One representation per class: a rejected status transition is a Conflict,
// a malformed itinerary is BadInput.
impl From<DomainError> for EngineError {
    fn from(error: DomainError) -> Self {
        match &error {
            DomainError::InvalidTransition { .. } => Self::Conflict(error.to_string()),
            DomainError::Itinerary(_) => Self::BadInput(error.to_string()),
        }
    }
}
