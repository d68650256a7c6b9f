use thiserror::Error;

use crate::domain::destination::ItineraryError;
use crate::domain::request::RequestStatus;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid request transition from '{from}' to '{to}'")]
    InvalidTransition { from: RequestStatus, to: RequestStatus },
    #[error(transparent)]
    Itinerary(#[from] ItineraryError),
}

#[cfg(test)]
mod tests {
    use super::DomainError;
    use crate::domain::request::RequestStatus;

    #[test]
    fn transition_error_names_both_statuses() {
        let error = DomainError::InvalidTransition {
            from: RequestStatus::Denied,
            to: RequestStatus::PendingReview,
        };
        assert_eq!(
            error.to_string(),
            "invalid request transition from 'Denied' to 'Pending Review'"
        );
    }
}
