use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::request::RequestId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DestinationId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestDestinationId(pub String);

impl RequestDestinationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// One leg of a request's itinerary. Owned by the parent request and replaced
/// wholesale on edit: rows never survive an update, ids are always fresh.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDestination {
    pub id: RequestDestinationId,
    pub request_id: RequestId,
    pub destination_id: DestinationId,
    pub order_index: u32,
    pub stay_days: u32,
    pub arrival: DateTime<Utc>,
    pub departure: DateTime<Utc>,
    pub hotel_required: bool,
    pub plane_required: bool,
    pub is_last: bool,
    pub details: Option<String>,
}

/// Caller-supplied itinerary leg, before ids are minted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationDraft {
    pub destination_id: DestinationId,
    pub order_index: u32,
    pub stay_days: u32,
    pub arrival: DateTime<Utc>,
    pub departure: DateTime<Utc>,
    pub hotel_required: bool,
    pub plane_required: bool,
    pub is_last: bool,
    pub details: Option<String>,
}

impl DestinationDraft {
    pub fn materialize(&self, request_id: &RequestId) -> RequestDestination {
        RequestDestination {
            id: RequestDestinationId::generate(),
            request_id: request_id.clone(),
            destination_id: self.destination_id.clone(),
            order_index: self.order_index,
            stay_days: self.stay_days,
            arrival: self.arrival,
            departure: self.departure,
            hotel_required: self.hotel_required,
            plane_required: self.plane_required,
            is_last: self.is_last,
            details: self.details.clone(),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ItineraryError {
    #[error("itinerary must contain at least one destination")]
    Empty,
    #[error("order index must be a positive integer")]
    NonPositiveOrder,
    #[error("order index {0} appears more than once")]
    DuplicateOrder(u32),
    #[error("exactly one destination must be marked as last, found {0}")]
    LastDestinationCount(usize),
    #[error("destination at order {0} departs before it arrives")]
    DepartureBeforeArrival(u32),
}

/// Structural checks every submitted itinerary must pass, on create and edit
/// alike. Referential validity of the destination ids is checked separately
/// against the destination directory.
pub fn validate_itinerary(legs: &[DestinationDraft]) -> Result<(), ItineraryError> {
    if legs.is_empty() {
        return Err(ItineraryError::Empty);
    }

    let mut seen = HashSet::new();
    let mut last_count = 0usize;
    for leg in legs {
        if leg.order_index == 0 {
            return Err(ItineraryError::NonPositiveOrder);
        }
        if !seen.insert(leg.order_index) {
            return Err(ItineraryError::DuplicateOrder(leg.order_index));
        }
        if leg.departure < leg.arrival {
            return Err(ItineraryError::DepartureBeforeArrival(leg.order_index));
        }
        if leg.is_last {
            last_count += 1;
        }
    }

    if last_count != 1 {
        return Err(ItineraryError::LastDestinationCount(last_count));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{validate_itinerary, DestinationDraft, DestinationId, ItineraryError};
    use crate::domain::request::RequestId;

    fn leg(order: u32, is_last: bool) -> DestinationDraft {
        let arrival = Utc::now();
        DestinationDraft {
            destination_id: DestinationId(format!("dest-{order}")),
            order_index: order,
            stay_days: 2,
            arrival,
            departure: arrival + Duration::days(2),
            hotel_required: true,
            plane_required: true,
            is_last,
            details: None,
        }
    }

    #[test]
    fn accepts_well_formed_itinerary() {
        assert_eq!(validate_itinerary(&[leg(1, false), leg(2, true)]), Ok(()));
    }

    #[test]
    fn rejects_empty_itinerary() {
        assert_eq!(validate_itinerary(&[]), Err(ItineraryError::Empty));
    }

    #[test]
    fn rejects_duplicate_order_index() {
        assert_eq!(
            validate_itinerary(&[leg(1, false), leg(1, true)]),
            Err(ItineraryError::DuplicateOrder(1))
        );
    }

    #[test]
    fn rejects_zero_order_index() {
        assert_eq!(
            validate_itinerary(&[leg(0, true)]),
            Err(ItineraryError::NonPositiveOrder)
        );
    }

    #[test]
    fn requires_exactly_one_last_destination() {
        assert_eq!(
            validate_itinerary(&[leg(1, true), leg(2, true)]),
            Err(ItineraryError::LastDestinationCount(2))
        );
        assert_eq!(
            validate_itinerary(&[leg(1, false), leg(2, false)]),
            Err(ItineraryError::LastDestinationCount(0))
        );
    }

    #[test]
    fn rejects_departure_before_arrival() {
        let mut bad = leg(1, true);
        bad.departure = bad.arrival - chrono::Duration::hours(1);
        assert_eq!(
            validate_itinerary(&[bad]),
            Err(ItineraryError::DepartureBeforeArrival(1))
        );
    }

    #[test]
    fn materialized_legs_get_fresh_ids() {
        let draft = leg(1, true);
        let request_id = RequestId("r-1".to_string());
        let a = draft.materialize(&request_id);
        let b = draft.materialize(&request_id);

        assert_ne!(a.id, b.id);
        assert_eq!(a.destination_id, draft.destination_id);
        assert_eq!(a.request_id, request_id);
    }
}
