use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::destination::RequestDestinationId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub String);

impl ReservationId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

/// A booking made by the travel agency for one itinerary leg. Only creatable
/// while the parent request sits in `Pending Reservations`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub request_destination_id: RequestDestinationId,
    pub title: String,
    pub comments: String,
    pub price: Decimal,
    pub document_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReservationDraft {
    pub request_destination_id: RequestDestinationId,
    pub title: String,
    pub comments: String,
    pub price: Decimal,
    pub document_url: Option<String>,
}

impl ReservationDraft {
    pub fn materialize(self) -> Reservation {
        Reservation {
            id: ReservationId::generate(),
            request_destination_id: self.request_destination_id,
            title: self.title,
            comments: self.comments,
            price: self.price,
            document_url: self.document_url,
        }
    }
}

/// Partial update: absent fields keep their current values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservationPatch {
    pub title: Option<String>,
    pub comments: Option<String>,
    pub price: Option<Decimal>,
    pub document_url: Option<String>,
}

impl Reservation {
    pub fn apply(&mut self, patch: ReservationPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(comments) = patch.comments {
            self.comments = comments;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(document_url) = patch.document_url {
            self.document_url = Some(document_url);
        }
    }
}
