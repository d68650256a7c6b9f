use std::sync::Arc;

use tripdesk_core::domain::destination::RequestDestinationId;
use tripdesk_core::domain::request::RequestStatus;
use tripdesk_core::domain::reservation::{
    Reservation, ReservationDraft, ReservationId, ReservationPatch,
};
use tripdesk_core::domain::user::Actor;
use tripdesk_db::repositories::{
    DestinationParent, RequestRepository, ReservationRepository,
};

use crate::error::EngineError;

/// Booking records attached to itinerary legs. Only the assigned agency works
/// on them, and only while the parent request is `Pending Reservations`.
pub struct ReservationService {
    reservations: Arc<dyn ReservationRepository>,
    requests: Arc<dyn RequestRepository>,
}

impl ReservationService {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        requests: Arc<dyn RequestRepository>,
    ) -> Self {
        Self { reservations, requests }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        draft: ReservationDraft,
    ) -> Result<Reservation, EngineError> {
        let parent = self.parent_of_leg(&draft.request_destination_id).await?;
        check_agency_window(actor, &parent)?;

        let reservation = draft.materialize();
        self.reservations.insert(&reservation).await?;
        Ok(reservation)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: &ReservationId,
        patch: ReservationPatch,
    ) -> Result<Reservation, EngineError> {
        let mut reservation = self.load(id).await?;
        let parent = self.parent_of_leg(&reservation.request_destination_id).await?;
        check_agency_window(actor, &parent)?;

        reservation.apply(patch);
        self.reservations.save(&reservation).await?;
        Ok(reservation)
    }

    pub async fn delete(&self, actor: &Actor, id: &ReservationId) -> Result<(), EngineError> {
        let reservation = self.load(id).await?;
        let parent = self.parent_of_leg(&reservation.request_destination_id).await?;
        check_agency_window(actor, &parent)?;

        if !self.reservations.delete(id).await? {
            return Err(EngineError::NotFound("reservation"));
        }
        Ok(())
    }

    pub async fn get(&self, actor: &Actor, id: &ReservationId) -> Result<Reservation, EngineError> {
        let reservation = self.load(id).await?;
        let parent = self.parent_of_leg(&reservation.request_destination_id).await?;
        check_agency_membership(actor, &parent)?;
        Ok(reservation)
    }

    async fn load(&self, id: &ReservationId) -> Result<Reservation, EngineError> {
        self.reservations.find_by_id(id).await?.ok_or(EngineError::NotFound("reservation"))
    }

    async fn parent_of_leg(
        &self,
        id: &RequestDestinationId,
    ) -> Result<DestinationParent, EngineError> {
        self.requests
            .find_destination_parent(id)
            .await?
            .ok_or(EngineError::NotFound("itinerary destination"))
    }
}

fn check_agency_membership(actor: &Actor, parent: &DestinationParent) -> Result<(), EngineError> {
    let assigned = parent
        .travel_agency_id
        .as_ref()
        .ok_or(EngineError::Unauthorized("request has no assigned agency"))?;
    match &actor.travel_agency_id {
        Some(agency) if agency == assigned => Ok(()),
        _ => Err(EngineError::Unauthorized("only the assigned agency may do this")),
    }
}

fn check_agency_window(actor: &Actor, parent: &DestinationParent) -> Result<(), EngineError> {
    check_agency_membership(actor, parent)?;
    if parent.status != RequestStatus::PendingReservations {
        return Err(EngineError::Conflict(format!(
            "request is '{}', reservations can only change while it is 'Pending Reservations'",
            parent.status
        )));
    }
    Ok(())
}
