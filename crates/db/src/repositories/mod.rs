use async_trait::async_trait;
use thiserror::Error;

use tripdesk_core::audit::RequestLogEntry;
use tripdesk_core::domain::destination::{DestinationId, RequestDestinationId};
use tripdesk_core::domain::request::{Request, RequestId, RequestStatus};
use tripdesk_core::domain::reservation::{Reservation, ReservationId};
use tripdesk_core::domain::revision::Revision;
use tripdesk_core::domain::user::{Contact, DepartmentId, TravelAgencyId, UserId};
use tripdesk_core::domain::voucher::{Voucher, VoucherId, VoucherStatus};

pub mod directory;
pub mod memory;
pub mod request;
pub mod reservation;
pub mod revision;
pub mod voucher;

pub use directory::SqlDirectory;
pub use memory::InMemoryBackend;
pub use request::SqlRequestRepository;
pub use reservation::SqlReservationRepository;
pub use revision::SqlRevisionRepository;
pub use voucher::SqlVoucherRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Parent-request facts needed to authorize work on one itinerary leg.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DestinationParent {
    pub request_id: RequestId,
    pub status: RequestStatus,
    pub travel_agency_id: Option<TravelAgencyId>,
}

/// Persistence for the request aggregate and its audit trail.
///
/// Every mutating method takes the audit row alongside the mutation and
/// commits both in one transaction; a failure of either rolls back both.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn find_by_id(&self, id: &RequestId) -> Result<Option<Request>, RepositoryError>;

    async fn insert_with_log(
        &self,
        request: &Request,
        log: &RequestLogEntry,
    ) -> Result<(), RepositoryError>;

    /// Overwrites the editable fields and replaces the destination set
    /// (delete + reinsert) in the same transaction as the audit row.
    async fn replace_with_log(
        &self,
        request: &Request,
        log: &RequestLogEntry,
    ) -> Result<(), RepositoryError>;

    async fn set_status_with_log(
        &self,
        id: &RequestId,
        new_status: RequestStatus,
        travel_agency_id: Option<&TravelAgencyId>,
        log: &RequestLogEntry,
    ) -> Result<(), RepositoryError>;

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Request>, RepositoryError>;

    /// Queue view for the department approver: `Pending Review` only,
    /// priority-ordered with high first.
    async fn list_pending_review_for_admin(
        &self,
        admin: &UserId,
    ) -> Result<Vec<Request>, RepositoryError>;

    async fn list_by_soi(&self, soi: &UserId) -> Result<Vec<Request>, RepositoryError>;

    async fn list_pending_refund_for_soi(
        &self,
        soi: &UserId,
    ) -> Result<Vec<Request>, RepositoryError>;

    async fn list_pending_reservations_for_agency(
        &self,
        agency: &TravelAgencyId,
    ) -> Result<Vec<Request>, RepositoryError>;

    async fn logs_for_request(
        &self,
        id: &RequestId,
    ) -> Result<Vec<RequestLogEntry>, RepositoryError>;

    async fn find_destination_parent(
        &self,
        id: &RequestDestinationId,
    ) -> Result<Option<DestinationParent>, RepositoryError>;
}

#[async_trait]
pub trait VoucherRepository: Send + Sync {
    async fn find_by_id(&self, id: &VoucherId) -> Result<Option<Voucher>, RepositoryError>;
    async fn insert(&self, voucher: &Voucher) -> Result<(), RepositoryError>;
    async fn save(&self, voucher: &Voucher) -> Result<(), RepositoryError>;
    /// Returns false when no voucher with the id exists.
    async fn delete(&self, id: &VoucherId) -> Result<bool, RepositoryError>;
    async fn set_status(
        &self,
        id: &VoucherId,
        status: VoucherStatus,
    ) -> Result<bool, RepositoryError>;
    async fn list_by_request(&self, request: &RequestId)
        -> Result<Vec<Voucher>, RepositoryError>;
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn find_by_id(&self, id: &ReservationId)
        -> Result<Option<Reservation>, RepositoryError>;
    async fn insert(&self, reservation: &Reservation) -> Result<(), RepositoryError>;
    async fn save(&self, reservation: &Reservation) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &ReservationId) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait RevisionRepository: Send + Sync {
    /// Persists the revision, moves the parent request to the log's resulting
    /// status, and appends the audit row, all in one transaction.
    async fn insert_with_status_change(
        &self,
        revision: &Revision,
        log: &RequestLogEntry,
    ) -> Result<(), RepositoryError>;

    async fn list_by_request(&self, request: &RequestId)
        -> Result<Vec<Revision>, RepositoryError>;
}

/// Lookup of known travel locations.
#[async_trait]
pub trait DestinationDirectory: Send + Sync {
    async fn is_valid(&self, id: &DestinationId) -> Result<bool, RepositoryError>;
    async fn city_name(&self, id: &DestinationId) -> Result<Option<String>, RepositoryError>;
}

/// Identity lookups and the eligible pools used for role assignment.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn user_by_id(&self, id: &UserId) -> Result<Option<Contact>, RepositoryError>;

    /// Approver-role users in the department, excluding the requester.
    async fn approvers_in_department(
        &self,
        department: &DepartmentId,
        exclude: &UserId,
    ) -> Result<Vec<UserId>, RepositoryError>;

    async fn accounting_officers(&self) -> Result<Vec<UserId>, RepositoryError>;
}

#[async_trait]
pub trait TravelAgencyDirectory: Send + Sync {
    async fn exists(&self, id: &TravelAgencyId) -> Result<bool, RepositoryError>;
    async fn members(&self, id: &TravelAgencyId) -> Result<Vec<Contact>, RepositoryError>;
}
