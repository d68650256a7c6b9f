pub mod assignment;
pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;

pub use assignment::RoleAssigner;
pub use audit::{AuditAction, RequestLogEntry, RequestLogId};
pub use domain::destination::{
    DestinationDraft, DestinationId, ItineraryError, RequestDestination, RequestDestinationId,
};
pub use domain::request::{Priority, Request, RequestId, RequestStatus};
pub use domain::reservation::{Reservation, ReservationDraft, ReservationId, ReservationPatch};
pub use domain::revision::{Revision, RevisionId};
pub use domain::user::{
    Actor, Contact, DepartmentId, DirectoryUser, Role, TravelAgencyId, UserId,
};
pub use domain::voucher::{Voucher, VoucherDraft, VoucherId, VoucherPatch, VoucherStatus};
pub use errors::DomainError;
pub use notify::{Notification, Notifier, NotifyError};
