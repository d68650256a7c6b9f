pub mod error;
pub mod requests;
pub mod reservations;
pub mod revisions;
pub mod status;
pub mod vouchers;

pub use error::EngineError;
pub use requests::{NewRequest, RequestEdit, RequestLifecycle};
pub use reservations::ReservationService;
pub use revisions::RevisionService;
pub use vouchers::VoucherService;

#[cfg(test)]
mod harness;
