pub mod destination;
pub mod request;
pub mod reservation;
pub mod revision;
pub mod user;
pub mod voucher;
