//! The unified error taxonomy consumed across the core.
//!
//! `tonic::Code`/`tonic::Status` already enumerate exactly the sixteen
//! kinds the taxonomy names (`Ok` included), so the core re-exports them
//! rather than inventing a parallel enum. A transport implementation maps
//! whatever wire-level error it sees onto one of these before the core
//! ever observes it.

pub use tonic::{Code, Status};

/// Invariant violations in user input never reach the transport.
pub(crate) fn invalid_argument(message: impl Into<String>) -> Status {
    Status::new(Code::InvalidArgument, message.into())
}

/// Used when a batch's response cardinality does not match the request.
pub(crate) fn mismatched_message_id_count() -> Status {
    Status::new(Code::Unknown, "mismatched message id count")
}

pub(crate) fn cancelled(message: impl Into<String>) -> Status {
    Status::new(Code::Cancelled, message.into())
}

/// Terminal status for a cooperatively cancelled subscriber session.
pub(crate) fn ok() -> Status {
    Status::new(Code::Ok, "")
}
