//! Per-request context shared between pipeline stages.
//!
//! `RequestItems` is the request-scoped key/value bridge and
//! `CancellationToken` carries the request's cancellation signal. Both are
//! inserted into the request extensions by the transaction middleware.

pub mod cancel;
pub mod items;

pub use cancel::CancellationToken;
pub use items::RequestItems;
