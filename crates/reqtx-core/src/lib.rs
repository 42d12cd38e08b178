//! reqtx core: transport-agnostic primitives shared by the web layer.
//!
//! This crate defines the transactional policy values, component lifetimes,
//! response classification and the error surface. It carries no transport or
//! runtime dependencies so it can be reused by other pipelines.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! All fallible paths must surface as `TxError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod lifetime;
pub mod outcome;
pub mod policy;

/// Shared result type.
pub use error::{Result, TxError};
pub use lifetime::Lifetime;
pub use outcome::{is_success_status, FailureReason, RequestOutcome};
pub use policy::{IsolationLevel, TransactionalPolicy};
