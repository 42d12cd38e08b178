//! Request transaction lifecycle.
//!
//! `begin` runs before the inner handler and may open a transaction; `close`
//! runs after it and commits or rolls back. The open handle travels between
//! the two phases through the request-scoped bridge.

pub mod bridge;
pub mod coordinator;
pub mod hooks;

pub use bridge::{RequestTransactionState, SIMULATION_ITEM, TRANSACTION_ITEM};
pub use coordinator::{BeginOutcome, CloseOutcome, TransactionCoordinator};
pub use hooks::{HookContext, TransactionHooks};
