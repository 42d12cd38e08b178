//! Session/transaction seam towards the store.
//!
//! The ORM is external; these traits are the narrow surface the coordinator
//! needs. `memory` provides an in-process implementation for the demo binary
//! and tests.

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use reqtx_core::error::Result;
use reqtx_core::IsolationLevel;

use crate::context::CancellationToken;

/// An open store transaction.
#[async_trait]
pub trait Transaction: Send + Sync {
    fn is_active(&self) -> bool;
    async fn commit(&self, cancel: &CancellationToken) -> Result<()>;
    async fn rollback(&self, cancel: &CancellationToken) -> Result<()>;
}

/// A unit of work against the store.
#[async_trait]
pub trait Session: Send + Sync {
    fn is_open(&self) -> bool;
    /// True while the session's current transaction is still active.
    fn in_transaction(&self) -> bool;
    async fn begin_transaction(&self, isolation: IsolationLevel) -> Result<Arc<dyn Transaction>>;
    /// Push pending changes to the store inside the current transaction.
    async fn flush(&self, cancel: &CancellationToken) -> Result<()>;
}

pub use memory::{MemorySession, MemorySessions, MemoryStore, MemoryTransaction};
