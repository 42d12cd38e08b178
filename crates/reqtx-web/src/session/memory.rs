//! In-process store with staged writes.
//!
//! Writes are staged in the session, moved into the transaction by `flush`
//! and published to the store by `commit`. Empty values violate the store's
//! NOT EMPTY constraint, which surfaces at flush time.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use reqtx_core::error::{Result, TxError};
use reqtx_core::{IsolationLevel, Lifetime};

use super::{Session, Transaction};
use crate::container::{ResolveArgs, Resolver};
use crate::context::{CancellationToken, RequestItems};

type Writes = Vec<(String, String)>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Committed key/value data.
#[derive(Default)]
pub struct MemoryStore {
    committed: Mutex<HashMap<String, String>>,
    commits: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        lock(&self.committed).get(key).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.committed).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.committed).is_empty()
    }

    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    fn publish(&self, writes: Writes) {
        let mut committed = lock(&self.committed);
        for (k, v) in writes {
            committed.insert(k, v);
        }
        self.commits.fetch_add(1, Ordering::Relaxed);
    }
}

const ACTIVE: u8 = 0;
const COMMITTED: u8 = 1;
const ROLLED_BACK: u8 = 2;

pub struct MemoryTransaction {
    store: Arc<MemoryStore>,
    staged: Arc<Mutex<Writes>>,
    pending: Mutex<Writes>,
    isolation: IsolationLevel,
    state: AtomicU8,
}

impl MemoryTransaction {
    fn pending(&self) -> Writes {
        lock(&self.pending).clone()
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    fn is_active(&self) -> bool {
        self.state.load(Ordering::Acquire) == ACTIVE
    }

    async fn commit(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(TxError::Cancelled);
        }
        if self
            .state
            .compare_exchange(ACTIVE, COMMITTED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TxError::Store("transaction is not active".into()));
        }
        let writes = std::mem::take(&mut *lock(&self.pending));
        tracing::debug!(isolation = %self.isolation, writes = writes.len(), "memory transaction committed");
        self.store.publish(writes);
        Ok(())
    }

    async fn rollback(&self, _cancel: &CancellationToken) -> Result<()> {
        if self
            .state
            .compare_exchange(ACTIVE, ROLLED_BACK, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TxError::Store("transaction is not active".into()));
        }
        lock(&self.pending).clear();
        lock(&self.staged).clear();
        Ok(())
    }
}

/// One unit of work. Reads see staged and flushed writes of this session.
pub struct MemorySession {
    store: Arc<MemoryStore>,
    staged: Arc<Mutex<Writes>>,
    current: Mutex<Option<Arc<MemoryTransaction>>>,
    open: AtomicBool,
}

impl MemorySession {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            staged: Arc::new(Mutex::new(Vec::new())),
            current: Mutex::new(None),
            open: AtomicBool::new(true),
        }
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    fn active_transaction(&self) -> Option<Arc<MemoryTransaction>> {
        lock(&self.current).clone().filter(|t| t.is_active())
    }

    /// Stage a write. Requires an active transaction.
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        if self.active_transaction().is_none() {
            return Err(TxError::Store("writes require an active transaction".into()));
        }
        lock(&self.staged).push((key.to_string(), value.to_string()));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let staged = lock(&self.staged)
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone());
        if staged.is_some() {
            return staged;
        }
        if let Some(tx) = self.active_transaction() {
            if let Some((_, v)) = tx.pending().into_iter().rev().find(|(k, _)| k == key) {
                return Some(v);
            }
        }
        self.store.get(key)
    }
}

#[async_trait]
impl Session for MemorySession {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn in_transaction(&self) -> bool {
        self.active_transaction().is_some()
    }

    async fn begin_transaction(&self, isolation: IsolationLevel) -> Result<Arc<dyn Transaction>> {
        if !self.is_open() {
            return Err(TxError::Store("session is closed".into()));
        }
        let mut current = lock(&self.current);
        if current.as_ref().is_some_and(|t| t.is_active()) {
            return Err(TxError::Store("a transaction is already active on this session".into()));
        }
        let tx = Arc::new(MemoryTransaction {
            store: Arc::clone(&self.store),
            staged: Arc::clone(&self.staged),
            pending: Mutex::new(Vec::new()),
            isolation,
            state: AtomicU8::new(ACTIVE),
        });
        *current = Some(Arc::clone(&tx));
        Ok(tx)
    }

    async fn flush(&self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(TxError::Cancelled);
        }
        let tx = self
            .active_transaction()
            .ok_or_else(|| TxError::Store("flush outside a transaction".into()))?;

        let mut staged = lock(&self.staged);
        if let Some((k, _)) = staged.iter().find(|(_, v)| v.is_empty()) {
            return Err(TxError::Store(format!("constraint violation: empty value for key {k}")));
        }
        lock(&tx.pending).append(&mut staged);
        Ok(())
    }
}

const SCOPE_KEY: &str = "reqtx.memory_session";

/// Request-scoped session resolver over one shared [`MemoryStore`].
///
/// Resolves the same session for `MemorySession` and `dyn Session` within a
/// request scope, so handlers and the coordinator share one unit of work.
pub struct MemorySessions {
    store: Arc<MemoryStore>,
    opened: AtomicU64,
}

impl MemorySessions {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            opened: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    pub fn session(&self, scope: &RequestItems) -> Result<Arc<MemorySession>> {
        scope
            .get_or_insert_with(SCOPE_KEY, || {
                self.opened.fetch_add(1, Ordering::Relaxed);
                Arc::new(MemorySession::new(Arc::clone(&self.store)))
            })
            .ok_or_else(|| TxError::Resolution(format!("scope slot {SCOPE_KEY} holds a foreign value")))
    }

    fn scoped(&self, args: &ResolveArgs) -> Result<Arc<MemorySession>> {
        let scope = args
            .scope()
            .ok_or_else(|| TxError::Resolution("memory session resolved outside a request scope".into()))?;
        self.session(scope)
    }
}

#[async_trait]
impl Resolver<MemorySession> for MemorySessions {
    fn lifetime(&self) -> Lifetime {
        Lifetime::Scoped
    }

    async fn resolve(&self, args: &ResolveArgs) -> Result<Arc<MemorySession>> {
        self.scoped(args)
    }
}

#[async_trait]
impl Resolver<dyn Session> for MemorySessions {
    fn lifetime(&self) -> Lifetime {
        Lifetime::Scoped
    }

    async fn resolve(&self, args: &ResolveArgs) -> Result<Arc<dyn Session>> {
        let session: Arc<dyn Session> = self.scoped(args)?;
        Ok(session)
    }
}
