//! Recording mocks for the session seam.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::Method;

use reqtx_core::error::{Result, TxError};
use reqtx_core::{IsolationLevel, Lifetime, TransactionalPolicy};
use reqtx_web::container::{ResolveArgs, Resolver};
use reqtx_web::context::{CancellationToken, RequestItems};
use reqtx_web::policy::EndpointCatalog;
use reqtx_web::session::{Session, Transaction};
use reqtx_web::transaction::TRANSACTION_ITEM;

pub const WRITE: &str = "POST /orders";
pub const READ: &str = "GET /orders";
pub const UNKNOWN: &str = "DELETE /orders";

/// `orders` is transactional at controller level; `GET /orders` opts out.
pub fn catalog() -> Arc<EndpointCatalog> {
    let mut c = EndpointCatalog::new();
    c.register_controller("orders", Some(TransactionalPolicy::enabled(IsolationLevel::ReadCommitted)));
    c.register_action("orders", &Method::POST, "/orders", None);
    c.register_action("orders", &Method::GET, "/orders", Some(TransactionalPolicy::DISABLED));
    Arc::new(c)
}

#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }
}

/// Failure knobs shared by the mock session and its transactions.
#[derive(Default)]
pub struct Behavior {
    pub session_closed: AtomicBool,
    pub flush_fails: AtomicBool,
    pub commit_fails: AtomicBool,
    pub rollback_fails: AtomicBool,
    /// Commit records itself, then waits for the caller's cancellation.
    pub commit_waits_for_cancel: AtomicBool,
    pub resolve_fails: AtomicBool,
}

impl Behavior {
    pub fn set(flag: &AtomicBool) {
        flag.store(true, Ordering::SeqCst);
    }
}

pub struct MockTransaction {
    log: CallLog,
    behavior: Arc<Behavior>,
    active: AtomicBool,
    /// One entry per rollback call: was the token able to fire?
    pub rollback_tokens_cancelled: Mutex<Vec<bool>>,
}

impl MockTransaction {
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transaction for MockTransaction {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn commit(&self, cancel: &CancellationToken) -> Result<()> {
        self.log.push("commit");
        if self.behavior.commit_waits_for_cancel.load(Ordering::SeqCst) {
            cancel.cancelled().await;
            return Err(TxError::Cancelled);
        }
        if self.behavior.commit_fails.load(Ordering::SeqCst) {
            return Err(TxError::Store("commit refused".into()));
        }
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(&self, cancel: &CancellationToken) -> Result<()> {
        self.log.push("rollback");
        self.rollback_tokens_cancelled
            .lock()
            .unwrap()
            .push(cancel.is_cancelled());
        if self.behavior.rollback_fails.load(Ordering::SeqCst) {
            return Err(TxError::Store("rollback refused".into()));
        }
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }
}

pub struct MockSession {
    log: CallLog,
    behavior: Arc<Behavior>,
    pub transactions: Mutex<Vec<Arc<MockTransaction>>>,
    /// Registers a foreign transaction in these items while `begin_transaction` runs.
    pub competing_begin: Mutex<Option<RequestItems>>,
}

impl MockSession {
    pub fn last_transaction(&self) -> Arc<MockTransaction> {
        self.transactions.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait]
impl Session for MockSession {
    fn is_open(&self) -> bool {
        !self.behavior.session_closed.load(Ordering::SeqCst)
    }

    fn in_transaction(&self) -> bool {
        self.transactions
            .lock()
            .unwrap()
            .last()
            .is_some_and(|t| t.is_active())
    }

    async fn begin_transaction(&self, isolation: IsolationLevel) -> Result<Arc<dyn Transaction>> {
        self.log.push(format!("begin:{isolation}"));
        let tx = Arc::new(MockTransaction {
            log: self.log.clone(),
            behavior: Arc::clone(&self.behavior),
            active: AtomicBool::new(true),
            rollback_tokens_cancelled: Mutex::new(Vec::new()),
        });
        self.transactions.lock().unwrap().push(Arc::clone(&tx));
        if let Some(items) = self.competing_begin.lock().unwrap().take() {
            items.insert(TRANSACTION_ITEM, true);
        }
        Ok(tx)
    }

    async fn flush(&self, _cancel: &CancellationToken) -> Result<()> {
        self.log.push("flush");
        if self.behavior.flush_fails.load(Ordering::SeqCst) {
            return Err(TxError::Store("constraint violation".into()));
        }
        Ok(())
    }
}

/// Scoped resolver handing out one shared mock session.
pub struct MockSessions {
    pub session: Arc<MockSession>,
    pub behavior: Arc<Behavior>,
    pub log: CallLog,
    pub resolves: AtomicU64,
    pub releases: AtomicU64,
}

impl MockSessions {
    pub fn new() -> Arc<Self> {
        let log = CallLog::default();
        let behavior = Arc::new(Behavior::default());
        Arc::new(Self {
            session: Arc::new(MockSession {
                log: log.clone(),
                behavior: Arc::clone(&behavior),
                transactions: Mutex::new(Vec::new()),
                competing_begin: Mutex::new(None),
            }),
            behavior,
            log,
            resolves: AtomicU64::new(0),
            releases: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl Resolver<dyn Session> for MockSessions {
    fn lifetime(&self) -> Lifetime {
        Lifetime::Scoped
    }

    async fn resolve(&self, _args: &ResolveArgs) -> Result<Arc<dyn Session>> {
        if self.behavior.resolve_fails.load(Ordering::SeqCst) {
            return Err(TxError::Resolution("session factory unavailable".into()));
        }
        self.resolves.fetch_add(1, Ordering::SeqCst);
        let session: Arc<dyn Session> = self.session.clone();
        Ok(session)
    }

    fn release(&self, _instance: Arc<dyn Session>) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}
