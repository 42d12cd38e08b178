use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName};

use reqtx_core::error::{Result, TxError};
use reqtx_core::{IsolationLevel, RequestOutcome, TransactionalPolicy};

use super::bridge::{self, RequestTransactionState};
use super::hooks::{HookContext, TransactionHooks};
use crate::container::{ResolveArgs, Resolver};
use crate::context::{CancellationToken, RequestItems};
use crate::obs::TxMetrics;
use crate::policy::{EndpointCatalog, PolicyCache};
use crate::session::Session;

/// Header toggling simulation mode unless configured otherwise.
pub const DEFAULT_SIMULATION_HEADER: &str = "x-request-simulation";

/// Result of the begin phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    /// Policy disabled: the handler runs without a transaction.
    Skipped,
    Opened {
        isolation: IsolationLevel,
        simulation: bool,
    },
}

/// Result of the close phase when it did not raise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Nothing was registered for this request.
    NoTransaction,
    /// The handle was no longer active (completed by the handler itself).
    AlreadyCompleted,
    Committed,
    /// Rolled back because of the given outcome. Rollback failures are logged only.
    RolledBack(RequestOutcome),
}

/// Opens a transaction before the handler and closes it afterwards.
///
/// Stateless per request: everything a request needs between the two phases
/// lives in its [`RequestItems`]. One instance may serve all requests.
pub struct TransactionCoordinator {
    sessions: Arc<dyn Resolver<dyn Session>>,
    catalog: Arc<EndpointCatalog>,
    policies: Arc<PolicyCache>,
    hooks: TransactionHooks,
    metrics: Arc<TxMetrics>,
    simulation_header: HeaderName,
}

impl TransactionCoordinator {
    pub fn new(sessions: Arc<dyn Resolver<dyn Session>>, catalog: Arc<EndpointCatalog>) -> Self {
        Self {
            sessions,
            catalog,
            policies: Arc::new(PolicyCache::new()),
            hooks: TransactionHooks::default(),
            metrics: Arc::new(TxMetrics::new()),
            simulation_header: HeaderName::from_static(DEFAULT_SIMULATION_HEADER),
        }
    }

    /// Share a policy cache between coordinator instances.
    pub fn with_policy_cache(mut self, policies: Arc<PolicyCache>) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_hooks(mut self, hooks: TransactionHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<TxMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_simulation_header(mut self, header: HeaderName) -> Self {
        self.simulation_header = header;
        self
    }

    pub fn policy_for(&self, endpoint: &str) -> TransactionalPolicy {
        self.policies.policy_for(&self.catalog, endpoint)
    }

    pub fn policies(&self) -> &Arc<PolicyCache> {
        &self.policies
    }

    fn scope_args(items: &RequestItems) -> ResolveArgs {
        ResolveArgs::new().in_scope(items.clone())
    }

    /// Begin phase. Must complete before the handler starts.
    pub async fn begin(
        &self,
        endpoint: &str,
        headers: &HeaderMap,
        items: &RequestItems,
    ) -> Result<BeginOutcome> {
        if bridge::has_transaction(items) {
            return Err(TxError::Programming(format!(
                "{endpoint}: a transaction was already started for this request"
            )));
        }

        let policy = self.policy_for(endpoint);
        if !policy.enabled {
            tracing::debug!(endpoint, "no transaction requested");
            self.metrics.record("skipped");
            return Ok(BeginOutcome::Skipped);
        }

        let session = self.sessions.resolve(&Self::scope_args(items)).await?;
        let opened = self.open(endpoint, &session, policy, headers, items).await;
        self.sessions.release(session);
        opened
    }

    async fn open(
        &self,
        endpoint: &str,
        session: &Arc<dyn Session>,
        policy: TransactionalPolicy,
        headers: &HeaderMap,
        items: &RequestItems,
    ) -> Result<BeginOutcome> {
        if !session.is_open() {
            return Err(TxError::Programming(format!(
                "{endpoint}: current session is not open"
            )));
        }

        tracing::info!(endpoint, isolation = %policy.isolation, "starting request transaction");
        let transaction = session.begin_transaction(policy.isolation).await?;
        let simulation = headers.contains_key(&self.simulation_header);

        let state = RequestTransactionState {
            transaction: Arc::clone(&transaction),
            simulation,
        };
        if let Err(e) = bridge::store(items, state) {
            tracing::error!(endpoint, error = %e, "cannot register request transaction, rolling back");
            match transaction.rollback(&CancellationToken::none()).await {
                Ok(()) => self.metrics.record("rolled_back"),
                Err(re) => {
                    tracing::error!(endpoint, error = %re, "rollback of unregistered request transaction failed");
                    self.metrics.record("rollback_failed");
                }
            }
            return Err(e);
        }

        self.metrics.record("begun");
        Ok(BeginOutcome::Opened {
            isolation: policy.isolation,
            simulation,
        })
    }

    /// Close phase. Runs after the handler, whatever the handler did.
    ///
    /// The bridge is cleared on every path. Errors returned here are either
    /// programming/resolution errors, a commit-path failure, or the
    /// cancellation that interrupted the commit.
    pub async fn close(
        &self,
        endpoint: &str,
        items: &RequestItems,
        status: u16,
        cancel: &CancellationToken,
    ) -> Result<CloseOutcome> {
        let Some(state) = bridge::take(items) else {
            tracing::debug!(endpoint, "no request transaction to close");
            return Ok(CloseOutcome::NoTransaction);
        };

        if !state.transaction.is_active() {
            tracing::info!(endpoint, "request transaction already completed");
            return Ok(CloseOutcome::AlreadyCompleted);
        }

        let session = match self.sessions.resolve(&Self::scope_args(items)).await {
            Ok(s) => s,
            Err(e) => {
                self.abandon(endpoint, &state, &e).await;
                return Err(e);
            }
        };

        let result = if session.is_open() {
            self.finish(endpoint, &session, &state, items, status, cancel)
                .await
        } else {
            let e = TxError::Programming(format!("{endpoint}: current session is not open"));
            self.abandon(endpoint, &state, &e).await;
            Err(e)
        };

        self.sessions.release(session);
        result
    }

    async fn finish(
        &self,
        endpoint: &str,
        session: &Arc<dyn Session>,
        state: &RequestTransactionState,
        items: &RequestItems,
        status: u16,
        cancel: &CancellationToken,
    ) -> Result<CloseOutcome> {
        let outcome = RequestOutcome::classify(status, state.simulation, cancel.is_cancelled());
        let ctx = HookContext {
            endpoint: endpoint.to_string(),
            items: items.clone(),
            cancel: cancel.clone(),
        };

        if outcome.should_rollback() {
            tracing::info!(endpoint, status, outcome = outcome.as_str(), "rolling back request transaction");
            self.discard(endpoint, session, state, &ctx).await;
            return Ok(CloseOutcome::RolledBack(outcome));
        }

        self.commit(endpoint, session, state, &ctx).await
    }

    /// Rollback chosen from the outcome. Nothing raised here reaches the caller.
    async fn discard(
        &self,
        endpoint: &str,
        session: &Arc<dyn Session>,
        state: &RequestTransactionState,
        ctx: &HookContext,
    ) {
        let quiet = suppressed(ctx);
        if let Err(e) = self.hooks.run_on_rollback(&quiet).await {
            tracing::error!(endpoint, error = %e, "on-rollback hook failed");
        }

        if state.simulation {
            tracing::info!(endpoint, "simulation requested, flushing before rollback");
            if let Err(e) = session.flush(&ctx.cancel).await {
                tracing::warn!(endpoint, error = %e, "simulation flush failed");
            }
        }

        self.rollback_quietly(endpoint, state, &quiet).await;
    }

    async fn commit(
        &self,
        endpoint: &str,
        session: &Arc<dyn Session>,
        state: &RequestTransactionState,
        ctx: &HookContext,
    ) -> Result<CloseOutcome> {
        tracing::info!(endpoint, "flush and commit request transaction");

        let cancel = &ctx.cancel;
        let sequence = async {
            self.hooks.run_on_commit(ctx).await?;
            session.flush(cancel).await?;
            state.transaction.commit(cancel).await
        };
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TxError::Cancelled),
            r = sequence => r,
        };

        match result {
            Ok(()) => {
                self.metrics.record("committed");
                if let Err(e) = self.hooks.run_after_commit(ctx).await {
                    tracing::error!(endpoint, error = %e, "after-commit hook failed");
                    return Err(e);
                }
                Ok(CloseOutcome::Committed)
            }
            Err(TxError::Cancelled) => {
                tracing::warn!(endpoint, "request cancelled during commit, rolling back");
                self.metrics.record("cancelled");
                self.rollback_after_failure(endpoint, state, ctx).await;
                Err(TxError::Cancelled)
            }
            Err(e) => {
                tracing::error!(endpoint, error = %e, "flush and commit of request transaction failed");
                self.metrics.record("commit_failed");
                self.rollback_after_failure(endpoint, state, ctx).await;
                Err(e)
            }
        }
    }

    async fn rollback_after_failure(
        &self,
        endpoint: &str,
        state: &RequestTransactionState,
        ctx: &HookContext,
    ) {
        let quiet = suppressed(ctx);
        if let Err(e) = self.hooks.run_on_rollback(&quiet).await {
            tracing::error!(endpoint, error = %e, "on-rollback hook failed");
        }
        self.rollback_quietly(endpoint, state, &quiet).await;
    }

    /// Rollback with cancellation suppressed; failures are logged, never raised.
    async fn rollback_quietly(
        &self,
        endpoint: &str,
        state: &RequestTransactionState,
        quiet: &HookContext,
    ) {
        match state.transaction.rollback(&quiet.cancel).await {
            Ok(()) => self.metrics.record("rolled_back"),
            Err(e) => {
                tracing::error!(endpoint, error = %e, "rollback of request transaction failed");
                self.metrics.record("rollback_failed");
            }
        }
        if let Err(e) = self.hooks.run_after_rollback(quiet).await {
            tracing::error!(endpoint, error = %e, "after-rollback hook failed");
        }
    }

    /// The session is gone or closed: still never leave the transaction open.
    async fn abandon(&self, endpoint: &str, state: &RequestTransactionState, cause: &TxError) {
        tracing::error!(endpoint, error = %cause, "cannot close request transaction normally, rolling back");
        match state.transaction.rollback(&CancellationToken::none()).await {
            Ok(()) => self.metrics.record("rolled_back"),
            Err(e) => {
                tracing::error!(endpoint, error = %e, "rollback of abandoned request transaction failed");
                self.metrics.record("rollback_failed");
            }
        }
    }
}

fn suppressed(ctx: &HookContext) -> HookContext {
    HookContext {
        cancel: CancellationToken::none(),
        ..ctx.clone()
    }
}
