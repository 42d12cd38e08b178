use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use reqtx_core::error::Result;

use crate::context::{CancellationToken, RequestItems};

/// Passed to every hook invocation.
#[derive(Clone, Debug)]
pub struct HookContext {
    pub endpoint: String,
    pub items: RequestItems,
    /// Never fires for rollback hooks.
    pub cancel: CancellationToken,
}

type Hook = Arc<dyn Fn(HookContext) -> BoxFuture<'static, Result<()>> + Send + Sync>;

fn boxed<F, Fut>(f: F) -> Hook
where
    F: Fn(HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |ctx| -> BoxFuture<'static, Result<()>> { Box::pin(f(ctx)) })
}

async fn run(hook: &Option<Hook>, ctx: &HookContext) -> Result<()> {
    match hook {
        Some(h) => h(ctx.clone()).await,
        None => Ok(()),
    }
}

/// Optional callbacks around commit and rollback. Unset hooks are no-ops.
#[derive(Clone, Default)]
pub struct TransactionHooks {
    on_commit: Option<Hook>,
    after_commit: Option<Hook>,
    on_rollback: Option<Hook>,
    after_rollback: Option<Hook>,
}

impl TransactionHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs before flush + commit; a failure turns the request into a rollback.
    pub fn on_commit<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_commit = Some(boxed(f));
        self
    }

    pub fn after_commit<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.after_commit = Some(boxed(f));
        self
    }

    /// Compensating logic before data is discarded.
    pub fn on_rollback<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.on_rollback = Some(boxed(f));
        self
    }

    pub fn after_rollback<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.after_rollback = Some(boxed(f));
        self
    }

    pub(crate) async fn run_on_commit(&self, ctx: &HookContext) -> Result<()> {
        run(&self.on_commit, ctx).await
    }

    pub(crate) async fn run_after_commit(&self, ctx: &HookContext) -> Result<()> {
        run(&self.after_commit, ctx).await
    }

    pub(crate) async fn run_on_rollback(&self, ctx: &HookContext) -> Result<()> {
        run(&self.on_rollback, ctx).await
    }

    pub(crate) async fn run_after_rollback(&self, ctx: &HookContext) -> Result<()> {
        run(&self.after_rollback, ctx).await
    }
}
