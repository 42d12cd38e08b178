use std::sync::Arc;

use tokio::sync::OnceCell;

use reqtx_core::error::{Result, TxError};

use super::resolver::{ResolveArgs, Resolver};

/// What the proxy learned on its first resolution.
enum Slot<T: ?Sized> {
    /// Narrower than process lifetime: resolve fresh on every call.
    NotCacheable,
    /// Process-scoped instance, published only after full construction.
    Cached(Arc<T>),
}

/// Lifetime-aware front for a [`Resolver`].
///
/// The first `obtain` asks the resolver for the component's lifetime. A
/// singleton is resolved once and shared from then on; anything else is
/// resolved on every call and never stored. The decision lives in a
/// once-initialized cell owned by this proxy, so concurrent first callers
/// wait for one resolution instead of racing.
pub struct CachedResolutionProxy<T: ?Sized + Send + Sync + 'static> {
    resolver: Arc<dyn Resolver<T>>,
    order: i32,
    slot: OnceCell<Slot<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> CachedResolutionProxy<T> {
    pub fn new(resolver: Arc<dyn Resolver<T>>, order: i32) -> Self {
        Self {
            resolver,
            order,
            slot: OnceCell::new(),
        }
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    /// `None` until the first resolution settled the question.
    pub fn cacheable(&self) -> Option<bool> {
        self.slot.get().map(|s| matches!(s, Slot::Cached(_)))
    }

    /// Resolution failures are returned unchanged.
    pub async fn obtain(&self, extra: ResolveArgs) -> Result<Arc<T>> {
        let args = extra.with("order", self.order);

        if let Some(slot) = self.slot.get() {
            return self.serve(slot, &args).await;
        }

        let slot = self
            .slot
            .get_or_try_init(|| async {
                let lifetime = self.resolver.lifetime();
                if !lifetime.is_process_scoped() {
                    tracing::debug!(
                        component = std::any::type_name::<T>(),
                        ?lifetime,
                        "component is not process-scoped, resolving per call"
                    );
                    return Ok::<_, TxError>(Slot::NotCacheable);
                }
                let instance = self.resolver.resolve(&args).await?;
                Ok::<_, TxError>(Slot::Cached(instance))
            })
            .await?;

        self.serve(slot, &args).await
    }

    async fn serve(&self, slot: &Slot<T>, args: &ResolveArgs) -> Result<Arc<T>> {
        match slot {
            Slot::Cached(instance) => Ok(Arc::clone(instance)),
            Slot::NotCacheable => self.resolver.resolve(args).await,
        }
    }
}
