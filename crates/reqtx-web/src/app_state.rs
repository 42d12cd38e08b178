//! Shared application state for the reqtx demo server.
//!
//! Wires the in-memory store, the request-scoped session resolver, the
//! endpoint catalog and the coordinator (behind its cached resolution
//! proxy). Startup errors are explicit (Result instead of panic).

use std::sync::Arc;

use reqtx_core::error::Result;

use crate::config::ReqTxConfig;
use crate::container::{CachedResolutionProxy, FactoryResolver, Resolver};
use crate::obs::TxMetrics;
use crate::policy::{EndpointCatalog, PolicyCache};
use crate::services::items::ROUTES;
use crate::session::{MemorySessions, MemoryStore, Session};
use crate::transaction::{TransactionCoordinator, TransactionHooks};

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ReqTxConfig,
    sessions: Arc<MemorySessions>,
    coordinator: Arc<CachedResolutionProxy<TransactionCoordinator>>,
    metrics: Arc<TxMetrics>,
}

impl AppState {
    pub fn new(cfg: ReqTxConfig) -> Result<Self> {
        Self::with_hooks(cfg, TransactionHooks::default())
    }

    pub fn with_hooks(cfg: ReqTxConfig, hooks: TransactionHooks) -> Result<Self> {
        // 1) Startup registration of endpoint metadata
        let catalog = Arc::new(EndpointCatalog::from_config(&cfg)?);
        let simulation_header = cfg.transactions.simulation_header_name()?;

        // config <-> router sanity check
        for c in &cfg.controllers {
            for a in &c.actions {
                if !ROUTES.contains(&a.route.as_str()) {
                    tracing::warn!(controller = %c.name, route = %a.route, "configured route is not served by the router");
                }
            }
        }

        // 2) Store + request-scoped sessions
        let store = Arc::new(MemoryStore::new());
        let sessions = Arc::new(MemorySessions::new(store));
        let metrics = Arc::new(TxMetrics::new());
        let policies = Arc::new(PolicyCache::new());

        // 3) Coordinator registered as a singleton behind the proxy
        let session_resolver: Arc<dyn Resolver<dyn Session>> = sessions.clone();
        let coordinator_metrics = Arc::clone(&metrics);
        let factory = FactoryResolver::singleton(move |args| {
            tracing::info!(order = ?args.order(), "creating transaction coordinator");
            let coordinator = TransactionCoordinator::new(Arc::clone(&session_resolver), Arc::clone(&catalog))
                .with_policy_cache(Arc::clone(&policies))
                .with_hooks(hooks.clone())
                .with_metrics(Arc::clone(&coordinator_metrics))
                .with_simulation_header(simulation_header.clone());
            Ok(Arc::new(coordinator))
        });
        let coordinator = Arc::new(CachedResolutionProxy::new(
            Arc::new(factory),
            cfg.transactions.coordinator_order,
        ));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                sessions,
                coordinator,
                metrics,
            }),
        })
    }

    pub fn cfg(&self) -> &ReqTxConfig {
        &self.inner.cfg
    }

    pub fn sessions(&self) -> Arc<MemorySessions> {
        Arc::clone(&self.inner.sessions)
    }

    pub fn session_resolver(&self) -> Arc<dyn Resolver<dyn Session>> {
        self.sessions()
    }

    pub fn coordinator(&self) -> Arc<CachedResolutionProxy<TransactionCoordinator>> {
        Arc::clone(&self.inner.coordinator)
    }

    pub fn metrics(&self) -> Arc<TxMetrics> {
        Arc::clone(&self.inner.metrics)
    }
}
