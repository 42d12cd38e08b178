use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use reqtx_core::TransactionalPolicy;

use super::catalog::{EndpointCatalog, EndpointDescriptor};

/// Endpoint identity -> memoized policy.
///
/// Entries are written once and never evicted; the key space is the static
/// set of routes. The computation runs under the shard lock of `entry`, so a
/// given identity is computed at most once.
#[derive(Default)]
pub struct PolicyCache {
    map: DashMap<String, TransactionalPolicy>,
    computed: AtomicU64,
}

impl PolicyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn policy_for(&self, catalog: &EndpointCatalog, endpoint_id: &str) -> TransactionalPolicy {
        if let Some(p) = self.map.get(endpoint_id) {
            return *p.value();
        }

        *self
            .map
            .entry(endpoint_id.to_string())
            .or_insert_with(|| {
                self.computed.fetch_add(1, Ordering::Relaxed);
                compute(catalog.describe(endpoint_id))
            })
            .value()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of policy computations so far (one per distinct identity).
    pub fn computations(&self) -> u64 {
        self.computed.load(Ordering::Relaxed)
    }
}

fn compute(descriptor: EndpointDescriptor) -> TransactionalPolicy {
    let name = descriptor.display_name();
    match descriptor {
        EndpointDescriptor::Action { method_policy, controller_policy, .. } => {
            let policy = TransactionalPolicy::resolve(method_policy, controller_policy);
            tracing::debug!(action = %name, enabled = policy.enabled, isolation = %policy.isolation, "transactional policy computed");
            policy
        }
        EndpointDescriptor::Unrecognized { display_name } => {
            tracing::warn!(endpoint = %display_name, "endpoint is not a registered controller action, transactions disabled");
            TransactionalPolicy::DISABLED
        }
    }
}
