//! Endpoint metadata registered at startup.

use std::collections::HashMap;

use axum::http::Method;
use reqtx_core::error::Result;
use reqtx_core::TransactionalPolicy;

use crate::config::schema::{parse_route, ReqTxConfig};

/// Stable identity of a request-handler method: `"METHOD /matched/path"`.
pub fn endpoint_id(method: &Method, matched_path: &str) -> String {
    format!("{method} {matched_path}")
}

/// What is known about an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointDescriptor {
    /// A registered controller action.
    Action {
        controller: String,
        action: String,
        method_policy: Option<TransactionalPolicy>,
        controller_policy: Option<TransactionalPolicy>,
    },
    /// Matched by the router but never registered with the catalog.
    Unrecognized { display_name: String },
}

impl EndpointDescriptor {
    pub fn display_name(&self) -> String {
        match self {
            EndpointDescriptor::Action { controller, action, .. } => format!("{controller}::{action}"),
            EndpointDescriptor::Unrecognized { display_name } => display_name.clone(),
        }
    }
}

struct ControllerEntry {
    policy: Option<TransactionalPolicy>,
}

struct ActionEntry {
    controller: String,
    policy: Option<TransactionalPolicy>,
}

/// Explicit registration of controllers and their actions.
///
/// Built once at startup and then shared read-only.
#[derive(Default)]
pub struct EndpointCatalog {
    controllers: HashMap<String, ControllerEntry>,
    actions: HashMap<String, ActionEntry>,
}

impl EndpointCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &ReqTxConfig) -> Result<Self> {
        let mut catalog = Self::new();
        for c in &cfg.controllers {
            catalog.register_controller(&c.name, c.policy());
            for a in &c.actions {
                let (method, path) = parse_route(&a.route)?;
                catalog.register_action(&c.name, &method, path, a.policy());
            }
        }
        Ok(catalog)
    }

    /// Register declaring-type level metadata. `None` means "no attribute".
    pub fn register_controller(&mut self, name: &str, policy: Option<TransactionalPolicy>) -> &mut Self {
        self.controllers.insert(name.to_string(), ControllerEntry { policy });
        self
    }

    /// Register a controller action. The controller is created on the fly
    /// (without metadata) if it was not registered before.
    pub fn register_action(
        &mut self,
        controller: &str,
        method: &Method,
        path: &str,
        policy: Option<TransactionalPolicy>,
    ) -> &mut Self {
        self.controllers
            .entry(controller.to_string())
            .or_insert(ControllerEntry { policy: None });
        self.actions.insert(
            endpoint_id(method, path),
            ActionEntry { controller: controller.to_string(), policy },
        );
        self
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn describe(&self, endpoint_id: &str) -> EndpointDescriptor {
        let Some(action) = self.actions.get(endpoint_id) else {
            return EndpointDescriptor::Unrecognized { display_name: endpoint_id.to_string() };
        };
        let controller_policy = self
            .controllers
            .get(&action.controller)
            .and_then(|c| c.policy);
        EndpointDescriptor::Action {
            controller: action.controller.clone(),
            action: endpoint_id.to_string(),
            method_policy: action.policy,
            controller_policy,
        }
    }
}
