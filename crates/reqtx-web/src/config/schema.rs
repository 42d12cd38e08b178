use std::collections::HashSet;

use axum::http::{HeaderName, Method};
use reqtx_core::error::{Result, TxError};
use reqtx_core::{IsolationLevel, TransactionalPolicy};
use serde::Deserialize;

use crate::policy::endpoint_id;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReqTxConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub transactions: TransactionSection,

    #[serde(default)]
    pub controllers: Vec<ControllerConfig>,
}

impl ReqTxConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(TxError::Config(format!("unsupported version: {}", self.version)));
        }
        self.transactions.validate()?;

        let mut names = HashSet::new();
        let mut routes = HashSet::new();
        for c in &self.controllers {
            if c.name.trim().is_empty() {
                return Err(TxError::Config("controller name must not be empty".into()));
            }
            if !names.insert(c.name.as_str()) {
                return Err(TxError::Config(format!("duplicate controller: {}", c.name)));
            }
            for a in &c.actions {
                let (method, path) = parse_route(&a.route)?;
                // Dedupe on the identity the catalog keys on, not the raw string.
                if !routes.insert(endpoint_id(&method, path)) {
                    return Err(TxError::Config(format!("route declared twice: {}", a.route)));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self { listen: default_listen() }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionSection {
    #[serde(default = "default_simulation_header")]
    pub simulation_header: String,

    /// Named `order` argument handed to the container when resolving the coordinator.
    #[serde(default)]
    pub coordinator_order: i32,

    /// Flush the session right after the handler, before the transaction closes.
    #[serde(default)]
    pub flush_after_action: bool,
}

impl Default for TransactionSection {
    fn default() -> Self {
        Self {
            simulation_header: default_simulation_header(),
            coordinator_order: 0,
            flush_after_action: false,
        }
    }
}

impl TransactionSection {
    pub fn validate(&self) -> Result<()> {
        self.simulation_header_name().map(|_| ())
    }

    pub fn simulation_header_name(&self) -> Result<HeaderName> {
        HeaderName::try_from(self.simulation_header.as_str()).map_err(|e| {
            TxError::Config(format!(
                "transactions.simulation_header is not a valid header name ({}): {e}",
                self.simulation_header
            ))
        })
    }
}

fn default_simulation_header() -> String {
    "X-REQUEST-SIMULATION".into()
}

/// Declaring-type level metadata.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    pub name: String,
    #[serde(default)]
    pub transactional: Option<bool>,
    #[serde(default)]
    pub isolation: IsolationLevel,
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
}

impl ControllerConfig {
    pub fn policy(&self) -> Option<TransactionalPolicy> {
        self.transactional.map(|enabled| TransactionalPolicy {
            enabled,
            isolation: self.isolation,
        })
    }
}

/// Method level metadata. `route` is `"METHOD /matched/path"`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionConfig {
    pub route: String,
    #[serde(default)]
    pub transactional: Option<bool>,
    #[serde(default)]
    pub isolation: IsolationLevel,
}

impl ActionConfig {
    pub fn policy(&self) -> Option<TransactionalPolicy> {
        self.transactional.map(|enabled| TransactionalPolicy {
            enabled,
            isolation: self.isolation,
        })
    }
}

/// Extension methods never match a router method, so they are rejected.
const STANDARD_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
    Method::CONNECT,
];

/// Split `"PUT /items/:key"` into a method and a path.
pub fn parse_route(route: &str) -> Result<(Method, &str)> {
    let (method, path) = route
        .split_once(' ')
        .ok_or_else(|| TxError::Config(format!("invalid route: {route} (expected METHOD /path)")))?;
    let method = Method::from_bytes(method.as_bytes())
        .ok()
        .filter(|m| STANDARD_METHODS.contains(m))
        .ok_or_else(|| TxError::Config(format!("invalid route method (expected uppercase HTTP method): {route}")))?;
    let path = path.trim();
    if !path.starts_with('/') {
        return Err(TxError::Config(format!("route path must start with '/': {route}")));
    }
    Ok((method, path))
}
