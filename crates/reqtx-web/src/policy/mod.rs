//! Policy layer (endpoint catalog + memoized policy lookup).
//!
//! The catalog is the startup registration of endpoint metadata; the cache
//! turns it into one immutable `TransactionalPolicy` per endpoint identity.

pub mod cache;
pub mod catalog;

pub use cache::PolicyCache;
pub use catalog::{endpoint_id, EndpointCatalog, EndpointDescriptor};
