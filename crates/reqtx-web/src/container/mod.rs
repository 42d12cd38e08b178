//! Container seam and the lifetime-aware cached resolution proxy.
//!
//! The dependency container itself is external; the pipeline only talks to
//! it through [`Resolver`]. [`CachedResolutionProxy`] sits in front of a
//! resolver so stateless pipeline stages need not re-resolve singletons on
//! every request.

pub mod proxy;
pub mod resolver;

pub use proxy::CachedResolutionProxy;
pub use resolver::{ArgValue, FactoryResolver, ResolveArgs, Resolver};
