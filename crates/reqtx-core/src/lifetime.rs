//! Component lifetimes as reported by a dependency container.

use serde::Deserialize;

/// Declared lifetime of a container component.
///
/// Only [`Lifetime::Singleton`] is process-scoped; every other lifetime is
/// narrower and must never be cached outside the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifetime {
    /// One instance for the whole process.
    Singleton,
    /// One instance per request scope.
    Scoped,
    /// A fresh instance per resolution.
    Transient,
}

impl Lifetime {
    pub fn is_process_scoped(self) -> bool {
        matches!(self, Lifetime::Singleton)
    }
}
