//! Transactional policy values.
//!
//! A policy is derived once per endpoint and never changes afterwards. The
//! isolation level is passed through to the store untouched.

use std::fmt;

use serde::Deserialize;

/// Isolation level requested for a request transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    /// Let the store pick its default.
    #[default]
    Unspecified,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
    Snapshot,
    Chaos,
}

impl IsolationLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            IsolationLevel::Unspecified => "unspecified",
            IsolationLevel::ReadUncommitted => "read_uncommitted",
            IsolationLevel::ReadCommitted => "read_committed",
            IsolationLevel::RepeatableRead => "repeatable_read",
            IsolationLevel::Serializable => "serializable",
            IsolationLevel::Snapshot => "snapshot",
            IsolationLevel::Chaos => "chaos",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-endpoint decision: open a transaction or not, and at which isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TransactionalPolicy {
    pub enabled: bool,
    pub isolation: IsolationLevel,
}

impl TransactionalPolicy {
    /// Policy used when an endpoint carries no transactional metadata.
    pub const DISABLED: TransactionalPolicy = TransactionalPolicy {
        enabled: false,
        isolation: IsolationLevel::Unspecified,
    };

    pub fn enabled(isolation: IsolationLevel) -> Self {
        Self { enabled: true, isolation }
    }

    /// Method-level metadata wins over declaring-type metadata.
    pub fn resolve(
        method_level: Option<TransactionalPolicy>,
        type_level: Option<TransactionalPolicy>,
    ) -> TransactionalPolicy {
        method_level.or(type_level).unwrap_or(Self::DISABLED)
    }
}
