//! Shared error type across reqtx crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Pipeline misconfiguration (transaction opened twice, closed session).
    ProgrammingError,
    /// The container could not produce a component.
    ResolutionFailed,
    /// The backing store rejected a flush/commit/rollback.
    StoreFailed,
    /// The request was cancelled.
    Cancelled,
    /// Invalid configuration.
    BadConfig,
    /// A transaction hook failed.
    HookFailed,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::ProgrammingError => "PROGRAMMING_ERROR",
            ClientCode::ResolutionFailed => "RESOLUTION_FAILED",
            ClientCode::StoreFailed => "STORE_FAILED",
            ClientCode::Cancelled => "CANCELLED",
            ClientCode::BadConfig => "BAD_CONFIG",
            ClientCode::HookFailed => "HOOK_FAILED",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TxError>;

/// Unified error type used by core and web.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TxError {
    /// Fatal and never retried: the pipeline is wired incorrectly.
    #[error("programming error: {0}")]
    Programming(String),
    #[error("resolution failed: {0}")]
    Resolution(String),
    #[error("store: {0}")]
    Store(String),
    #[error("operation cancelled")]
    Cancelled,
    #[error("config: {0}")]
    Config(String),
    #[error("hook failed: {0}")]
    Hook(String),
}

impl TxError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            TxError::Programming(_) => ClientCode::ProgrammingError,
            TxError::Resolution(_) => ClientCode::ResolutionFailed,
            TxError::Store(_) => ClientCode::StoreFailed,
            TxError::Cancelled => ClientCode::Cancelled,
            TxError::Config(_) => ClientCode::BadConfig,
            TxError::Hook(_) => ClientCode::HookFailed,
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, TxError::Cancelled)
    }
}
