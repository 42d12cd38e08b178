//! Config loader (strict parsing).

pub mod schema;

use std::fs;

use reqtx_core::error::{Result, TxError};

pub use schema::{ActionConfig, ControllerConfig, ReqTxConfig, ServerSection, TransactionSection};

pub fn load_from_file(path: &str) -> Result<ReqTxConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| TxError::Config(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ReqTxConfig> {
    let cfg: ReqTxConfig =
        serde_yaml::from_str(s).map_err(|e| TxError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
