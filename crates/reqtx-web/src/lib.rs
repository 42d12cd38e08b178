//! reqtx web library entry.
//!
//! This crate wires the policy catalog, the container seam, the transaction
//! coordinator and the axum middleware into one request pipeline. It is
//! consumed by the binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod container;
pub mod context;
pub mod middleware;
pub mod obs;
pub mod ops;
pub mod policy;
pub mod router;
pub mod services;
pub mod session;
pub mod transaction;
