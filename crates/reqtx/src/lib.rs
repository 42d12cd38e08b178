//! Top-level facade crate for reqtx.
//!
//! Re-exports core types and the web library so users can depend on a single crate.

pub mod core {
    pub use reqtx_core::*;
}

pub mod web {
    pub use reqtx_web::*;
}
