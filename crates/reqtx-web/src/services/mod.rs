//! Demo handlers served behind the transaction middleware.

pub mod items;
