//! Outbound adapters (driven side).

pub mod memory;
pub mod pricing;
pub mod sqlite;
