//! SQLite persistence adapter.
//!
//! One database file per tenant. Every table port is implemented on the
//! same [`SqliteStore`] over a shared connection pool.

mod account;
mod catalog;
pub mod database;
mod series;
mod store;

pub use store::SqliteStore;
