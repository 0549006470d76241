//! Merchant - a persistent, multi-tenant economy core.
//!
//! Keeps per-tenant account balances, inventories, share positions,
//! command cooldowns and asset price series in SQLite, fronted by
//! write-through caches that serialize writers per key.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - [`domain`] - Storage-agnostic types: accounts, catalog, cooldowns, prices
//! - [`port`] - Storage, pricing and clock traits
//! - [`application`] - Cache-aside stores, ledger, price series, cooldown
//!   gate, trading and scheduled jobs
//! - [`adapter`] - SQLite and in-memory storage, the default pricing
//!   strategy and the CLI
//! - [`infrastructure`] - Configuration and runtime wiring
//! - [`error`] - Error types for the crate
//!
//! # Features
//!
//! - `testkit` - Manual clock, scripted pricing and fixtures for tests
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use merchant::adapter::outbound::memory::MemoryStore;
//! use merchant::application::{EconomySettings, TenantContext};
//! use merchant::domain::{TenantId, UserId};
//! use merchant::port::SystemClock;
//!
//! # async fn demo() -> merchant::error::Result<()> {
//! let tenant = TenantContext::open(
//!     TenantId::new("guild"),
//!     MemoryStore::new(),
//!     &EconomySettings::default(),
//!     Arc::new(SystemClock),
//! )
//! .await?;
//! let alice = tenant.ledger().add_balance(&UserId::new("alice"), 250).await?;
//! assert_eq!(alice.balance, 250);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
