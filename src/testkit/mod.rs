//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`clock`]: `ManualClock`, a [`Clock`](crate::port::Clock) moved by hand.
//! - [`pricing`]: `ScriptedPricing`, a deterministic pricing strategy.
//! - [`domain`]: Builders for catalog entries and tenants.

pub mod clock;
pub mod domain;
pub mod pricing;

pub use clock::ManualClock;
pub use pricing::ScriptedPricing;
