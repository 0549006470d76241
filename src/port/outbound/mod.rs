//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe infrastructure dependencies: durable storage,
//! the pricing strategy and the clock.

pub mod clock;
pub mod pricing;
pub mod store;
