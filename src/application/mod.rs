//! Application services (use cases).
//!
//! These services sit between the domain types and the storage port: they
//! own the caches, serialize writers and log storage failures.

pub mod cache;
pub mod catalog;
pub mod gate;
pub mod ledger;
pub mod schedule;
pub mod series;
pub mod settings;
pub mod tenant;
pub mod trade;

pub use catalog::Catalog;
pub use gate::{CooldownGate, Invocation};
pub use ledger::UserLedger;
pub use schedule::{ActiveHours, CleanupJob, PriceTicker, Schedule, ScheduledJob, TickReport};
pub use series::StockTimeSeriesStore;
pub use settings::EconomySettings;
pub use tenant::{TenantContext, TenantRegistry};
pub use trade::Trader;
