//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!                    │  (stores, gate, jobs)   │
//!                    └────────────┬────────────┘
//!                                 │
//!           ┌─────────────────────┼─────────────────────┐
//!           ▼                     ▼                     ▼
//!     ┌───────────┐        ┌─────────────┐       ┌───────────┐
//!     │  Storage  │        │   Pricing   │       │   Clock   │
//!     │  Adapter  │        │  Strategy   │       │           │
//!     └───────────┘        └─────────────┘       └───────────┘
//! ```

pub mod outbound;

pub use outbound::clock::{Clock, SystemClock};
pub use outbound::pricing::PricingStrategy;
pub use outbound::store::{AssetTable, MutableTable, Storage, Table, UserTable};
