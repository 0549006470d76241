//! Storage-agnostic domain types for the economy.
//!
//! Nothing in here touches a cache, a database or the clock; callers pass
//! `now` in where a default timestamp is needed.

pub mod account;
pub mod catalog;
pub mod cooldown;
pub mod error;
pub mod id;
pub mod interval;
pub mod record;
pub mod series;
pub mod trade;

pub use account::{clamp_add, AccountSnapshot, Position, User, UserField, UserItem, UserPatch};
pub use catalog::{CommandPatch, CommandSpec, Item, ItemPatch};
pub use cooldown::{Cooldown, CooldownState};
pub use error::{PermissionError, ValidationError};
pub use id::{AssetId, CommandId, ItemId, TenantId, UserId};
pub use interval::{downsample, HistoryInterval};
pub use record::Record;
pub use series::{PricePatch, PricePoint, SlidingWindow};
pub use trade::{Goods, Order, Purchase, Quantity};
