//! Cache-aside storage shared by every keyed economy table.

mod locks;
mod store;

pub use locks::KeyLocks;
pub use store::CacheAsideStore;
