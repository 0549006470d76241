//! Keyed record contract shared by every cache-aside repository.

use std::fmt;
use std::hash::Hash;

use chrono::{DateTime, Utc};

/// A row that can live in a cache-aside repository.
///
/// `Patch` is a partial update: every field is optional and only the
/// present fields are written. `create` fills in defaults for the absent
/// ones so that a patch applied to a missing key produces a full row.
pub trait Record: Clone + Send + Sync + 'static {
    /// Primary key used for cache lookups.
    type Key: Clone + Eq + Hash + fmt::Display + fmt::Debug + Send + Sync + 'static;
    /// Partial update applied by `set`.
    type Patch: Default + Send + Sync;

    /// The key this row is stored under.
    fn key(&self) -> &Self::Key;

    /// Build a new row for `key` from defaults overlaid with `patch`.
    fn create(key: Self::Key, patch: &Self::Patch, now: DateTime<Utc>) -> Self;

    /// Merge `patch` into this row.
    fn apply(&mut self, patch: &Self::Patch);
}
