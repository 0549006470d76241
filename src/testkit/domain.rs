//! Builders for catalog entries and tenants.

use std::sync::Arc;

use crate::adapter::outbound::memory::MemoryStore;
use crate::application::{EconomySettings, TenantContext};
use crate::domain::{CommandPatch, ItemPatch, TenantId};
use crate::port::Clock;

pub fn item(price: i64) -> ItemPatch {
    ItemPatch {
        price: Some(price),
        ..ItemPatch::default()
    }
}

pub fn command(cooldown_ms: i64) -> CommandPatch {
    CommandPatch {
        cooldown_ms: Some(cooldown_ms),
        ..CommandPatch::default()
    }
}

pub fn admin_command() -> CommandPatch {
    CommandPatch {
        is_admin: Some(true),
        ..CommandPatch::default()
    }
}

/// A tenant over a fresh in-memory store, not yet warmed.
pub fn memory_tenant(id: &str, clock: Arc<dyn Clock>) -> TenantContext<MemoryStore> {
    TenantContext::new(
        TenantId::new(id),
        MemoryStore::new(),
        &EconomySettings::default(),
        clock,
    )
}
