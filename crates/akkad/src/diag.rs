//! Per-frame scene counters.
//!
//! Enabled by the `diagnostics` feature flag. [`Scene::stats`] returns a
//! [`SceneStats`] snapshot and resets the per-frame counters. Snapshots are
//! `Serialize` so a host can log them or ship them elsewhere as JSON.
//!
//! [`Scene::stats`]: crate::scene::Scene::stats

use serde::Serialize;

// ── Snapshot types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntityPoolStats {
    pub total_slots: usize,
    pub free_count: usize,
    pub alive_count: usize,
    pub storage_count: usize,
    pub spawned_this_frame: u32,
    pub despawned_this_frame: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SceneStats {
    pub frame: u64,
    pub entities: EntityPoolStats,
    pub physics_bodies: usize,
    pub destroyed_last_sweep: usize,
    pub script_faults: usize,
    pub pending_destruction: usize,
}

impl SceneStats {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
