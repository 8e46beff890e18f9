//! Per-run registry of live objects
//!
//! Each task run owns exactly one registry. Objects leave it in three ways:
//! - `sweep`: not refreshed for longer than the inactivity timeout
//! - `retire`: the generator says the object is done (route complete,
//!   superseded batch)
//! - `clear`: the run ended
//!
//! Removed objects are dropped, never kept as tombstones, so an id that
//! shows up again later starts a fresh object.

use ahash::AHashMap;

use crate::core::types::{ObjectId, Tick};
use crate::simulation::object::{ObjectUpdate, SimulatedObject};

/// Counts from one `upsert` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: usize,
    pub refreshed: usize,
}

#[derive(Debug, Default)]
pub struct ObjectRegistry {
    objects: AHashMap<ObjectId, SimulatedObject>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh known ids, insert unknown ones as active
    pub fn upsert<I>(&mut self, updates: I, tick: Tick) -> UpsertStats
    where
        I: IntoIterator<Item = ObjectUpdate>,
    {
        let mut stats = UpsertStats::default();
        for update in updates {
            match self.objects.get_mut(&update.id) {
                Some(existing) => {
                    existing.refresh(update, tick);
                    stats.refreshed += 1;
                }
                None => {
                    self.objects
                        .insert(update.id.clone(), SimulatedObject::from_update(update, tick));
                    stats.inserted += 1;
                }
            }
        }
        stats
    }

    /// Remove every object idle for more than `timeout` ticks.
    ///
    /// An object refreshed at tick T survives a sweep at T + timeout and is
    /// removed by the sweep at T + timeout + 1. Returned ids are sorted.
    pub fn sweep(&mut self, tick: Tick, timeout: Tick) -> Vec<ObjectId> {
        let mut removed = Vec::new();
        self.objects.retain(|id, object| {
            if object.idle_ticks(tick) > timeout {
                object.active = false;
                removed.push(id.clone());
                false
            } else {
                true
            }
        });
        removed.sort();
        removed
    }

    /// Explicitly remove objects; returns the ids that were present
    pub fn retire(&mut self, ids: &[ObjectId]) -> Vec<ObjectId> {
        ids.iter()
            .filter(|id| self.objects.remove(*id).is_some())
            .cloned()
            .collect()
    }

    /// Active objects ordered by id
    pub fn snapshot(&self) -> Vec<SimulatedObject> {
        let mut objects: Vec<SimulatedObject> = self
            .objects
            .values()
            .filter(|o| o.active)
            .cloned()
            .collect();
        objects.sort_by(|a, b| a.id.cmp(&b.id));
        objects
    }

    pub fn get(&self, id: &ObjectId) -> Option<&SimulatedObject> {
        self.objects.get(id)
    }

    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
