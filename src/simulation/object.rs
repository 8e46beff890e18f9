//! Simulated objects and the updates generators emit for them

use serde::{Deserialize, Serialize};

use crate::core::types::{GeoPosition, ObjectId, ObjectKind, Tick, Velocity};

/// Why an object left the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// A scripted route ran out of waypoints
    RouteComplete,
    /// A newer random batch replaced this one
    Superseded,
    /// Not refreshed within the inactivity timeout
    Inactive,
}

/// What a trajectory generator reports about one object on one tick.
///
/// The registry owns the bookkeeping fields (`last_updated_tick`, `active`)
/// and turns updates into [`SimulatedObject`]s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectUpdate {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub position: GeoPosition,
    pub velocity: Option<Velocity>,
    pub classification_hint: Option<String>,
    /// Why the hint was suggested, shown next to it by the tracker
    pub suggestion_reason: Option<String>,
    pub label: Option<String>,
    /// Previously reported positions, oldest first
    pub track: Vec<GeoPosition>,
}

impl ObjectUpdate {
    pub fn new(id: ObjectId, kind: ObjectKind, position: GeoPosition) -> Self {
        Self {
            id,
            kind,
            position,
            velocity: None,
            classification_hint: None,
            suggestion_reason: None,
            label: None,
            track: Vec::new(),
        }
    }

    pub fn with_velocity(mut self, velocity: Velocity) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.classification_hint = Some(hint.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.suggestion_reason = Some(reason.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_track(mut self, track: Vec<GeoPosition>) -> Self {
        self.track = track;
        self
    }
}

/// One tracked entity in a task's registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub position: GeoPosition,
    pub velocity: Option<Velocity>,
    pub classification_hint: Option<String>,
    pub suggestion_reason: Option<String>,
    pub label: Option<String>,
    pub track: Vec<GeoPosition>,
    pub first_seen_tick: Tick,
    pub last_updated_tick: Tick,
    pub active: bool,
}

impl SimulatedObject {
    pub fn from_update(update: ObjectUpdate, tick: Tick) -> Self {
        Self {
            id: update.id,
            kind: update.kind,
            position: update.position,
            velocity: update.velocity,
            classification_hint: update.classification_hint,
            suggestion_reason: update.suggestion_reason,
            label: update.label,
            track: update.track,
            first_seen_tick: tick,
            last_updated_tick: tick,
            active: true,
        }
    }

    /// Overwrite the producer-owned fields with a fresh update
    pub fn refresh(&mut self, update: ObjectUpdate, tick: Tick) {
        self.kind = update.kind;
        self.position = update.position;
        self.velocity = update.velocity;
        self.classification_hint = update.classification_hint;
        self.suggestion_reason = update.suggestion_reason;
        self.label = update.label;
        self.track = update.track;
        self.last_updated_tick = self.last_updated_tick.max(tick);
    }

    /// Ticks elapsed since the last refresh
    pub fn idle_ticks(&self, current: Tick) -> Tick {
        current.saturating_sub(self.last_updated_tick)
    }
}
