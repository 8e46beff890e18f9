//! Wire schema for object batches
//!
//! Positions go out as `[lon, lat, alt_m]` and orientation as `rotation`,
//! the heading shifted by -90 degrees for the map layer. An object without
//! a velocity has rotation 0.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::core::geo;
use crate::core::types::{GeoPosition, ObjectId, ObjectKind, TaskKind, Tick};
use crate::simulation::object::{RemovalReason, SimulatedObject};

// =========================================================================
//  OUTBOUND SCHEMA
// =========================================================================

/// One delivery: the full active set of a task plus what left it this tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestBatch {
    pub task: TaskKind,
    pub tick: Tick,
    pub sent_at_ms: u64,
    pub objects: Vec<ObjectRecord>,
    pub removed: Vec<RemovalRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub kind: ObjectKind,
    /// `[lon, lat, alt_m]`
    pub position: [f64; 3],
    pub rotation: f64,
    /// Ground speed in m/s
    pub speed: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plots: Vec<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub suggested_identification: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemovalRecord {
    pub id: ObjectId,
    pub reason: RemovalReason,
}

/// One-time classification suggestion for an attack-profile object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSuggestion {
    pub id: ObjectId,
    pub task: TaskKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `[lon, lat, alt_m]`
    pub position: [f64; 3],
    pub rotation: f64,
    pub speed: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plots: Vec<[f64; 3]>,
    pub description: String,
    pub classification: Classification,
}

impl ClassificationSuggestion {
    /// `None` unless the record carries a suggestion reason
    pub fn from_record(task: TaskKind, record: &ObjectRecord) -> Option<Self> {
        let classification = record.classification.clone()?;
        let description = classification.suggestion_reason.clone()?;
        Some(Self {
            id: record.id.clone(),
            task,
            name: record.name.clone(),
            position: record.position,
            rotation: record.rotation,
            speed: record.speed,
            plots: record.plots.clone(),
            description,
            classification,
        })
    }
}

/// Raw radar detection, not tied to any tracked object
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadarPoint {
    pub lng: f64,
    pub lat: f64,
    /// Meters
    pub alt: f64,
}

impl From<&GeoPosition> for RadarPoint {
    fn from(p: &GeoPosition) -> Self {
        Self {
            lng: p.lon,
            lat: p.lat,
            alt: p.alt_m,
        }
    }
}

fn lon_lat_alt(p: &GeoPosition) -> [f64; 3] {
    [p.lon, p.lat, p.alt_m]
}

impl From<&SimulatedObject> for ObjectRecord {
    fn from(object: &SimulatedObject) -> Self {
        // No velocity means no heading to shift, so the record faces north
        let (rotation, speed) = object
            .velocity
            .map(|v| (geo::rotation_from_heading(v.heading_deg), v.speed_mps))
            .unwrap_or((0.0, 0.0));

        Self {
            id: object.id.clone(),
            kind: object.kind,
            position: lon_lat_alt(&object.position),
            rotation,
            speed,
            name: object.label.clone(),
            classification: object.classification_hint.as_ref().map(|hint| Classification {
                suggested_identification: hint.clone(),
                suggestion_reason: object.suggestion_reason.clone(),
            }),
            plots: object.track.iter().map(lon_lat_alt).collect(),
        }
    }
}

impl IngestBatch {
    pub fn new(task: TaskKind, tick: Tick, objects: &[SimulatedObject], removed: &[(ObjectId, RemovalReason)]) -> Self {
        Self {
            task,
            tick,
            sent_at_ms: now_ms(),
            objects: objects.iter().map(ObjectRecord::from).collect(),
            removed: removed
                .iter()
                .map(|(id, reason)| RemovalRecord {
                    id: id.clone(),
                    reason: *reason,
                })
                .collect(),
        }
    }

    /// Hints of all objects in the batch, in order
    pub fn hints(&self) -> impl Iterator<Item = &str> {
        self.objects
            .iter()
            .filter_map(|o| o.classification.as_ref())
            .map(|c| c.suggested_identification.as_str())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
