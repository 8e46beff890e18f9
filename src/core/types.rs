//! Core type definitions used throughout the codebase

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Simulation tick counter. Reset to zero at every task start; tick 1 is the
/// first tick a run produces.
pub type Tick = u64;

/// Identifier of a simulated object, unique within one task run
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identifier drawn from the caller's RNG, so seeded runs
    /// produce the same ids.
    pub fn fresh<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let uuid = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
        Self(uuid.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Category of a simulated object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Scripted,
    RadarNoise,
    Decoy,
    Drone,
    Rocket,
}

/// The five independently controllable simulation tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    RandomRadar,
    RandomRadarDecoy,
    MainSimulation,
    DroneAttack,
    RocketAttack,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::RandomRadar,
        TaskKind::RandomRadarDecoy,
        TaskKind::MainSimulation,
        TaskKind::DroneAttack,
        TaskKind::RocketAttack,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::RandomRadar => "random_radar",
            TaskKind::RandomRadarDecoy => "random_radar_decoy",
            TaskKind::MainSimulation => "main_simulation",
            TaskKind::DroneAttack => "drone_attack",
            TaskKind::RocketAttack => "rocket_attack",
        }
    }

    /// One-shot kinds complete on their own after a bounded sequence
    pub fn is_one_shot(self) -> bool {
        matches!(self, TaskKind::DroneAttack | TaskKind::RocketAttack)
    }

    /// Parse the console/control-surface names, including short aliases
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "random_radar" | "radar" => Some(TaskKind::RandomRadar),
            "random_radar_decoy" | "decoy" => Some(TaskKind::RandomRadarDecoy),
            "main_simulation" | "simulation" | "sim" => Some(TaskKind::MainSimulation),
            "drone_attack" | "drone" => Some(TaskKind::DroneAttack),
            "rocket_attack" | "rocket" => Some(TaskKind::RocketAttack),
            _ => None,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Geographic position: degrees latitude/longitude, altitude in meters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPosition {
    pub lat: f64,
    pub lon: f64,
    pub alt_m: f64,
}

impl GeoPosition {
    pub fn new(lat: f64, lon: f64, alt_m: f64) -> Self {
        Self { lat, lon, alt_m }
    }
}

/// Kinematic state attached to an object update
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    /// Ground speed in meters per second
    pub speed_mps: f64,
    /// Heading in degrees, 0 = north, clockwise
    pub heading_deg: f64,
    /// Vertical rate in meters per second
    pub climb_mps: f64,
}

pub const FEET_TO_METERS: f64 = 0.3048;
pub const KNOTS_TO_MPS: f64 = 0.514444;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_fresh_ids_follow_seed() {
        let mut a = ChaCha8Rng::seed_from_u64(7);
        let mut b = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(ObjectId::fresh(&mut a), ObjectId::fresh(&mut b));
        assert_ne!(ObjectId::fresh(&mut a), ObjectId::fresh(&mut a));
    }

    #[test]
    fn test_task_kind_names_round_trip() {
        for kind in TaskKind::ALL {
            assert_eq!(TaskKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(TaskKind::parse("Radar"), Some(TaskKind::RandomRadar));
        assert_eq!(TaskKind::parse("nope"), None);
    }

    #[test]
    fn test_only_attacks_are_one_shot() {
        let one_shot: Vec<_> = TaskKind::ALL.into_iter().filter(|k| k.is_one_shot()).collect();
        assert_eq!(one_shot, vec![TaskKind::DroneAttack, TaskKind::RocketAttack]);
    }
}
