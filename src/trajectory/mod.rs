//! Trajectory generators
//!
//! One generator per task kind. A generator is owned by its run loop and
//! asked once per tick for the object updates of that tick:
//!
//! | task kind            | generator                     | ends by itself |
//! |----------------------|-------------------------------|----------------|
//! | `random_radar`       | [`ScatterNoise`] (radar)      | no             |
//! | `random_radar_decoy` | [`ScatterNoise`] (decoy)      | no             |
//! | `main_simulation`    | [`ScriptedFlights`]           | when all routes end |
//! | `drone_attack`       | [`DroneAttack`]               | after the track |
//! | `rocket_attack`      | [`RocketAttack`]              | after the track |

pub mod dataset;
pub mod drone;
pub mod radar;
pub mod rocket;
pub mod scripted;

pub use dataset::{Course, FlightDataset, Waypoint};
pub use drone::DroneAttack;
pub use radar::ScatterNoise;
pub use rocket::RocketAttack;
pub use scripted::ScriptedFlights;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::geo;
use crate::core::types::{GeoPosition, ObjectId, ObjectKind, TaskKind, Tick};
use crate::simulation::object::{ObjectUpdate, RemovalReason};

/// Everything a generator has to say about one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutput {
    pub updates: Vec<ObjectUpdate>,
    /// Objects the generator is done with, removed outside the timeout path
    pub retired: Vec<(ObjectId, RemovalReason)>,
    /// Raw radar detections, delivered on their own and never tracked
    pub radar_points: Vec<GeoPosition>,
    /// The task has nothing more to produce
    pub finished: bool,
}

impl TickOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    /// No change to the tracked set. Radar points do not count.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.retired.is_empty()
    }
}

/// Produces the object updates of one task, tick by tick
pub trait TrajectoryGenerator: Send {
    /// Category of the objects this generator emits
    fn object_kind(&self) -> ObjectKind;

    /// Updates for `tick`. Ticks are passed in order starting at 1.
    fn produce(&mut self, tick: Tick) -> TickOutput;
}

/// Build the generator for `kind`.
///
/// The scripted dataset is read and validated here, so a missing or broken
/// file fails the start instead of the first tick.
pub fn build_generator(kind: TaskKind, config: &SimulationConfig) -> Result<Box<dyn TrajectoryGenerator>> {
    let rng = task_rng(kind, config.seed);
    let generator: Box<dyn TrajectoryGenerator> = match kind {
        TaskKind::RandomRadar => Box::new(ScatterNoise::new(ObjectKind::RadarNoise, config.radar.clone(), rng)),
        TaskKind::RandomRadarDecoy => Box::new(ScatterNoise::new(ObjectKind::Decoy, config.decoy.clone(), rng)),
        TaskKind::MainSimulation => {
            let dataset = FlightDataset::load(&config.scenario.dataset_path)?;
            Box::new(ScriptedFlights::new(
                dataset,
                config.tick_interval_secs,
                config.scenario.max_track_points,
            ))
        }
        TaskKind::DroneAttack => Box::new(DroneAttack::new(
            config.drone.clone(),
            config.scenario.max_track_points,
            rng,
        )),
        TaskKind::RocketAttack => Box::new(RocketAttack::new(config.rocket.clone(), rng)),
    };
    Ok(generator)
}

/// Per-task RNG. With a seed, every kind gets its own ChaCha stream so
/// radar and decoy batches never mirror each other.
fn task_rng(kind: TaskKind, seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(kind as u64);
            rng
        }
        None => ChaCha8Rng::from_entropy(),
    }
}

/// Points along the great circle from `start` towards `end`, one every
/// `step_m` meters, starting with `start` and stopping before `end`.
/// At most `max_points` are returned.
pub fn sample_leg(start: &GeoPosition, end: &GeoPosition, step_m: f64, max_points: usize) -> Vec<GeoPosition> {
    let mut points = Vec::new();
    if step_m <= 0.0 || max_points == 0 {
        return points;
    }

    let mut current = *start;
    while points.len() < max_points {
        points.push(current);
        if geo::distance_m(&current, end) <= step_m {
            break;
        }
        let bearing = geo::bearing_deg(&current, end);
        current = geo::destination(&current, bearing, step_m);
    }
    points
}
