//! Rocket attack profile: a single ballistic arc emitted on tick 1

use rand_chacha::ChaCha8Rng;

use crate::core::config::RocketAttackConfig;
use crate::core::geo;
use crate::core::types::{GeoPosition, ObjectId, ObjectKind, Tick, Velocity, KNOTS_TO_MPS};
use crate::simulation::object::ObjectUpdate;
use crate::trajectory::{TickOutput, TrajectoryGenerator};

pub const ROCKET_HINT: &str = "rocket";

pub struct RocketAttack {
    config: RocketAttackConfig,
    rng: ChaCha8Rng,
    done: bool,
}

impl RocketAttack {
    pub fn new(config: RocketAttackConfig, rng: ChaCha8Rng) -> Self {
        Self {
            config,
            rng,
            done: false,
        }
    }

    /// Arc sampled at evenly spaced fractions of the ground distance.
    /// Altitude is the launch/impact interpolation plus a parabolic bump
    /// that reaches `apex_altitude_m` at the midpoint.
    pub fn arc(&self) -> Vec<GeoPosition> {
        let cfg = &self.config;
        let n = cfg.samples.max(2);
        let total = geo::distance_m(&cfg.launch, &cfg.impact);
        let bearing = geo::bearing_deg(&cfg.launch, &cfg.impact);

        (0..n)
            .map(|i| {
                let f = i as f64 / (n - 1) as f64;
                let ground = match i {
                    0 => cfg.launch,
                    i if i == n - 1 => cfg.impact,
                    _ => geo::destination(&cfg.launch, bearing, total * f),
                };
                let base = cfg.launch.alt_m + (cfg.impact.alt_m - cfg.launch.alt_m) * f;
                GeoPosition::new(ground.lat, ground.lon, base + cfg.apex_altitude_m * 4.0 * f * (1.0 - f))
            })
            .collect()
    }

    fn finalized_track(&mut self) -> ObjectUpdate {
        let mut history = self.arc();
        let impact = history.pop().unwrap_or(self.config.impact);
        let speed_mps = self.config.speed_kts * KNOTS_TO_MPS;

        let velocity = match history.last() {
            Some(prev) => {
                let segment_m = geo::distance_m(prev, &impact);
                let seconds = segment_m / speed_mps.max(f64::EPSILON);
                Velocity {
                    speed_mps,
                    heading_deg: geo::bearing_deg(prev, &impact),
                    climb_mps: if seconds > 0.0 { (impact.alt_m - prev.alt_m) / seconds } else { 0.0 },
                }
            }
            None => Velocity {
                speed_mps,
                heading_deg: geo::bearing_deg(&self.config.launch, &self.config.impact),
                climb_mps: 0.0,
            },
        };

        ObjectUpdate::new(ObjectId::fresh(&mut self.rng), ObjectKind::Rocket, impact)
            .with_velocity(velocity)
            .with_hint(ROCKET_HINT)
            .with_reason(self.config.suggestion_reason.clone())
            .with_label(self.config.label.clone())
            .with_track(history)
    }
}

impl TrajectoryGenerator for RocketAttack {
    fn object_kind(&self) -> ObjectKind {
        ObjectKind::Rocket
    }

    fn produce(&mut self, tick: Tick) -> TickOutput {
        if self.done {
            return TickOutput {
                finished: true,
                ..TickOutput::empty()
            };
        }
        self.done = true;
        let track = self.finalized_track();
        tracing::info!(tick, points = track.track.len() + 1, "Rocket track emitted");
        TickOutput {
            updates: vec![track],
            finished: true,
            ..TickOutput::empty()
        }
    }
}
