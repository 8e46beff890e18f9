//! Drone attack profile
//!
//! Timeline, with `n` approach reports, interval `r` and delay `d`:
//! - ticks `1, 1 + r, .., 1 + (n-1)r`: one raw radar point each, sent to
//!   the radar-point endpoint and never tracked
//! - tick `1 + (n-1)r + d`: the finalized track, hinted `"drone"`
//!
//! The finalized track is a straight leg at constant speed; its history is
//! the leg sampled every `track_step_secs` of flight.

use rand_chacha::ChaCha8Rng;

use crate::core::config::DroneAttackConfig;
use crate::core::geo;
use crate::core::types::{ObjectId, ObjectKind, Tick, Velocity, KNOTS_TO_MPS};
use crate::simulation::object::ObjectUpdate;
use crate::trajectory::{sample_leg, TickOutput, TrajectoryGenerator};

pub const DRONE_HINT: &str = "drone";

pub struct DroneAttack {
    config: DroneAttackConfig,
    max_track_points: usize,
    rng: ChaCha8Rng,
    done: bool,
}

impl DroneAttack {
    pub fn new(config: DroneAttackConfig, max_track_points: usize, rng: ChaCha8Rng) -> Self {
        Self {
            config,
            max_track_points,
            rng,
            done: false,
        }
    }

    /// Tick on which the finalized track goes out
    pub fn track_tick(&self) -> Tick {
        let reports = self.config.approach.len() as u64;
        let interval = self.config.report_interval_ticks.max(1);
        let last_report = 1 + reports.saturating_sub(1) * interval;
        let delay = self.config.track_delay_ticks.max(1);
        if reports == 0 {
            1
        } else {
            last_report + delay
        }
    }

    fn report_index(&self, tick: Tick) -> Option<usize> {
        let interval = self.config.report_interval_ticks.max(1);
        if tick == 0 || (tick - 1) % interval != 0 {
            return None;
        }
        let index = ((tick - 1) / interval) as usize;
        (index < self.config.approach.len()).then_some(index)
    }

    fn finalized_track(&mut self) -> ObjectUpdate {
        let cfg = &self.config;
        let speed_mps = cfg.speed_kts * KNOTS_TO_MPS;
        let step_m = speed_mps * cfg.track_step_secs;
        let history = sample_leg(&cfg.track_start, &cfg.track_end, step_m, self.max_track_points);

        let velocity = Velocity {
            speed_mps,
            heading_deg: geo::bearing_deg(&cfg.track_start, &cfg.track_end),
            climb_mps: 0.0,
        };

        ObjectUpdate::new(ObjectId::fresh(&mut self.rng), ObjectKind::Drone, cfg.track_end)
            .with_velocity(velocity)
            .with_hint(DRONE_HINT)
            .with_reason(cfg.suggestion_reason.clone())
            .with_label(cfg.label.clone())
            .with_track(history)
    }
}

impl TrajectoryGenerator for DroneAttack {
    fn object_kind(&self) -> ObjectKind {
        ObjectKind::Drone
    }

    fn produce(&mut self, tick: Tick) -> TickOutput {
        if self.done {
            return TickOutput {
                finished: true,
                ..TickOutput::empty()
            };
        }

        let mut out = TickOutput::empty();
        if let Some(index) = self.report_index(tick) {
            out.radar_points.push(self.config.approach[index]);
            tracing::debug!(tick, report = index + 1, "Drone approach report");
        }

        if tick >= self.track_tick() {
            out.updates.push(self.finalized_track());
            out.finished = true;
            self.done = true;
            tracing::info!(tick, label = %self.config.label, "Drone track finalized");
        }
        out
    }
}
