//! Random scatter inside a bounding polygon
//!
//! Drives both the radar-noise and the decoy task. Every
//! `batch_every_ticks` ticks, starting on tick 1, a batch of
//! `batch_size` fresh objects is scattered over the polygon and the previous
//! batch is retired as superseded. Objects are not refreshed between
//! batches.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::ScatterConfig;
use crate::core::types::{ObjectId, ObjectKind, Tick};
use crate::simulation::object::{ObjectUpdate, RemovalReason};
use crate::trajectory::{TickOutput, TrajectoryGenerator};

pub struct ScatterNoise {
    kind: ObjectKind,
    config: ScatterConfig,
    rng: ChaCha8Rng,
    current_batch: Vec<ObjectId>,
}

impl ScatterNoise {
    pub fn new(kind: ObjectKind, config: ScatterConfig, rng: ChaCha8Rng) -> Self {
        Self {
            kind,
            config,
            rng,
            current_batch: Vec::new(),
        }
    }

    fn is_batch_tick(&self, tick: Tick) -> bool {
        let every = self.config.batch_every_ticks.max(1);
        tick >= 1 && (tick - 1) % every == 0
    }

    fn scatter(&mut self) -> Vec<ObjectUpdate> {
        let (low, high) = self.config.altitude_band_m();
        let (low, high) = (low.min(high), low.max(high));

        let mut batch = Vec::with_capacity(self.config.batch_size);
        for _ in 0..self.config.batch_size {
            let alt_m = if high > low { self.rng.gen_range(low..=high) } else { low };
            let position = self.config.polygon.sample(&mut self.rng, alt_m);
            let mut update = ObjectUpdate::new(ObjectId::fresh(&mut self.rng), self.kind, position);
            if let Some(hint) = &self.config.classification {
                update = update.with_hint(hint.clone());
            }
            batch.push(update);
        }
        batch
    }
}

impl TrajectoryGenerator for ScatterNoise {
    fn object_kind(&self) -> ObjectKind {
        self.kind
    }

    fn produce(&mut self, tick: Tick) -> TickOutput {
        if !self.is_batch_tick(tick) {
            return TickOutput::empty();
        }

        let retired = self
            .current_batch
            .drain(..)
            .map(|id| (id, RemovalReason::Superseded))
            .collect();
        let updates = self.scatter();
        self.current_batch = updates.iter().map(|u| u.id.clone()).collect();

        tracing::debug!(kind = ?self.kind, tick, objects = updates.len(), "Scattered batch");
        TickOutput {
            updates,
            retired,
            ..TickOutput::empty()
        }
    }
}
