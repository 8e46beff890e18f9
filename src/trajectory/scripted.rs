//! Scripted-flight replay
//!
//! Course `c` with `start_tick = s` shows waypoint `i` on tick `s + 1 + i`.
//! On the first tick after its last waypoint the course is retired with
//! [`RemovalReason::RouteComplete`]; it never goes through the inactivity
//! timeout. The generator is finished once every course has been retired.

use std::collections::VecDeque;

use crate::core::geo;
use crate::core::types::{GeoPosition, ObjectId, ObjectKind, Tick, Velocity};
use crate::simulation::object::{ObjectUpdate, RemovalReason};
use crate::trajectory::dataset::{Course, FlightDataset};
use crate::trajectory::{TickOutput, TrajectoryGenerator};

struct Replay {
    course: Course,
    id: ObjectId,
    history: VecDeque<GeoPosition>,
    complete: bool,
}

pub struct ScriptedFlights {
    replays: Vec<Replay>,
    tick_interval_secs: f64,
    max_track_points: usize,
}

impl ScriptedFlights {
    pub fn new(dataset: FlightDataset, tick_interval_secs: f64, max_track_points: usize) -> Self {
        let replays = dataset
            .courses
            .into_iter()
            .map(|course| Replay {
                id: ObjectId::new(course.id.clone()),
                course,
                history: VecDeque::new(),
                complete: false,
            })
            .collect();
        Self {
            replays,
            tick_interval_secs,
            max_track_points,
        }
    }

    /// Courses that have not reached the end of their route
    pub fn remaining(&self) -> usize {
        self.replays.iter().filter(|r| !r.complete).count()
    }

    fn velocity(&self, from: &GeoPosition, to: &GeoPosition) -> Velocity {
        let dt = self.tick_interval_secs.max(f64::EPSILON);
        Velocity {
            speed_mps: geo::distance_m(from, to) / dt,
            heading_deg: geo::bearing_deg(from, to),
            climb_mps: (to.alt_m - from.alt_m) / dt,
        }
    }
}

impl TrajectoryGenerator for ScriptedFlights {
    fn object_kind(&self) -> ObjectKind {
        ObjectKind::Scripted
    }

    fn produce(&mut self, tick: Tick) -> TickOutput {
        let mut out = TickOutput::empty();

        for i in 0..self.replays.len() {
            let replay = &self.replays[i];
            if replay.complete || tick <= replay.course.start_tick {
                continue;
            }

            let index = (tick - replay.course.start_tick - 1) as usize;
            let Some(waypoint) = replay.course.waypoints.get(index) else {
                let replay = &mut self.replays[i];
                replay.complete = true;
                out.retired.push((replay.id.clone(), RemovalReason::RouteComplete));
                continue;
            };

            let position = waypoint.position();
            let velocity = replay.history.back().map(|prev| self.velocity(prev, &position));

            let mut update = ObjectUpdate::new(replay.id.clone(), ObjectKind::Scripted, position)
                .with_track(replay.history.iter().copied().collect());
            if let Some(velocity) = velocity {
                update = update.with_velocity(velocity);
            }
            if let Some(hint) = replay.course.hint() {
                update = update.with_hint(hint);
            }
            if let Some(name) = &replay.course.name {
                update = update.with_label(name.clone());
            }
            out.updates.push(update);

            let cap = self.max_track_points;
            let replay = &mut self.replays[i];
            replay.history.push_back(position);
            while replay.history.len() > cap {
                replay.history.pop_front();
            }
        }

        out.finished = self.remaining() == 0;
        out
    }
}
