//! Simulation configuration with documented defaults
//!
//! Values come from three layers, each optional:
//! 1. [`SimulationConfig::default`]
//! 2. a TOML file (`--config` or `TRACKSIM_CONFIG`)
//! 3. the environment variables `API_BASE_URL`, `OBJECTS_ENDPOINT`,
//!    `TICK_INTERVAL` and `INACTIVITY_TIMEOUT`
//!
//! A value that cannot be parsed or is out of range keeps the previous
//! layer's value and produces a warning. Configuration never prevents
//! startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::geo::BoundingPolygon;
use crate::core::types::{GeoPosition, FEET_TO_METERS};

/// Environment variable naming the TOML config file
pub const CONFIG_PATH_ENV: &str = "TRACKSIM_CONFIG";

/// Upper bound for the tick interval and request timeout, in seconds
const MAX_DURATION_SECS: f64 = 86_400.0;

const DEFAULT_TICK_INTERVAL_SECS: f64 = 1.0;
const DEFAULT_REQUEST_TIMEOUT_SECS: f64 = 5.0;

/// `secs` as a `Duration`, or `fallback` when it is not a usable interval
fn duration_or(secs: f64, fallback: f64) -> Duration {
    let secs = if is_duration(secs) { secs } else { fallback };
    Duration::from_secs_f64(secs)
}

/// Where batches are delivered
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    /// Base URL of the tracking service, without trailing slash
    pub base_url: String,

    /// Path appended to `base_url` for object batches
    pub objects_path: String,

    /// Path for one-time classification suggestions
    pub classify_path: String,

    /// Path for raw radar detections
    pub radar_point_path: String,

    /// Upper bound on one delivery attempt, in seconds
    ///
    /// Keeps a hung endpoint from stalling its task's loop for longer than
    /// a few ticks. Other tasks are never affected.
    pub request_timeout_secs: f64,
}

impl IngestConfig {
    fn join(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    pub fn objects_url(&self) -> String {
        self.join(&self.objects_path)
    }

    pub fn classify_url(&self) -> String {
        self.join(&self.classify_path)
    }

    pub fn radar_point_url(&self) -> String {
        self.join(&self.radar_point_path)
    }

    pub fn request_timeout(&self) -> Duration {
        duration_or(self.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS)
    }
}

/// Parameters shared by the radar-noise and decoy scatter tasks
#[derive(Debug, Clone, PartialEq)]
pub struct ScatterConfig {
    /// Objects per batch
    pub batch_size: usize,

    /// A new batch is emitted every this many ticks (first on tick 1)
    pub batch_every_ticks: u64,

    /// Area the points are scattered over
    pub polygon: BoundingPolygon,

    /// Altitude band in feet
    pub min_altitude_ft: f64,
    pub max_altitude_ft: f64,

    /// Classification hint attached to every object, if any
    pub classification: Option<String>,
}

impl ScatterConfig {
    pub fn altitude_band_m(&self) -> (f64, f64) {
        (
            self.min_altitude_ft * FEET_TO_METERS,
            self.max_altitude_ft * FEET_TO_METERS,
        )
    }
}

/// Scripted-flight replay
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    /// JSON file with the waypoint courses, loaded at task start
    pub dataset_path: PathBuf,

    /// Length cap for the position history carried with each object
    pub max_track_points: usize,
}

/// Drone attack profile: approach reports, a pause, then one finalized track
#[derive(Debug, Clone, PartialEq)]
pub struct DroneAttackConfig {
    /// Radar reports emitted before the track, in order
    pub approach: Vec<GeoPosition>,

    /// Ticks between consecutive approach reports
    pub report_interval_ticks: u64,

    /// Ticks between the last report and the finalized track
    pub track_delay_ticks: u64,

    /// Straight leg flown by the finalized track
    pub track_start: GeoPosition,
    pub track_end: GeoPosition,
    pub speed_kts: f64,

    /// Seconds of flight between consecutive points of the track history
    pub track_step_secs: f64,

    pub label: String,
    pub suggestion_reason: String,
}

/// Rocket attack profile: one ballistic arc sampled at a few points
#[derive(Debug, Clone, PartialEq)]
pub struct RocketAttackConfig {
    pub launch: GeoPosition,
    pub impact: GeoPosition,
    pub speed_kts: f64,

    /// Peak altitude of the arc in meters, reached mid-flight
    pub apex_altitude_m: f64,

    /// Number of points sampled along the arc (launch and impact included)
    pub samples: usize,

    pub label: String,
    pub suggestion_reason: String,
}

/// Configuration for the whole simulation engine
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub ingest: IngestConfig,

    /// Real time between ticks, in seconds
    pub tick_interval_secs: f64,

    /// Seconds without a refresh after which an object is retired
    ///
    /// Converted to ticks with [`SimulationConfig::inactivity_timeout_ticks`].
    pub inactivity_timeout_secs: f64,

    /// Seed for the random generators; `None` draws from OS entropy
    pub seed: Option<u64>,

    pub radar: ScatterConfig,
    pub decoy: ScatterConfig,
    pub scenario: ScenarioConfig,
    pub drone: DroneAttackConfig,
    pub rocket: RocketAttackConfig,
}

fn default_polygon() -> BoundingPolygon {
    // Southern Lebanon / Galilee panhandle box used by the radar feeds
    BoundingPolygon::rectangle(35.249634, 35.966492, 33.114549, 33.911454)
        .unwrap_or_else(|e| unreachable!("default polygon is valid: {e}"))
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let altitude_m = 5000.0 * FEET_TO_METERS;
        Self {
            ingest: IngestConfig {
                base_url: "http://localhost:3001".into(),
                objects_path: "/objects/temporary".into(),
                classify_path: "/objects/classify".into(),
                radar_point_path: "/objects/radar-point".into(),
                request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            },
            tick_interval_secs: DEFAULT_TICK_INTERVAL_SECS,
            inactivity_timeout_secs: 10.0,
            seed: None,
            radar: ScatterConfig {
                batch_size: 75,
                batch_every_ticks: 10,
                polygon: default_polygon(),
                min_altitude_ft: 1000.0,
                max_altitude_ft: 10000.0,
                classification: Some("radar_noise".into()),
            },
            decoy: ScatterConfig {
                batch_size: 50,
                batch_every_ticks: 10,
                polygon: default_polygon(),
                min_altitude_ft: 1000.0,
                max_altitude_ft: 10000.0,
                classification: None,
            },
            scenario: ScenarioConfig {
                dataset_path: PathBuf::from("simulated_flights.json"),
                max_track_points: 100,
            },
            drone: DroneAttackConfig {
                approach: vec![
                    GeoPosition::new(33.261657, 35.419922, altitude_m),
                    GeoPosition::new(33.251321, 35.427132, altitude_m),
                    GeoPosition::new(33.244143, 35.413399, altitude_m),
                    GeoPosition::new(33.233519, 35.429878, altitude_m),
                ],
                report_interval_ticks: 1,
                track_delay_ticks: 1,
                track_start: GeoPosition::new(33.236677, 35.430565, altitude_m),
                track_end: GeoPosition::new(33.038601, 35.437775, altitude_m),
                speed_kts: 80.0,
                track_step_secs: 10.0,
                label: "B149".into(),
                suggestion_reason: "Flight profile matches a drone: 5000 ft, 80 kt, converging heading"
                    .into(),
            },
            rocket: RocketAttackConfig {
                launch: GeoPosition::new(32.270878, 36.018677, 0.0),
                impact: GeoPosition::new(32.245329, 35.529785, 0.0),
                speed_kts: 300.0,
                apex_altitude_m: altitude_m,
                samples: 8,
                label: "Cruise missile".into(),
                suggestion_reason:
                    "High-speed projectile detected with ballistic trajectory characteristics"
                        .into(),
            },
        }
    }
}

impl SimulationConfig {
    /// Load defaults, then the TOML file (if any), then the process
    /// environment. Every problem is logged and skipped.
    pub fn load(path: Option<&Path>) -> Self {
        let mut config = Self::default();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        if let Some(path) = path {
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    for warning in config.apply_toml_str(&content) {
                        tracing::warn!(path = %path.display(), "{warning}");
                    }
                    tracing::info!(path = %path.display(), "Loaded configuration file");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Config file unreadable, using defaults");
                }
            }
        }

        for warning in config.apply_env(|key| std::env::var(key).ok()) {
            tracing::warn!("{warning}");
        }

        config
    }

    /// Real time between ticks
    pub fn tick_interval(&self) -> Duration {
        duration_or(self.tick_interval_secs, DEFAULT_TICK_INTERVAL_SECS)
    }

    /// Inactivity timeout expressed in whole ticks, rounded up
    pub fn inactivity_timeout_ticks(&self) -> u64 {
        (self.inactivity_timeout_secs / self.tick_interval().as_secs_f64()).ceil() as u64
    }

    /// Overlay values from TOML source text. Returns warnings for every
    /// value that was ignored.
    pub fn apply_toml_str(&mut self, content: &str) -> Vec<String> {
        match content.parse::<toml::Value>() {
            Ok(value) => self.apply_toml(&value),
            Err(e) => vec![format!("Invalid TOML, keeping defaults: {e}")],
        }
    }

    /// Overlay values from a parsed TOML document
    pub fn apply_toml(&mut self, root: &toml::Value) -> Vec<String> {
        let mut w = Vec::new();

        read_number(root, "tick_interval_secs", &mut self.tick_interval_secs, is_duration, &mut w);
        read_number(root, "inactivity_timeout_secs", &mut self.inactivity_timeout_secs, is_non_negative, &mut w);
        if let Some(value) = root.get("seed") {
            match value.as_integer().filter(|s| *s >= 0) {
                Some(seed) => self.seed = Some(seed as u64),
                None => w.push(format!("seed: expected a non-negative integer, got {value}")),
            }
        }

        if let Some(ingest) = root.get("ingest") {
            read_string(ingest, "base_url", &mut self.ingest.base_url, &mut w);
            read_string(ingest, "objects_path", &mut self.ingest.objects_path, &mut w);
            read_string(ingest, "classify_path", &mut self.ingest.classify_path, &mut w);
            read_string(ingest, "radar_point_path", &mut self.ingest.radar_point_path, &mut w);
            read_number(ingest, "request_timeout_secs", &mut self.ingest.request_timeout_secs, is_duration, &mut w);
        }

        if let Some(radar) = root.get("radar") {
            apply_scatter(radar, "radar", &mut self.radar, &mut w);
        }
        if let Some(decoy) = root.get("decoy") {
            apply_scatter(decoy, "decoy", &mut self.decoy, &mut w);
        }

        if let Some(scenario) = root.get("scenario") {
            let mut dataset = self.scenario.dataset_path.display().to_string();
            read_string(scenario, "dataset", &mut dataset, &mut w);
            self.scenario.dataset_path = PathBuf::from(dataset);
            read_count(scenario, "max_track_points", &mut self.scenario.max_track_points, 1, &mut w);
        }

        if let Some(drone) = root.get("drone") {
            let d = &mut self.drone;
            read_ticks(drone, "report_interval_ticks", &mut d.report_interval_ticks, &mut w);
            read_ticks(drone, "track_delay_ticks", &mut d.track_delay_ticks, &mut w);
            read_number(drone, "speed_kts", &mut d.speed_kts, is_positive, &mut w);
            read_number(drone, "track_step_secs", &mut d.track_step_secs, is_positive, &mut w);
            read_position(drone, "track_start", &mut d.track_start, &mut w);
            read_position(drone, "track_end", &mut d.track_end, &mut w);
            read_string(drone, "label", &mut d.label, &mut w);
            if let Some(list) = drone.get("approach") {
                match list.as_array().map(|items| items.iter().map(parse_position).collect::<Option<Vec<_>>>()) {
                    Some(Some(points)) if !points.is_empty() => d.approach = points,
                    _ => w.push("drone.approach: expected a non-empty list of [lat, lon, alt_m]".into()),
                }
            }
        }

        if let Some(rocket) = root.get("rocket") {
            let r = &mut self.rocket;
            read_position(rocket, "launch", &mut r.launch, &mut w);
            read_position(rocket, "impact", &mut r.impact, &mut w);
            read_number(rocket, "speed_kts", &mut r.speed_kts, is_positive, &mut w);
            read_number(rocket, "apex_altitude_m", &mut r.apex_altitude_m, is_non_negative, &mut w);
            read_count(rocket, "samples", &mut r.samples, 2, &mut w);
            read_string(rocket, "label", &mut r.label, &mut w);
        }

        w
    }

    /// Overlay the environment variables the deployment scripts set.
    /// `lookup` is usually `std::env::var(key).ok()`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut w = Vec::new();

        if let Some(url) = lookup("API_BASE_URL").filter(|s| !s.trim().is_empty()) {
            self.ingest.base_url = url.trim().to_string();
        }
        if let Some(path) = lookup("OBJECTS_ENDPOINT").filter(|s| !s.trim().is_empty()) {
            self.ingest.objects_path = path.trim().to_string();
        }
        if let Some(raw) = lookup("TICK_INTERVAL") {
            match raw.trim().parse::<f64>().ok().filter(|v| is_duration(*v)) {
                Some(v) => self.tick_interval_secs = v,
                None => w.push(format!(
                    "TICK_INTERVAL={raw:?} is not a usable number of seconds, using {}",
                    self.tick_interval_secs
                )),
            }
        }
        if let Some(raw) = lookup("INACTIVITY_TIMEOUT") {
            match raw.trim().parse::<f64>().ok().filter(|v| is_non_negative(*v)) {
                Some(v) => self.inactivity_timeout_secs = v,
                None => w.push(format!(
                    "INACTIVITY_TIMEOUT={raw:?} is not a non-negative number, using {}",
                    self.inactivity_timeout_secs
                )),
            }
        }

        w
    }
}

fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Positive, at most a day, and representable as a `Duration`
fn is_duration(v: f64) -> bool {
    is_positive(v) && v <= MAX_DURATION_SECS && Duration::try_from_secs_f64(v).is_ok()
}

fn is_non_negative(v: f64) -> bool {
    v.is_finite() && v >= 0.0
}

/// Numbers may be written as floats, integers or numeric strings
fn as_number(value: &toml::Value) -> Option<f64> {
    match value {
        toml::Value::Float(f) => Some(*f),
        toml::Value::Integer(i) => Some(*i as f64),
        toml::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn read_number(
    table: &toml::Value,
    key: &str,
    target: &mut f64,
    valid: fn(f64) -> bool,
    warnings: &mut Vec<String>,
) {
    if let Some(value) = table.get(key) {
        match as_number(value).filter(|v| valid(*v)) {
            Some(v) => *target = v,
            None => warnings.push(format!("{key}: invalid value {value}, using {target}")),
        }
    }
}

fn read_count(table: &toml::Value, key: &str, target: &mut usize, min: usize, warnings: &mut Vec<String>) {
    if let Some(value) = table.get(key) {
        match value.as_integer().filter(|v| *v >= min as i64) {
            Some(v) => *target = v as usize,
            None => warnings.push(format!("{key}: expected an integer >= {min}, using {target}")),
        }
    }
}

fn read_ticks(table: &toml::Value, key: &str, target: &mut u64, warnings: &mut Vec<String>) {
    if let Some(value) = table.get(key) {
        match value.as_integer().filter(|v| *v >= 1) {
            Some(v) => *target = v as u64,
            None => warnings.push(format!("{key}: expected a tick count >= 1, using {target}")),
        }
    }
}

fn read_string(table: &toml::Value, key: &str, target: &mut String, warnings: &mut Vec<String>) {
    if let Some(value) = table.get(key) {
        match value.as_str().filter(|s| !s.trim().is_empty()) {
            Some(s) => *target = s.trim().to_string(),
            None => warnings.push(format!("{key}: expected a non-empty string")),
        }
    }
}

/// `[lat, lon]` or `[lat, lon, alt_m]`
fn parse_position(value: &toml::Value) -> Option<GeoPosition> {
    let items = value.as_array()?;
    let numbers: Vec<f64> = items.iter().map(as_number).collect::<Option<_>>()?;
    let (lat, lon, alt) = match numbers.as_slice() {
        [lat, lon] => (*lat, *lon, 0.0),
        [lat, lon, alt] => (*lat, *lon, *alt),
        _ => return None,
    };
    let valid = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) && alt.is_finite();
    valid.then(|| GeoPosition::new(lat, lon, alt))
}

fn read_position(table: &toml::Value, key: &str, target: &mut GeoPosition, warnings: &mut Vec<String>) {
    if let Some(value) = table.get(key) {
        match parse_position(value) {
            // Keep the configured altitude when only lat/lon is given
            Some(pos) if value.as_array().map(Vec::len) == Some(2) => {
                *target = GeoPosition::new(pos.lat, pos.lon, target.alt_m)
            }
            Some(pos) => *target = pos,
            None => warnings.push(format!("{key}: expected [lat, lon] or [lat, lon, alt_m]")),
        }
    }
}

fn apply_scatter(table: &toml::Value, section: &str, target: &mut ScatterConfig, warnings: &mut Vec<String>) {
    let mut local = Vec::new();
    read_count(table, "batch_size", &mut target.batch_size, 0, &mut local);
    read_ticks(table, "batch_every_ticks", &mut target.batch_every_ticks, &mut local);
    read_number(table, "min_altitude_ft", &mut target.min_altitude_ft, is_non_negative, &mut local);
    read_number(table, "max_altitude_ft", &mut target.max_altitude_ft, is_non_negative, &mut local);
    if target.max_altitude_ft < target.min_altitude_ft {
        local.push(format!(
            "altitude band {}..{} ft is inverted, swapping",
            target.min_altitude_ft, target.max_altitude_ft
        ));
        std::mem::swap(&mut target.min_altitude_ft, &mut target.max_altitude_ft);
    }

    if let Some(value) = table.get("polygon") {
        let vertices = value.as_array().and_then(|items| {
            items
                .iter()
                .map(|pair| match pair.as_array().map(|p| p.iter().map(as_number).collect::<Option<Vec<_>>>()) {
                    Some(Some(v)) if v.len() == 2 => Some([v[0], v[1]]),
                    _ => None,
                })
                .collect::<Option<Vec<[f64; 2]>>>()
        });
        match vertices.map(|v| BoundingPolygon::from_lon_lat(&v)) {
            Some(Ok(polygon)) => target.polygon = polygon,
            Some(Err(e)) => local.push(format!("polygon: {e}, keeping previous polygon")),
            None => local.push("polygon: expected a list of [lon, lat] pairs".into()),
        }
    }

    warnings.extend(local.into_iter().map(|msg| format!("{section}.{msg}")));
}
