//! Scripted-flight dataset
//!
//! A JSON array of courses. Field aliases accept course exports that use
//! `_id`, `object_type`, `points` and `altitude` (feet).

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::core::error::{Result, SimError};
use crate::core::types::{GeoPosition, FEET_TO_METERS};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Waypoint {
    pub lat: f64,
    pub lon: f64,
    #[serde(default, alias = "altitude")]
    pub altitude_ft: f64,
}

impl Waypoint {
    pub fn position(&self) -> GeoPosition {
        GeoPosition::new(self.lat, self.lon, self.altitude_ft * FEET_TO_METERS)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Course {
    #[serde(alias = "_id")]
    pub id: String,

    /// Display name, e.g. a callsign
    #[serde(default)]
    pub name: Option<String>,

    /// Platform type such as "jet" or "helicopter"
    #[serde(default, alias = "object_type")]
    pub platform: Option<String>,

    /// Explicit classification hint; wins over `platform`
    #[serde(default)]
    pub classification: Option<String>,

    /// Ticks to wait before the first waypoint is shown
    #[serde(default)]
    pub start_tick: u64,

    #[serde(alias = "points")]
    pub waypoints: Vec<Waypoint>,
}

impl Course {
    pub fn hint(&self) -> Option<&str> {
        self.classification.as_deref().or(self.platform.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlightDataset {
    pub courses: Vec<Course>,
}

impl FlightDataset {
    /// Read and validate a dataset file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SimError::dataset(path, format!("cannot read file: {e}")))?;
        let courses: Vec<Course> = serde_json::from_str(&content)
            .map_err(|e| SimError::dataset(path, format!("malformed JSON: {e}")))?;

        let dataset = Self { courses };
        dataset
            .validate()
            .map_err(|reason| SimError::dataset(path, reason))?;

        tracing::info!(
            path = %path.display(),
            courses = dataset.courses.len(),
            waypoints = dataset.total_waypoints(),
            "Loaded scripted-flight dataset"
        );
        Ok(dataset)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.courses.is_empty() {
            return Err("dataset contains no courses".into());
        }

        let mut seen = HashSet::new();
        for (idx, course) in self.courses.iter().enumerate() {
            if course.id.trim().is_empty() {
                return Err(format!("course #{idx} has an empty id"));
            }
            if !seen.insert(course.id.as_str()) {
                return Err(format!("course id {:?} appears more than once", course.id));
            }
            if course.waypoints.is_empty() {
                return Err(format!("course {:?} has no waypoints", course.id));
            }
            for (n, wp) in course.waypoints.iter().enumerate() {
                let valid = (-90.0..=90.0).contains(&wp.lat)
                    && (-180.0..=180.0).contains(&wp.lon)
                    && wp.altitude_ft.is_finite();
                if !valid {
                    return Err(format!(
                        "course {:?} waypoint {n} is out of range ({}, {}, {} ft)",
                        course.id, wp.lat, wp.lon, wp.altitude_ft
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn total_waypoints(&self) -> usize {
        self.courses.iter().map(|c| c.waypoints.len()).sum()
    }
}
