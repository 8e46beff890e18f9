//! Great-circle helpers and bounding polygons
//!
//! Positions are handled as `geo::Point`s with x = longitude, y = latitude.

use geo::{
    Area, BoundingRect, Contains, HaversineBearing, HaversineDestination, HaversineDistance,
    InteriorPoint, LineString, Point, Polygon, Rect,
};
use rand::Rng;

use crate::core::types::GeoPosition;

/// Rejection-sampling attempts per point before falling back
const MAX_SAMPLE_ATTEMPTS: usize = 10_000;

/// Smallest accepted polygon area as a share of its bounding box.
/// At this floor a sample still lands inside on 1% of attempts.
const MIN_FILL_RATIO: f64 = 0.01;

fn point(pos: &GeoPosition) -> Point<f64> {
    Point::new(pos.lon, pos.lat)
}

/// Surface distance between two positions in meters (altitude ignored)
pub fn distance_m(from: &GeoPosition, to: &GeoPosition) -> f64 {
    point(from).haversine_distance(&point(to))
}

/// Initial bearing from `from` to `to` in degrees, normalized to [0, 360)
pub fn bearing_deg(from: &GeoPosition, to: &GeoPosition) -> f64 {
    if from.lat == to.lat && from.lon == to.lon {
        return 0.0;
    }
    point(from).haversine_bearing(point(to)).rem_euclid(360.0)
}

/// Position reached after travelling `distance_m` along `bearing_deg`.
/// Altitude is carried over unchanged.
pub fn destination(from: &GeoPosition, bearing_deg: f64, distance_m: f64) -> GeoPosition {
    let dest = point(from).haversine_destination(bearing_deg, distance_m);
    GeoPosition::new(dest.y(), dest.x(), from.alt_m)
}

/// Map rotation used by the ingestion display: heading minus 90 degrees
pub fn rotation_from_heading(heading_deg: f64) -> f64 {
    heading_deg - 90.0
}

/// Area that random targets are scattered over
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingPolygon {
    polygon: Polygon<f64>,
    bounds: Rect<f64>,
    interior: Point<f64>,
}

impl BoundingPolygon {
    /// Build from `[lon, lat]` vertices. The ring is closed automatically.
    pub fn from_lon_lat(vertices: &[[f64; 2]]) -> Result<Self, String> {
        if vertices.len() < 3 {
            return Err(format!(
                "polygon needs at least 3 vertices, got {}",
                vertices.len()
            ));
        }
        if vertices.iter().flatten().any(|v| !v.is_finite()) {
            return Err("polygon vertices must be finite".into());
        }

        let ring: Vec<(f64, f64)> = vertices.iter().map(|[lon, lat]| (*lon, *lat)).collect();
        let polygon = Polygon::new(LineString::from(ring), vec![]);
        let area = polygon.unsigned_area();
        if area <= f64::EPSILON {
            return Err("polygon has zero area".into());
        }
        let bounds = polygon
            .bounding_rect()
            .ok_or_else(|| "polygon has no bounding box".to_string())?;
        if area / bounds.unsigned_area() < MIN_FILL_RATIO {
            return Err(format!(
                "polygon is too thin to sample: it covers {:.4}% of its bounding box",
                area / bounds.unsigned_area() * 100.0
            ));
        }
        let interior = polygon
            .interior_point()
            .ok_or_else(|| "polygon has no interior point".to_string())?;

        Ok(Self {
            polygon,
            bounds,
            interior,
        })
    }

    /// Axis-aligned rectangle given as min/max longitude and latitude
    pub fn rectangle(min_lon: f64, max_lon: f64, min_lat: f64, max_lat: f64) -> Result<Self, String> {
        Self::from_lon_lat(&[
            [min_lon, min_lat],
            [max_lon, min_lat],
            [max_lon, max_lat],
            [min_lon, max_lat],
        ])
    }

    pub fn contains(&self, pos: &GeoPosition) -> bool {
        self.polygon.contains(&point(pos))
    }

    /// Vertices as `[lon, lat]` pairs, without the closing vertex
    pub fn vertices(&self) -> Vec<[f64; 2]> {
        let coords: Vec<[f64; 2]> = self
            .polygon
            .exterior()
            .coords()
            .map(|c| [c.x, c.y])
            .collect();
        coords[..coords.len().saturating_sub(1)].to_vec()
    }

    /// Uniformly sample a surface point inside the polygon.
    ///
    /// If every attempt misses, the polygon's interior point is used so a
    /// batch always has its full size.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, alt_m: f64) -> GeoPosition {
        let min = self.bounds.min();
        let max = self.bounds.max();
        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let lon = rng.gen_range(min.x..=max.x);
            let lat = rng.gen_range(min.y..=max.y);
            let candidate = GeoPosition::new(lat, lon, alt_m);
            if self.contains(&candidate) {
                return candidate;
            }
        }
        tracing::warn!("Polygon sampling missed every attempt, using the interior point");
        GeoPosition::new(self.interior.y(), self.interior.x(), alt_m)
    }
}
