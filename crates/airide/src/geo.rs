//! Distance engine.
//!
//! Pure great-circle computations over WGS84 coordinates (degrees).
//! Nothing here fails: NaN inputs propagate to NaN outputs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Default distance from a waypoint within which a position counts as
/// being on the route.
pub const SNAP_TOLERANCE_M: f64 = 40.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Position {
    /// Create a position from latitude and longitude.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in meters.
    #[must_use]
    pub fn distance_to(&self, other: &Position) -> f64 {
        haversine(self.lat, self.lon, other.lat, other.lon)
    }
}

impl From<[f64; 2]> for Position {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<Position> for [f64; 2] {
    fn from(p: Position) -> Self {
        [p.lat, p.lon]
    }
}

/// Formats as `lat,lon`, the form the backend expects for `start`.
impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// Error returned when a `lat,lon` string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected coordinates as 'lat,lon', got '{0}'")]
pub struct ParsePositionError(String);

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePositionError(s.to_string());
        let (lat, lon) = s.split_once(',').ok_or_else(err)?;
        let lat: f64 = lat.trim().parse().map_err(|_| err())?;
        let lon: f64 = lon.trim().parse().map_err(|_| err())?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(err());
        }
        Ok(Self { lat, lon })
    }
}

/// Haversine distance between two points in meters.
#[must_use]
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Index of the first segment start within `tolerance_m` of `current`.
///
/// Only segment starts are considered, so the final waypoint never snaps.
#[must_use]
pub fn snap_index(current: &Position, route: &[Position], tolerance_m: f64) -> Option<usize> {
    if route.len() < 2 {
        return None;
    }
    route[..route.len() - 1]
        .iter()
        .position(|p| current.distance_to(p) < tolerance_m)
}

/// Remaining route length in meters from the snapped segment to the end.
///
/// Returns 0 when `current` is not within `tolerance_m` of any segment
/// start: an unsnapped position is "not yet on route", so callers must not
/// expect a monotonic decrease before the first snap.
#[must_use]
pub fn remaining_distance(current: &Position, route: &[Position], tolerance_m: f64) -> f64 {
    let Some(start) = snap_index(current, route, tolerance_m) else {
        return 0.0;
    };
    route[start..]
        .windows(2)
        .map(|w| w[0].distance_to(&w[1]))
        .sum()
}

/// Distance to `route[next_index]` rounded to the nearest meter.
///
/// Returns 0 once `next_index` reaches the final waypoint.
#[must_use]
pub fn distance_to_next_step(current: &Position, route: &[Position], next_index: usize) -> f64 {
    if next_index + 1 >= route.len() {
        return 0.0;
    }
    current.distance_to(&route[next_index]).round()
}

/// Total length of a route in meters.
#[must_use]
pub fn route_length(route: &[Position]) -> f64 {
    route.windows(2).map(|w| w[0].distance_to(&w[1])).sum()
}

/// Format meters as kilometers with two decimals, e.g. `"1.25 km"`.
#[must_use]
pub fn format_km(meters: f64) -> String {
    format!("{:.2} km", meters / 1000.0)
}

/// Format a whole number of minutes, e.g. `"12 min"`.
#[must_use]
pub fn format_minutes(minutes: i64) -> String {
    format!("{minutes} min")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(lat: f64, lon: f64) -> Position {
        Position::new(lat, lon)
    }

    /// Points along the equator, `step_deg` apart (0.001 deg ~ 111 m).
    fn equator_route(n: usize, step_deg: f64) -> Vec<Position> {
        (0..n).map(|i| pt(0.0, i as f64 * step_deg)).collect()
    }

    #[test]
    fn haversine_same_point_is_zero() {
        assert!(haversine(45.0, 9.0, 45.0, 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn haversine_is_symmetric() {
        let pairs = [
            ((45.0, 9.0), (45.4642, 9.19)),
            ((-33.86, 151.2), (51.5, -0.12)),
            ((0.0, 179.9), (0.0, -179.9)),
        ];
        for ((a_lat, a_lon), (b_lat, b_lon)) in pairs {
            let ab = haversine(a_lat, a_lon, b_lat, b_lon);
            let ba = haversine(b_lat, b_lon, a_lat, a_lon);
            assert!((ab - ba).abs() < 1e-6, "{ab} != {ba}");
        }
    }

    #[test]
    fn haversine_known_distance() {
        // Milano Centrale to Piazza Duomo ~2.3 km
        let d = haversine(45.4862, 9.2042, 45.4642, 9.1900);
        assert!(d > 2_500.0 && d < 2_900.0, "got {d:.0} m");
    }

    #[test]
    fn haversine_nan_propagates() {
        assert!(haversine(f64::NAN, 0.0, 0.0, 0.0).is_nan());
    }

    #[test]
    fn remaining_distance_short_routes_are_zero() {
        let p = pt(0.0, 0.0);
        assert!(remaining_distance(&p, &[], SNAP_TOLERANCE_M).abs() < f64::EPSILON);
        assert!(remaining_distance(&p, &[p], SNAP_TOLERANCE_M).abs() < f64::EPSILON);
    }

    #[test]
    fn remaining_distance_unsnapped_is_zero() {
        let route = equator_route(3, 0.01);
        let far = pt(1.0, 1.0);
        assert!(remaining_distance(&far, &route, SNAP_TOLERANCE_M).abs() < f64::EPSILON);
    }

    #[test]
    fn remaining_distance_from_start_is_full_length() {
        let route = equator_route(4, 0.001);
        let total = route_length(&route);
        let remaining = remaining_distance(&route[0], &route, SNAP_TOLERANCE_M);
        assert!((remaining - total).abs() < 1e-6);
    }

    #[test]
    fn remaining_distance_is_non_increasing_along_route() {
        let route = equator_route(6, 0.001);
        let mut previous = f64::INFINITY;
        for p in &route[..route.len() - 1] {
            let remaining = remaining_distance(p, &route, SNAP_TOLERANCE_M);
            assert!(remaining <= previous, "{remaining} > {previous}");
            previous = remaining;
        }
    }

    #[test]
    fn remaining_distance_respects_tolerance() {
        let route = equator_route(3, 0.001);
        // ~33 m north of the first waypoint
        let near = pt(0.0003, 0.0);
        assert!(remaining_distance(&near, &route, SNAP_TOLERANCE_M) > 0.0);
        assert!(remaining_distance(&near, &route, 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn snap_index_ignores_final_waypoint() {
        let route = equator_route(3, 0.001);
        assert_eq!(snap_index(&route[1], &route, SNAP_TOLERANCE_M), Some(1));
        assert_eq!(snap_index(&route[2], &route, SNAP_TOLERANCE_M), None);
    }

    #[test]
    fn distance_to_next_step_rounds() {
        let route = equator_route(3, 0.001);
        let d = distance_to_next_step(&route[0], &route, 1);
        assert!((d - d.round()).abs() < f64::EPSILON);
        assert!(d > 100.0 && d < 120.0);
    }

    #[test]
    fn distance_to_next_step_zero_at_last_index() {
        let route = equator_route(3, 0.001);
        let p = pt(0.5, 0.5);
        assert!(distance_to_next_step(&p, &route, 2).abs() < f64::EPSILON);
        assert!(distance_to_next_step(&p, &route, 7).abs() < f64::EPSILON);
        assert!(distance_to_next_step(&p, &[], 0).abs() < f64::EPSILON);
    }

    #[test]
    fn position_parse_and_display() {
        let p: Position = "45.0, 9.5".parse().unwrap();
        assert_eq!(p, pt(45.0, 9.5));
        assert_eq!(p.to_string(), "45,9.5");

        assert!("Piazza Duomo".parse::<Position>().is_err());
        assert!("91,0".parse::<Position>().is_err());
        assert!("1,abc".parse::<Position>().is_err());
    }

    #[test]
    fn position_array_conversion() {
        let p = Position::from([45.0, 9.0]);
        let arr: [f64; 2] = p.into();
        assert_eq!(arr, [45.0, 9.0]);
    }

    #[test]
    fn format_helpers() {
        assert_eq!(format_km(1234.0), "1.23 km");
        assert_eq!(format_km(0.0), "0.00 km");
        assert_eq!(format_minutes(12), "12 min");
    }
}
