//! Route records and the display values derived from them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::geo::Position;

/// Shown for duration and distance while nothing is known.
pub const PLACEHOLDER: &str = "—";

/// A trip as stored in history.
///
/// Two routes are the same history entry when `from`, `to` and `date`
/// match; duration and distance are not part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Origin, as `lat,lon` or free text.
    pub from: String,
    /// Destination as entered by the user.
    pub to: String,
    /// Duration shown when the trip was sent, e.g. `"30 min"`.
    pub duration: String,
    /// Distance shown when the trip was sent, e.g. `"10.0 km"`.
    pub distance: String,
    /// Day the trip was sent.
    pub date: NaiveDate,
}

impl Route {
    /// Create a route record.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        info: &RouteInfo,
        date: NaiveDate,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            duration: info.duration.clone(),
            distance: info.distance.clone(),
            date,
        }
    }

    /// Whether `other` is the same history entry.
    #[must_use]
    pub fn same_trip(&self, other: &Route) -> bool {
        self.from == other.from && self.to == other.to && self.date == other.date
    }
}

/// Display-formatted duration and distance of the active route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    /// Remaining duration, e.g. `"12 min"`.
    pub duration: String,
    /// Remaining distance, e.g. `"3.40 km"`.
    pub distance: String,
}

impl RouteInfo {
    /// Create route info from display strings.
    #[must_use]
    pub fn new(duration: impl Into<String>, distance: impl Into<String>) -> Self {
        Self {
            duration: duration.into(),
            distance: distance.into(),
        }
    }

    /// The placeholder shown when no route is known.
    #[must_use]
    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER, PLACEHOLDER)
    }

    /// Check if this is the placeholder value.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.duration == PLACEHOLDER && self.distance == PLACEHOLDER
    }
}

impl Default for RouteInfo {
    fn default() -> Self {
        Self::placeholder()
    }
}

/// Successful answer to a route-info request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSummary {
    /// Total duration as formatted by the backend.
    pub duration: String,
    /// Total distance as formatted by the backend.
    pub distance: String,
    /// Route geometry; empty when the backend sent none.
    pub coordinates: Vec<Position>,
}

impl RouteSummary {
    /// Duration and distance as route info.
    #[must_use]
    pub fn info(&self) -> RouteInfo {
        RouteInfo::new(self.duration.clone(), self.distance.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_route_identity_ignores_duration() {
        let a = Route::new("45,9", "Duomo", &RouteInfo::new("30 min", "10.0 km"), date(2025, 10, 9));
        let b = Route::new("45,9", "Duomo", &RouteInfo::new("12 min", "4.0 km"), date(2025, 10, 9));
        let c = Route::new("45,9", "Duomo", &RouteInfo::new("30 min", "10.0 km"), date(2025, 10, 10));

        assert!(a.same_trip(&b));
        assert!(!a.same_trip(&c));
    }

    #[test]
    fn test_route_serializes_iso_date() {
        let route = Route::new("a", "b", &RouteInfo::placeholder(), date(2025, 10, 9));
        let json = serde_json::to_string(&route).unwrap();
        assert!(json.contains(r#""date":"2025-10-09""#));
    }

    #[test]
    fn test_placeholder() {
        let info = RouteInfo::default();
        assert!(info.is_placeholder());
        assert_eq!(info.duration, "—");
        assert!(!RouteInfo::new("5 min", PLACEHOLDER).is_placeholder());
    }

    #[test]
    fn test_summary_info() {
        let summary = RouteSummary {
            duration: "30 min".to_string(),
            distance: "10.0 km".to_string(),
            coordinates: vec![],
        };
        assert_eq!(summary.info(), RouteInfo::new("30 min", "10.0 km"));
    }
}
