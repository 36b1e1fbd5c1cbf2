//! Client side of the navigation backend.
//!
//! The backend answers three calls: a one-shot route query, a long-lived
//! `text/event-stream` of turn-by-turn instructions, and a fire-and-forget
//! position update. [`NavigationBackend`] is the seam the trip tracker
//! talks to; [`HttpBackend`] is the real implementation.

mod http;
pub mod sse;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

pub use http::HttpBackend;

use crate::error::{Error, Result};
use crate::geo::Position;
use crate::route::RouteSummary;

/// One instruction pushed by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstructionEvent {
    /// Instruction text, e.g. "Svolta a destra".
    #[serde(rename = "testo", default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Distance to the maneuver in meters, when the backend knows it.
    #[serde(rename = "metri", default, skip_serializing_if = "Option::is_none")]
    pub meters: Option<f64>,
}

impl InstructionEvent {
    /// Create an event carrying only text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            meters: None,
        }
    }

    /// Check if the text contains `phrase`.
    #[must_use]
    pub fn contains(&self, phrase: &str) -> bool {
        self.text.as_deref().is_some_and(|t| t.contains(phrase))
    }
}

/// Instructions in arrival order. The stream ending means the backend
/// closed it; an `Err` item means it broke.
pub type InstructionStream = BoxStream<'static, Result<InstructionEvent>>;

/// Body of a `/route_info` response.
#[derive(Debug, Deserialize)]
struct RouteInfoResponse {
    duration: Option<String>,
    distance: Option<String>,
    #[serde(default)]
    coordinates: Vec<Position>,
    error: Option<String>,
}

/// Body of a `/update_position` request.
#[derive(Debug, Serialize)]
struct PositionUpdate {
    lat: f64,
    lon: f64,
}

/// Decode a `/route_info` answer.
///
/// A non-OK status or an `error` field is a failure, as is a body without
/// both duration and distance.
///
/// # Errors
///
/// Returns [`Error::Backend`] for rejected requests and [`Error::Json`] for
/// malformed bodies on an OK status.
pub fn decode_route_info(status: u16, body: &str) -> Result<RouteSummary> {
    let ok = (200..300).contains(&status);

    let parsed = match serde_json::from_str::<RouteInfoResponse>(body) {
        Ok(parsed) => parsed,
        Err(_) if !ok => return Err(Error::backend(status, "route request failed")),
        Err(e) => return Err(e.into()),
    };

    if let Some(message) = parsed.error {
        return Err(Error::backend(status, message));
    }
    if !ok {
        return Err(Error::backend(status, "route request failed"));
    }

    match (parsed.duration, parsed.distance) {
        (Some(duration), Some(distance)) => Ok(RouteSummary {
            duration,
            distance,
            coordinates: parsed.coordinates,
        }),
        _ => Err(Error::backend(status, "response is missing duration or distance")),
    }
}

/// The navigation backend as seen by the trip tracker.
#[async_trait::async_trait]
pub trait NavigationBackend: Send + Sync {
    /// Fetch duration, distance and geometry for a trip.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-OK status, or an
    /// `error` field in the answer.
    async fn route_info(&self, start: Position, end: &str) -> Result<RouteSummary>;

    /// Open the instruction stream for a trip.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be opened.
    async fn open_stream(&self, start: Position, end: &str) -> Result<InstructionStream>;

    /// Report the current position.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure. Callers only log it.
    async fn update_position(&self, position: Position) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_route_info_success() {
        let body = r#"{
            "duration": "30 min",
            "distance": "10.0 km",
            "coordinates": [
                {"lat": 45.0, "lon": 9.0},
                {"lat": 45.1, "lon": 9.1},
                {"lat": 45.4642, "lon": 9.19}
            ]
        }"#;
        let summary = decode_route_info(200, body).unwrap();
        assert_eq!(summary.duration, "30 min");
        assert_eq!(summary.distance, "10.0 km");
        assert_eq!(summary.coordinates.len(), 3);
        assert_eq!(summary.coordinates[2], Position::new(45.4642, 9.19));
    }

    #[test]
    fn test_decode_route_info_without_coordinates() {
        let summary = decode_route_info(200, r#"{"duration": "5 min", "distance": "1.2 km"}"#).unwrap();
        assert!(summary.coordinates.is_empty());
    }

    #[test]
    fn test_decode_route_info_error_field() {
        let err = decode_route_info(400, r#"{"error": "Destinazione non valida"}"#).unwrap_err();
        assert!(matches!(err, Error::Backend { status: 400, .. }));
        assert!(err.to_string().contains("Destinazione non valida"));
    }

    #[test]
    fn test_decode_route_info_error_field_with_ok_status() {
        let err = decode_route_info(200, r#"{"error": "Nessuna rotta trovata"}"#).unwrap_err();
        assert!(err.to_string().contains("Nessuna rotta trovata"));
    }

    #[test]
    fn test_decode_route_info_non_json_failure() {
        let err = decode_route_info(502, "<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, Error::Backend { status: 502, .. }));
    }

    #[test]
    fn test_decode_route_info_malformed_ok_body() {
        assert!(matches!(decode_route_info(200, "not json"), Err(Error::Json(_))));
    }

    #[test]
    fn test_decode_route_info_missing_fields() {
        assert!(decode_route_info(200, r#"{"duration": "5 min"}"#).is_err());
    }

    #[test]
    fn test_instruction_event_wire_names() {
        let event: InstructionEvent =
            serde_json::from_str(r#"{"testo": "Svolta a destra", "metri": 120, "freccia": 0}"#).unwrap();
        assert_eq!(event.text.as_deref(), Some("Svolta a destra"));
        assert_eq!(event.meters, Some(120.0));

        let empty: InstructionEvent = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, InstructionEvent::default());
    }

    #[test]
    fn test_instruction_event_contains() {
        assert!(InstructionEvent::text("Percorso completato 🎉").contains("Percorso completato"));
        assert!(!InstructionEvent::default().contains("Percorso completato"));
    }

    #[test]
    fn test_position_update_body() {
        let body = serde_json::to_string(&PositionUpdate { lat: 45.0, lon: 9.5 }).unwrap();
        assert_eq!(body, r#"{"lat":45.0,"lon":9.5}"#);
    }
}
