//! Error types for airide.
//!
//! This module defines the crate-wide error type plus the precondition
//! failures reported when a trip cannot be sent to the helmet.

use thiserror::Error;

/// The main error type for airide operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Backend Errors ===
    /// The HTTP request could not be sent or its body could not be read.
    #[error("request to navigation backend failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-OK status or an `error` field.
    #[error("navigation backend error ({status}): {message}")]
    Backend {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Error message, taken from the `error` field when present.
        message: String,
    },

    /// The instruction stream failed mid-flight.
    #[error("instruction stream failed: {0}")]
    Stream(String),

    /// A trip could not be sent.
    #[error("{0}")]
    Precondition(#[from] PreconditionError),

    // === Device Errors ===
    /// The geolocation source failed.
    #[error("geolocation error: {0}")]
    Geolocation(#[from] GeolocationError),

    /// The hardware link rejected a message.
    #[error("hardware link error: {0}")]
    Link(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for airide operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new backend error.
    #[must_use]
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    /// Create a new stream error.
    #[must_use]
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }

    /// Create a new hardware link error.
    #[must_use]
    pub fn link(message: impl Into<String>) -> Self {
        Self::Link(message.into())
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Why a trip could not be sent to the helmet.
///
/// The `Display` text is what the user sees.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionError {
    /// No destination has been entered.
    #[error("Enter a destination")]
    MissingDestination,

    /// The helmet link is reported disconnected.
    #[error("Bluetooth not connected")]
    LinkDisconnected,

    /// No origin coordinates are known yet.
    #[error("GPS position not available")]
    MissingOrigin,

    /// A trip is already streaming instructions.
    #[error("A trip is already in progress")]
    TripInProgress,
}

/// Errors raised by a geolocation source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeolocationError {
    /// The platform has no location capability.
    #[error("this device does not support GPS")]
    Unavailable,

    /// Location access was refused.
    #[error("location permission denied")]
    PermissionDenied,

    /// The watch failed for another reason.
    #[error("unable to get GPS position: {0}")]
    Watch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::backend(400, "Destinazione non valida");
        assert_eq!(
            err.to_string(),
            "navigation backend error (400): Destinazione non valida"
        );

        let err = Error::internal("boom");
        assert_eq!(err.to_string(), "internal error: boom");
    }

    #[test]
    fn test_precondition_messages_are_distinct() {
        let all = [
            PreconditionError::MissingDestination,
            PreconditionError::LinkDisconnected,
            PreconditionError::MissingOrigin,
            PreconditionError::TripInProgress,
        ];
        let messages: std::collections::HashSet<String> =
            all.iter().map(ToString::to_string).collect();
        assert_eq!(messages.len(), all.len());
    }

    #[test]
    fn test_from_geolocation_error() {
        let err: Error = GeolocationError::Unavailable.into();
        assert!(matches!(err, Error::Geolocation(GeolocationError::Unavailable)));
        assert!(err.to_string().contains("GPS"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "snap_tolerance_m must be positive".to_string(),
        };
        assert!(err.to_string().contains("snap_tolerance_m"));
    }
}
