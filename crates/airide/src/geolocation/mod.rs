//! Continuous position subscription.
//!
//! A [`GeolocationSource`] pushes [`GeolocationEvent`]s into a channel until
//! it is stopped through its [`WatchHandle`] or the receiver goes away.

mod replay;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

pub use replay::ReplayGeolocation;

use crate::error::GeolocationError;
use crate::geo::Position;

/// One position reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    /// Where the device is.
    pub position: Position,
    /// When the reading was taken (monotonic clock).
    pub timestamp: Instant,
}

impl PositionFix {
    /// Create a fix taken now.
    #[must_use]
    pub fn now(position: Position) -> Self {
        Self {
            position,
            timestamp: Instant::now(),
        }
    }

    /// Create a fix with an explicit timestamp.
    #[must_use]
    pub fn at(position: Position, timestamp: Instant) -> Self {
        Self {
            position,
            timestamp,
        }
    }
}

/// What a geolocation source reports.
#[derive(Debug, Clone, PartialEq)]
pub enum GeolocationEvent {
    /// A new position.
    Fix(PositionFix),
    /// The watch failed.
    Error(GeolocationError),
}

/// A cloneable handle that stops a running source from another task.
#[derive(Debug, Clone)]
pub struct WatchHandle {
    stop_signal: Arc<AtomicBool>,
}

impl WatchHandle {
    /// Create a new handle.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stop_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signal the source to stop.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::SeqCst);
    }

    /// Check if the stop signal has been sent.
    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }
}

impl Default for WatchHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// A platform position feed.
#[async_trait::async_trait]
pub trait GeolocationSource: Send {
    /// Name of this source (for logging).
    fn name(&self) -> &'static str;

    /// Handle that stops this source once started.
    fn watch_handle(&self) -> WatchHandle;

    /// Run the watch, sending events through `tx` until stopped.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no location capability.
    async fn watch(&mut self, tx: mpsc::Sender<GeolocationEvent>) -> Result<(), GeolocationError>;
}

/// A device without any location capability.
#[derive(Debug, Default)]
pub struct UnavailableGeolocation {
    handle: WatchHandle,
}

impl UnavailableGeolocation {
    /// Create the source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl GeolocationSource for UnavailableGeolocation {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn watch_handle(&self) -> WatchHandle {
        self.handle.clone()
    }

    async fn watch(&mut self, _tx: mpsc::Sender<GeolocationEvent>) -> Result<(), GeolocationError> {
        Err(GeolocationError::Unavailable)
    }
}
