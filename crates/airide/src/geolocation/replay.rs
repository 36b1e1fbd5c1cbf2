//! Simulated position feed that replays a recorded track.

use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, trace};

use super::{GeolocationEvent, GeolocationSource, PositionFix, WatchHandle};
use crate::error::{Error, GeolocationError, Result};
use crate::geo::Position;

/// Replays positions at a fixed interval, one fix per tick.
#[derive(Debug)]
pub struct ReplayGeolocation {
    track: Vec<Position>,
    interval: Duration,
    handle: WatchHandle,
}

impl ReplayGeolocation {
    /// Create a replay of `track`.
    #[must_use]
    pub fn new(track: Vec<Position>, interval: Duration) -> Self {
        Self {
            track,
            interval,
            handle: WatchHandle::new(),
        }
    }

    /// Load a track from a JSON array of `{"lat": .., "lon": ..}` objects.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>, interval: Duration) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let track: Vec<Position> = serde_json::from_str(&data)?;
        if track.is_empty() {
            return Err(Error::internal(format!(
                "replay track {} is empty",
                path.as_ref().display()
            )));
        }
        Ok(Self::new(track, interval))
    }

    /// Number of fixes in the track.
    #[must_use]
    pub fn len(&self) -> usize {
        self.track.len()
    }

    /// Check if the track is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.track.is_empty()
    }
}

#[async_trait::async_trait]
impl GeolocationSource for ReplayGeolocation {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn watch_handle(&self) -> WatchHandle {
        self.handle.clone()
    }

    async fn watch(&mut self, tx: mpsc::Sender<GeolocationEvent>) -> std::result::Result<(), GeolocationError> {
        debug!(
            fixes = self.track.len(),
            interval_ms = self.interval.as_millis(),
            "Starting replayed position feed"
        );

        let mut ticker = interval(self.interval);

        for position in &self.track {
            ticker.tick().await;
            if self.handle.should_stop() {
                break;
            }

            trace!(lat = position.lat, lon = position.lon, "Replaying fix");
            if tx
                .send(GeolocationEvent::Fix(PositionFix::now(*position)))
                .await
                .is_err()
            {
                debug!("Position channel closed, stopping replay");
                break;
            }
        }

        debug!("Replayed position feed finished");
        Ok(())
    }
}
