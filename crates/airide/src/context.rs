//! Navigation state shared between the trip tracker and the screens.
//!
//! The tracker is the only writer. Everything else holds a
//! [`ContextReceiver`] and sees whole snapshots, never partial updates.

use std::fmt;

use serde::Serialize;
use tokio::sync::watch;

use crate::geo::Position;
use crate::route::RouteInfo;

/// Origin label before any position is known.
pub const ORIGIN_LOCATING: &str = "Locating…";

/// Origin label once a GPS fix has been adopted.
pub const ORIGIN_CURRENT: &str = "Current position";

/// Origin label for a manually entered origin.
pub const ORIGIN_MANUAL: &str = "Manual position";

/// Where a trip is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TripState {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Waiting for the route-info answer.
    RouteFetching,
    /// Duration, distance and geometry are known.
    RouteReady,
    /// Streaming instructions to the helmet.
    Sending,
    /// The last trip reached its destination.
    Completed,
}

impl fmt::Display for TripState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::RouteFetching => "route-fetching",
            Self::RouteReady => "route-ready",
            Self::Sending => "sending",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Everything the Home screen renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationSnapshot {
    /// Trip lifecycle state.
    pub state: TripState,
    /// Latest position fix.
    pub position: Option<Position>,
    /// Trip start.
    pub origin: Option<Position>,
    /// How the origin is shown to the user.
    pub origin_label: String,
    /// Destination text as entered.
    pub destination: String,
    /// Waypoints of the fetched route.
    pub route_coords: Vec<Position>,
    /// Prefix of `route_coords` already traversed.
    pub completed_path: Vec<Position>,
    /// Last instruction received while sending.
    pub current_instruction: Option<String>,
    /// Displayed duration and distance.
    pub route_info: RouteInfo,
    /// Whether instructions are being streamed to the helmet.
    pub sending: bool,
    /// Why the last route request failed. Cleared when the route is reset.
    pub route_error: Option<String>,
}

impl Default for NavigationSnapshot {
    fn default() -> Self {
        Self {
            state: TripState::Idle,
            position: None,
            origin: None,
            origin_label: ORIGIN_LOCATING.to_string(),
            destination: String::new(),
            route_coords: Vec::new(),
            completed_path: Vec::new(),
            current_instruction: None,
            route_info: RouteInfo::placeholder(),
            sending: false,
            route_error: None,
        }
    }
}

impl NavigationSnapshot {
    /// Check if a route geometry is loaded.
    #[must_use]
    pub fn has_route(&self) -> bool {
        !self.route_coords.is_empty()
    }
}

/// Writing side of the context. Owned by the trip tracker.
#[derive(Debug)]
pub struct NavigationContext {
    tx: watch::Sender<NavigationSnapshot>,
}

impl NavigationContext {
    /// Create a context holding the default snapshot.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(NavigationSnapshot::default());
        Self { tx }
    }

    /// Get a read-only view.
    #[must_use]
    pub fn subscribe(&self) -> ContextReceiver {
        ContextReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Publish `snapshot`; readers are woken only if it differs.
    pub fn publish(&self, snapshot: &NavigationSnapshot) {
        self.tx.send_if_modified(|current| {
            if current == snapshot {
                false
            } else {
                current.clone_from(snapshot);
                true
            }
        });
    }

    /// The last published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> NavigationSnapshot {
        self.tx.borrow().clone()
    }
}

impl Default for NavigationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the navigation context.
#[derive(Debug, Clone)]
pub struct ContextReceiver {
    rx: watch::Receiver<NavigationSnapshot>,
}

impl ContextReceiver {
    /// The latest snapshot.
    #[must_use]
    pub fn snapshot(&self) -> NavigationSnapshot {
        self.rx.borrow().clone()
    }

    /// Wait for the next published change and return it.
    ///
    /// Returns `None` once the tracker is gone.
    pub async fn changed(&mut self) -> Option<NavigationSnapshot> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until a snapshot satisfies `predicate` and return it.
    ///
    /// Returns `None` if the tracker goes away first.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&NavigationSnapshot) -> bool,
    ) -> Option<NavigationSnapshot> {
        self.rx.wait_for(predicate).await.ok().map(|s| s.clone())
    }

    /// Wait until the pending route request has settled, either ready or
    /// failed with [`NavigationSnapshot::route_error`] set.
    ///
    /// Checks the current snapshot first, so a failure published before
    /// the call is still seen.
    pub async fn wait_for_route(&mut self) -> Option<NavigationSnapshot> {
        self.wait_for(|s| s.state == TripState::RouteReady || s.route_error.is_some())
            .await
    }
}
