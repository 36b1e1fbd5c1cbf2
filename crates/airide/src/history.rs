//! In-memory trip history.
//!
//! Newest trips come first. Nothing is persisted: the list lives as long
//! as the process.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::route::Route;

/// History shared between the trip tracker (appends) and the history
/// screen (review and delete).
pub type SharedHistory = Arc<Mutex<History>>;

/// The list of trips sent to the helmet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    routes: Vec<Route>,
}

impl History {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history from routes ordered newest first.
    #[must_use]
    pub fn from_routes(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Prepend `route` unless the same trip is already recorded.
    ///
    /// Returns `true` if the route was added.
    pub fn append(&mut self, route: Route) -> bool {
        if self.routes.iter().any(|r| r.same_trip(&route)) {
            debug!(from = %route.from, to = %route.to, date = %route.date, "Skipping duplicate trip");
            return false;
        }
        self.routes.insert(0, route);
        true
    }

    /// Remove the entry at `index`, keeping the order of the rest.
    pub fn remove(&mut self, index: usize) -> Option<Route> {
        if index < self.routes.len() {
            Some(self.routes.remove(index))
        } else {
            None
        }
    }

    /// Get the entry at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Route> {
        self.routes.get(index)
    }

    /// All entries, newest first.
    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Wrap this history for sharing between tasks.
    #[must_use]
    pub fn shared(self) -> SharedHistory {
        Arc::new(Mutex::new(self))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Check if the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
