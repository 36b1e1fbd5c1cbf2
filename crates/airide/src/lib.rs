//! `airide` - Navigation companion for a smart helmet
//!
//! This library tracks a trip from a position feed, fetches route data from
//! the navigation backend, and forwards turn-by-turn instructions to the
//! helmet display.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod app;
pub mod backend;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod geo;
pub mod geolocation;
pub mod history;
pub mod link;
pub mod logging;
pub mod notice;
pub mod route;
pub mod tracker;

pub use app::{App, Screen, Settings};
pub use backend::{HttpBackend, NavigationBackend};
pub use config::Config;
pub use context::{ContextReceiver, NavigationSnapshot, TripState};
pub use error::{Error, PreconditionError, Result};
pub use geo::Position;
pub use history::{History, SharedHistory};
pub use logging::init_logging;
pub use route::{Route, RouteInfo, RouteSummary};
pub use tracker::{TrackerHandle, TripTracker};
