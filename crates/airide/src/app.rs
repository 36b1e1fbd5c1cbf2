//! Screen navigation and user settings.
//!
//! [`App`] sits on top of the trip tracker: it owns the current screen,
//! the settings the tracker reads, and the history list actions.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::context::ContextReceiver;
use crate::error::Result;
use crate::history::SharedHistory;
use crate::notice::{Notice, Notifier};
use crate::route::Route;
use crate::tracker::TrackerHandle;

/// The app's screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    /// Shown at start until the splash timer fires.
    #[default]
    Splash,
    /// Map, trip controls and the current instruction.
    Home,
    /// Trips sent to the helmet.
    History,
    /// Device and display settings.
    Settings,
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Splash => "splash",
            Self::Home => "home",
            Self::History => "history",
            Self::Settings => "settings",
        };
        f.write_str(s)
    }
}

/// User-adjustable settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether the helmet is reported connected over Bluetooth.
    pub bluetooth_connected: bool,
    /// Whether the map uses the dark style.
    pub dark_map: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for Settings {
    fn from(config: &AppConfig) -> Self {
        Self {
            bluetooth_connected: config.bluetooth_connected,
            dark_map: config.dark_map,
        }
    }
}

/// Screen state plus the actions available on each screen.
#[derive(Debug)]
pub struct App {
    screen: Screen,
    settings: watch::Sender<Settings>,
    history: SharedHistory,
    tracker: TrackerHandle,
    notifier: Notifier,
    device_search: Duration,
}

impl App {
    /// Create the app on the splash screen.
    ///
    /// `settings` is the sender whose receiver the tracker was built with.
    #[must_use]
    pub fn new(
        config: &AppConfig,
        settings: watch::Sender<Settings>,
        history: SharedHistory,
        tracker: TrackerHandle,
        notifier: Notifier,
    ) -> Self {
        Self {
            screen: Screen::Splash,
            settings,
            history,
            tracker,
            notifier,
            device_search: Duration::from_millis(config.device_search_ms),
        }
    }

    /// The screen currently shown.
    #[must_use]
    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Switch screens. Ignored while the splash is up.
    ///
    /// Returns `true` if the screen changed.
    pub fn navigate(&mut self, screen: Screen) -> bool {
        if self.screen == Screen::Splash {
            debug!(%screen, "Navigation ignored during splash");
            return false;
        }
        if self.screen == screen {
            return false;
        }
        debug!(from = %self.screen, to = %screen, "Navigate");
        self.screen = screen;
        true
    }

    /// Keep the splash up for `duration`, then show Home.
    pub async fn run_splash(&mut self, duration: Duration) {
        if self.screen != Screen::Splash {
            return;
        }
        tokio::time::sleep(duration).await;
        self.screen = Screen::Home;
        debug!("Splash finished");
    }

    /// Current settings.
    #[must_use]
    pub fn settings(&self) -> Settings {
        *self.settings.borrow()
    }

    /// Flip the Bluetooth toggle and return the new state.
    pub fn toggle_bluetooth(&self) -> bool {
        let connected = !self.settings().bluetooth_connected;
        self.set_bluetooth(connected);
        connected
    }

    /// Set the Bluetooth toggle.
    pub fn set_bluetooth(&self, connected: bool) {
        self.settings.send_modify(|s| s.bluetooth_connected = connected);
        if connected {
            self.notifier.notify(Notice::success("Bluetooth connected"));
        } else {
            self.notifier.notify(Notice::info("Bluetooth disconnected"));
        }
    }

    /// Flip the dark map toggle and return the new state.
    pub fn toggle_dark_map(&self) -> bool {
        let mut dark = false;
        self.settings.send_modify(|s| {
            s.dark_map = !s.dark_map;
            dark = s.dark_map;
        });
        dark
    }

    /// Simulate a device search.
    pub async fn search_devices(&self) {
        self.notifier.notify(Notice::info("Searching for devices…"));
        tokio::time::sleep(self.device_search).await;
        self.notifier.notify(Notice::success("Helmet device found"));
    }

    /// Trips in the history, newest first.
    pub async fn history(&self) -> Vec<Route> {
        self.history.lock().await.routes().to_vec()
    }

    /// Delete the history entry at `index`.
    pub async fn delete_route(&self, index: usize) -> Option<Route> {
        let removed = self.history.lock().await.remove(index);
        if let Some(route) = &removed {
            info!(index, to = %route.to, "Deleted trip from history");
        }
        removed
    }

    /// Load the history entry at `index` into Home and switch to it.
    ///
    /// Returns `false` if there is no such entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the trip tracker has stopped.
    pub async fn review_route(&mut self, index: usize) -> Result<bool> {
        let Some(route) = self.history.lock().await.get(index).cloned() else {
            return Ok(false);
        };
        self.tracker.review(route).await?;
        self.navigate(Screen::Home);
        Ok(true)
    }

    /// What the Home screen shows.
    #[must_use]
    pub fn home(&self) -> ContextReceiver {
        self.tracker.context()
    }

    /// Handle to the trip tracker.
    #[must_use]
    pub fn tracker(&self) -> &TrackerHandle {
        &self.tracker
    }
}
