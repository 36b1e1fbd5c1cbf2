//! Configuration management for airide.
//!
//! Configuration is layered with figment: built-in defaults, then a TOML
//! file, then `AIRIDE_`-prefixed environment variables.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geo::SNAP_TOLERANCE_M;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory name under the platform config dir.
const CONFIG_DIR_NAME: &str = "airide";

/// Phrase the backend puts in the last instruction of a route.
pub const DEFAULT_COMPLETION_PHRASE: &str = "Percorso completato";

/// Application configuration.
///
/// Precedence, highest first:
/// 1. Environment variables (prefixed with `AIRIDE_`)
/// 2. TOML config file at `~/.config/airide/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Navigation backend configuration.
    pub backend: BackendConfig,
    /// Trip tracking tunables.
    pub tracking: TrackingConfig,
    /// Screen and device defaults.
    pub app: AppConfig,
    /// Helmet link configuration.
    pub link: LinkConfig,
    /// Geolocation feed configuration.
    pub geolocation: GeolocationConfig,
}

/// Navigation backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the navigation backend.
    pub base_url: String,
    /// Timeout for one-shot requests in seconds. The instruction stream
    /// is never subject to it.
    pub request_timeout_secs: u64,
}

/// Trip tracking tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Max distance in meters from a waypoint to count as on the route.
    pub snap_tolerance_m: f64,
    /// Below this speed (m/s) the duration estimate is not recomputed.
    pub min_speed_mps: f64,
    /// Instruction text that marks the end of a trip.
    pub completion_phrase: String,
}

/// Screen and device defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// How long the splash screen stays up, in milliseconds.
    pub splash_ms: u64,
    /// Initial state of the Bluetooth toggle.
    pub bluetooth_connected: bool,
    /// Initial state of the dark map toggle.
    pub dark_map: bool,
    /// Simulated duration of a device search, in milliseconds.
    pub device_search_ms: u64,
}

/// Helmet link configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Log messages instead of writing to a serial port.
    pub mock: bool,
}

/// Geolocation feed configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeolocationConfig {
    /// Interval between replayed fixes, in milliseconds.
    pub replay_interval_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_secs: 15,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            snap_tolerance_m: SNAP_TOLERANCE_M,
            min_speed_mps: 0.5,
            completion_phrase: DEFAULT_COMPLETION_PHRASE.to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            splash_ms: 2000,
            bluetooth_connected: true,
            dark_map: false,
            device_search_ms: 2000,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { mock: true }
    }
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            replay_interval_ms: 1000,
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("AIRIDE_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if reqwest::Url::parse(&self.backend.base_url).is_err() {
            return Err(Error::ConfigValidation {
                message: format!("invalid backend base_url: {}", self.backend.base_url),
            });
        }

        if self.backend.request_timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "request_timeout_secs must be greater than 0".to_string(),
            });
        }

        if !is_positive(self.tracking.snap_tolerance_m) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "snap_tolerance_m must be positive, got {}",
                    self.tracking.snap_tolerance_m
                ),
            });
        }

        if !is_positive(self.tracking.min_speed_mps) {
            return Err(Error::ConfigValidation {
                message: format!(
                    "min_speed_mps must be positive, got {}",
                    self.tracking.min_speed_mps
                ),
            });
        }

        if self.tracking.completion_phrase.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "completion_phrase cannot be empty".to_string(),
            });
        }

        if self.geolocation.replay_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "replay_interval_ms must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.backend.request_timeout_secs)
    }

    /// Get the splash duration.
    #[must_use]
    pub fn splash_duration(&self) -> Duration {
        Duration::from_millis(self.app.splash_ms)
    }

    /// Get the simulated device search duration.
    #[must_use]
    pub fn device_search_duration(&self) -> Duration {
        Duration::from_millis(self.app.device_search_ms)
    }

    /// Get the replay interval as a Duration.
    #[must_use]
    pub fn replay_interval(&self) -> Duration {
        Duration::from_millis(self.geolocation.replay_interval_ms)
    }
}

/// True for finite values above zero; NaN is rejected.
fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
