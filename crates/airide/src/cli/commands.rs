//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::geo::Position;

/// Ride command arguments.
#[derive(Debug, Args)]
pub struct RideCommand {
    /// Destination, as an address or place name
    #[arg(short, long)]
    pub to: String,

    /// Manual origin as "lat,lon" (defaults to the first position fix)
    #[arg(short, long, value_name = "LAT,LON")]
    pub from: Option<Position>,

    /// Replay positions from a JSON file of {"lat", "lon"} objects
    #[arg(short, long, value_name = "FILE")]
    pub replay: Option<PathBuf>,

    /// Start with the Bluetooth toggle off
    #[arg(long)]
    pub no_bluetooth: bool,
}

/// Route command arguments.
#[derive(Debug, Args)]
pub struct RouteCommand {
    /// Origin as "lat,lon"
    #[arg(short, long, value_name = "LAT,LON")]
    pub from: Position,

    /// Destination, as an address or place name
    #[arg(short, long)]
    pub to: String,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Distance command arguments.
#[derive(Debug, Args)]
pub struct DistanceCommand {
    /// First point as "lat,lon"
    #[arg(value_name = "LAT,LON", allow_hyphen_values = true)]
    pub a: Position,

    /// Second point as "lat,lon"
    #[arg(value_name = "LAT,LON", allow_hyphen_values = true)]
    pub b: Position,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show configuration file path
    Path,

    /// Validate configuration file
    Validate {
        /// Path to config file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
