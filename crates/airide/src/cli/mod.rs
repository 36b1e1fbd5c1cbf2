//! Command-line interface for airide.
//!
//! This module provides the CLI structure for the `airide` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, DistanceCommand, RideCommand, RouteCommand};

/// airide - Turn-by-turn navigation for a smart helmet
///
/// Fetches a route from the navigation backend, tracks progress from a
/// position feed, and forwards each instruction to the helmet display.
#[derive(Debug, Parser)]
#[command(name = "airide")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ride to a destination, streaming instructions to the helmet
    Ride(RideCommand),

    /// Query duration and distance of a route
    Route(RouteCommand),

    /// Great-circle distance between two points
    Distance(DistanceCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.verbose, self.quiet)
    }
}
