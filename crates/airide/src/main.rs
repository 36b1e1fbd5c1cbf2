//! `airide` - CLI for the helmet navigation companion
//!
//! Rides a trip end to end, queries routes, and inspects configuration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::sync::Arc;

use anyhow::{bail, Context as _};
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use airide::cli::{Cli, Command, ConfigCommand, DistanceCommand, RideCommand, RouteCommand};
use airide::geolocation::{GeolocationEvent, GeolocationSource, ReplayGeolocation, UnavailableGeolocation};
use airide::link::{HardwareLink, MockSerialLink};
use airide::notice::Notifier;
use airide::{
    geo, init_logging, App, Config, History, HttpBackend, NavigationBackend, NavigationSnapshot,
    Settings, TripState, TripTracker,
};

/// Capacity of the position feed channel.
const FIX_BUFFER: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Ride(cmd) => handle_ride(&config, cmd).await,
        Command::Route(cmd) => handle_route(&config, &cmd).await,
        Command::Distance(cmd) => {
            handle_distance(&cmd);
            Ok(())
        }
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

async fn handle_ride(config: &Config, cmd: RideCommand) -> anyhow::Result<()> {
    if !config.link.mock {
        bail!("only the mock serial link is available; set link.mock = true");
    }
    if cmd.from.is_none() && cmd.replay.is_none() {
        bail!("no position source: pass --from or --replay");
    }

    let backend: Arc<dyn NavigationBackend> = Arc::new(HttpBackend::from_config(config)?);
    let link = MockSerialLink::new();
    link.connect().await;

    let mut settings = Settings::from(&config.app);
    if cmd.no_bluetooth {
        settings.bluetooth_connected = false;
    }
    let (settings_tx, settings_rx) = watch::channel(settings);

    let history = History::new().shared();
    let (notifier, mut notices) = Notifier::channel();
    let notice_printer = tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            println!("{notice}");
        }
    });

    let (tracker, handle) = TripTracker::new(
        backend,
        Arc::new(link.clone()),
        history.clone(),
        notifier.clone(),
        settings_rx,
        config.tracking.clone(),
    );

    let (fix_tx, fix_rx) = mpsc::channel(FIX_BUFFER);
    let mut source: Box<dyn GeolocationSource> = match &cmd.replay {
        Some(path) => Box::new(
            ReplayGeolocation::from_file(path, config.replay_interval())
                .with_context(|| format!("failed to load replay track {}", path.display()))?,
        ),
        None => Box::new(UnavailableGeolocation::new()),
    };
    let watch_handle = source.watch_handle();
    debug!(source = source.name(), "Starting geolocation");
    let geolocation = tokio::spawn(async move {
        if let Err(e) = source.watch(fix_tx.clone()).await {
            let _ = fix_tx.send(GeolocationEvent::Error(e)).await;
        }
    });

    let tracker_task = tokio::spawn(tracker.run(fix_rx));

    let mut app = App::new(&config.app, settings_tx, history.clone(), handle.clone(), notifier);
    app.run_splash(config.splash_duration()).await;

    if let Some(origin) = cmd.from {
        handle.set_origin(Some(origin)).await?;
    }
    handle.set_destination(cmd.to.clone()).await?;

    let outcome = tokio::select! {
        result = ride(&app) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("Interrupted.");
            Ok(())
        }
    };

    watch_handle.stop();
    handle.shutdown().await;
    let _ = tracker_task.await;
    geolocation.abort();
    drop(app);
    drop(handle);
    let _ = notice_printer.await;

    println!();
    println!("Lines sent to helmet: {}", link.sent_count());
    println!("Trips in history:     {}", history.lock().await.len());
    outcome
}

/// Wait for the route, send it, and follow the trip to its end.
async fn ride(app: &App) -> anyhow::Result<()> {
    let mut home = app.home();

    let Some(ready) = home.wait_for_route().await else {
        bail!("trip tracker stopped");
    };
    if let Some(reason) = &ready.route_error {
        bail!("route request failed: {reason}");
    }
    println!(
        "Route to {}: {} / {}",
        ready.destination, ready.route_info.duration, ready.route_info.distance
    );

    app.tracker().send_to_helmet().await?;

    let mut last = ready;
    loop {
        let Some(snapshot) = home.changed().await else {
            bail!("trip tracker stopped");
        };
        print_progress(&last, &snapshot);
        match snapshot.state {
            TripState::Completed => return Ok(()),
            TripState::Idle => bail!("navigation stream interrupted"),
            _ => {}
        }
        last = snapshot;
    }
}

fn print_progress(previous: &NavigationSnapshot, current: &NavigationSnapshot) {
    if current.current_instruction != previous.current_instruction {
        if let Some(instruction) = &current.current_instruction {
            println!("> {instruction}");
        }
    }
    if current.route_info != previous.route_info && !current.route_info.is_placeholder() {
        println!(
            "  {} remaining, {}",
            current.route_info.distance, current.route_info.duration
        );
    }
    if current.state != previous.state {
        println!("[{}]", current.state);
    }
}

async fn handle_route(config: &Config, cmd: &RouteCommand) -> anyhow::Result<()> {
    let backend = HttpBackend::from_config(config)?;
    let summary = backend.route_info(cmd.from, &cmd.to).await?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("From:      {}", cmd.from);
        println!("To:        {}", cmd.to);
        println!("Duration:  {}", summary.duration);
        println!("Distance:  {}", summary.distance);
        println!("Waypoints: {}", summary.coordinates.len());
        if summary.coordinates.len() > 1 {
            println!(
                "Geometry:  {}",
                geo::format_km(geo::route_length(&summary.coordinates))
            );
        }
    }
    Ok(())
}

fn handle_distance(cmd: &DistanceCommand) {
    let meters = cmd.a.distance_to(&cmd.b);
    println!("{meters:.0} m ({})", geo::format_km(meters));
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Backend]");
                println!("  Base URL:           {}", config.backend.base_url);
                println!("  Request timeout:    {}s", config.backend.request_timeout_secs);
                println!();
                println!("[Tracking]");
                println!("  Snap tolerance:     {} m", config.tracking.snap_tolerance_m);
                println!("  Min speed:          {} m/s", config.tracking.min_speed_mps);
                println!("  Completion phrase:  {}", config.tracking.completion_phrase);
                println!();
                println!("[App]");
                println!("  Splash:             {} ms", config.app.splash_ms);
                println!("  Bluetooth:          {}", config.app.bluetooth_connected);
                println!("  Dark map:           {}", config.app.dark_map);
                println!();
                println!("[Link]");
                println!("  Mock:               {}", config.link.mock);
                println!();
                println!("[Geolocation]");
                println!("  Replay interval:    {} ms", config.geolocation.replay_interval_ms);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    warn!(error = %e, "Invalid configuration");
                    println!("Configuration error: {e}");
                }
            }
        }
    }
    Ok(())
}
