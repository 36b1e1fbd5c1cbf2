//! The trip tracker.
//!
//! One task owns all navigation state. It reacts to user commands,
//! position fixes, and results from the route request and the
//! instruction stream, which run as their own tasks and report back
//! through a channel. Every change is published to the
//! [`NavigationContext`].
//!
//! Results are tagged: route answers with the route generation (bumped
//! whenever origin or destination changes) and stream events with the trip
//! number (bumped on every send). Anything carrying an old tag is dropped.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::app::Settings;
use crate::backend::{InstructionEvent, NavigationBackend};
use crate::config::TrackingConfig;
use crate::context::{
    ContextReceiver, NavigationContext, NavigationSnapshot, TripState, ORIGIN_CURRENT, ORIGIN_LOCATING,
    ORIGIN_MANUAL,
};
use crate::error::{Error, PreconditionError, Result};
use crate::geo::{self, Position};
use crate::geolocation::{GeolocationEvent, PositionFix};
use crate::history::SharedHistory;
use crate::link::{format_message, HardwareLink};
use crate::notice::{Notice, Notifier};
use crate::route::{Route, RouteInfo, RouteSummary};

/// Capacity of the command channel.
const COMMAND_BUFFER: usize = 32;

/// Requests to the tracker.
#[derive(Debug)]
pub enum TrackerCommand {
    /// Replace the destination text.
    SetDestination(String),
    /// Use a manual origin, or go back to the GPS fix with `None`.
    SetOrigin(Option<Position>),
    /// Send the current trip to the helmet.
    Send {
        /// Receives the outcome of the precondition checks.
        reply: oneshot::Sender<std::result::Result<(), PreconditionError>>,
    },
    /// Load a trip from history into Home.
    Review(Route),
    /// Stop the tracker.
    Shutdown,
}

/// Cloneable handle for talking to a running [`TripTracker`].
#[derive(Debug, Clone)]
pub struct TrackerHandle {
    commands: mpsc::Sender<TrackerCommand>,
    context: ContextReceiver,
}

impl TrackerHandle {
    /// Read-only view of the navigation state.
    #[must_use]
    pub fn context(&self) -> ContextReceiver {
        self.context.clone()
    }

    /// Set the destination.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker has stopped.
    pub async fn set_destination(&self, destination: impl Into<String>) -> Result<()> {
        self.command(TrackerCommand::SetDestination(destination.into()))
            .await
    }

    /// Set or clear the manual origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker has stopped.
    pub async fn set_origin(&self, origin: Option<Position>) -> Result<()> {
        self.command(TrackerCommand::SetOrigin(origin)).await
    }

    /// Send the current trip to the helmet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precondition`] if the trip cannot be sent, or an
    /// internal error if the tracker has stopped.
    pub async fn send_to_helmet(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.command(TrackerCommand::Send { reply }).await?;
        rx.await
            .map_err(|_| Error::internal("trip tracker stopped"))?
            .map_err(Error::from)
    }

    /// Load `route` into Home.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracker has stopped.
    pub async fn review(&self, route: Route) -> Result<()> {
        self.command(TrackerCommand::Review(route)).await
    }

    /// Ask the tracker to stop. Does nothing if it already has.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(TrackerCommand::Shutdown).await;
    }

    async fn command(&self, command: TrackerCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::internal("trip tracker stopped"))
    }
}

/// Results reported by the tracker's own tasks.
#[derive(Debug)]
enum TaskEvent {
    Route {
        generation: u64,
        result: Result<RouteSummary>,
    },
    Stream {
        trip: u64,
        event: StreamEvent,
    },
}

#[derive(Debug)]
enum StreamEvent {
    Instruction(InstructionEvent),
    Ended,
    Failed(Error),
}

/// Owner of all navigation state.
pub struct TripTracker {
    backend: Arc<dyn NavigationBackend>,
    link: Arc<dyn HardwareLink>,
    history: SharedHistory,
    notifier: Notifier,
    settings: watch::Receiver<Settings>,
    tracking: TrackingConfig,

    context: NavigationContext,
    snapshot: NavigationSnapshot,
    commands: mpsc::Receiver<TrackerCommand>,
    events_tx: mpsc::UnboundedSender<TaskEvent>,
    events_rx: mpsc::UnboundedReceiver<TaskEvent>,

    generation: u64,
    trip: u64,
    fetch_attempted: bool,
    fetch_task: Option<JoinHandle<()>>,
    stream_task: Option<JoinHandle<()>>,
    last_fix: Option<PositionFix>,
    last_good_duration: Option<String>,
    next_index: usize,
    geolocation_reported: bool,
}

impl fmt::Debug for TripTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TripTracker")
            .field("link", &self.link.name())
            .field("snapshot", &self.snapshot)
            .field("generation", &self.generation)
            .field("trip", &self.trip)
            .finish_non_exhaustive()
    }
}

impl TripTracker {
    /// Create a tracker and the handle used to drive it.
    #[must_use]
    pub fn new(
        backend: Arc<dyn NavigationBackend>,
        link: Arc<dyn HardwareLink>,
        history: SharedHistory,
        notifier: Notifier,
        settings: watch::Receiver<Settings>,
        tracking: TrackingConfig,
    ) -> (Self, TrackerHandle) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_BUFFER);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let context = NavigationContext::new();
        let handle = TrackerHandle {
            commands: commands_tx,
            context: context.subscribe(),
        };

        let tracker = Self {
            backend,
            link,
            history,
            notifier,
            settings,
            tracking,
            context,
            snapshot: NavigationSnapshot::default(),
            commands,
            events_tx,
            events_rx,
            generation: 0,
            trip: 0,
            fetch_attempted: false,
            fetch_task: None,
            stream_task: None,
            last_fix: None,
            last_good_duration: None,
            next_index: 0,
            geolocation_reported: false,
        };
        (tracker, handle)
    }

    /// Run until shut down or every handle is dropped.
    ///
    /// `fixes` is the geolocation feed; the tracker keeps running after it
    /// closes.
    pub async fn run(mut self, mut fixes: mpsc::Receiver<GeolocationEvent>) {
        info!(link = self.link.name(), "Trip tracker started");
        let mut fixes_open = true;

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(TrackerCommand::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                event = fixes.recv(), if fixes_open => match event {
                    Some(event) => self.handle_geolocation(event),
                    None => {
                        debug!("Geolocation feed closed");
                        fixes_open = false;
                    }
                },
                Some(event) = self.events_rx.recv() => self.handle_task_event(event).await,
            }
            self.context.publish(&self.snapshot);
        }

        self.abort_tasks();
        info!("Trip tracker stopped");
    }

    async fn handle_command(&mut self, command: TrackerCommand) {
        match command {
            TrackerCommand::SetDestination(destination) => {
                if destination != self.snapshot.destination {
                    self.snapshot.destination = destination;
                    self.reset_route();
                    self.maybe_fetch();
                }
            }
            TrackerCommand::SetOrigin(origin) => {
                if origin != self.snapshot.origin {
                    self.apply_origin(origin);
                    self.reset_route();
                    self.maybe_fetch();
                }
            }
            TrackerCommand::Send { reply } => {
                let outcome = self.send_to_helmet().await;
                if let Err(e) = outcome {
                    self.notifier.notify(Notice::error(e.to_string()));
                }
                let _ = reply.send(outcome);
            }
            TrackerCommand::Review(route) => {
                info!(from = %route.from, to = %route.to, "Reviewing trip from history");
                if let Ok(origin) = route.from.parse::<Position>() {
                    self.apply_origin(Some(origin));
                }
                self.snapshot.destination = route.to;
                self.reset_route();
                self.maybe_fetch();
            }
            TrackerCommand::Shutdown => {}
        }
    }

    /// Use a manual origin, or fall back to the latest fix.
    fn apply_origin(&mut self, origin: Option<Position>) {
        let snapshot = &mut self.snapshot;
        if let Some(origin) = origin {
            snapshot.origin = Some(origin);
            snapshot.origin_label = ORIGIN_MANUAL.to_string();
        } else {
            snapshot.origin = snapshot.position;
            snapshot.origin_label = if snapshot.position.is_some() {
                ORIGIN_CURRENT.to_string()
            } else {
                ORIGIN_LOCATING.to_string()
            };
        }
    }

    /// Drop everything tied to the previous origin/destination pair.
    fn reset_route(&mut self) {
        self.generation += 1;
        self.abort_tasks();
        self.fetch_attempted = false;
        self.last_good_duration = None;
        self.next_index = 0;

        let snapshot = &mut self.snapshot;
        snapshot.state = TripState::Idle;
        snapshot.route_coords.clear();
        snapshot.completed_path.clear();
        snapshot.route_info = RouteInfo::placeholder();
        snapshot.current_instruction = None;
        snapshot.sending = false;
        snapshot.route_error = None;
        debug!(generation = self.generation, "Route reset");
    }

    fn abort_tasks(&mut self) {
        if let Some(task) = self.fetch_task.take() {
            task.abort();
        }
        if let Some(task) = self.stream_task.take() {
            task.abort();
        }
    }

    /// Start the route request once per generation.
    fn maybe_fetch(&mut self) {
        if self.fetch_attempted || self.snapshot.sending {
            return;
        }
        let destination = self.snapshot.destination.trim().to_string();
        if destination.is_empty() {
            return;
        }
        let Some(origin) = self.snapshot.origin else {
            return;
        };

        self.fetch_attempted = true;
        self.snapshot.state = TripState::RouteFetching;

        let generation = self.generation;
        let backend = Arc::clone(&self.backend);
        let events = self.events_tx.clone();
        info!(%origin, %destination, generation, "Fetching route info");

        self.fetch_task = Some(tokio::spawn(async move {
            let result = backend.route_info(origin, &destination).await;
            let _ = events.send(TaskEvent::Route { generation, result });
        }));
    }

    async fn send_to_helmet(&mut self) -> std::result::Result<(), PreconditionError> {
        if self.snapshot.destination.trim().is_empty() {
            return Err(PreconditionError::MissingDestination);
        }
        if !self.settings.borrow().bluetooth_connected {
            return Err(PreconditionError::LinkDisconnected);
        }
        let Some(origin) = self.snapshot.origin else {
            return Err(PreconditionError::MissingOrigin);
        };
        if self.snapshot.sending {
            return Err(PreconditionError::TripInProgress);
        }

        let destination = self.snapshot.destination.clone();
        let route = Route::new(
            origin.to_string(),
            destination.clone(),
            &self.snapshot.route_info,
            Utc::now().date_naive(),
        );
        self.history.lock().await.append(route);

        self.trip += 1;
        self.snapshot.sending = true;
        self.snapshot.state = TripState::Sending;
        self.snapshot.current_instruction = None;
        self.notifier.notify(Notice::success("Route sent to helmet"));
        info!(%origin, %destination, trip = self.trip, "Trip started");

        let trip = self.trip;
        let backend = Arc::clone(&self.backend);
        let events = self.events_tx.clone();
        self.stream_task = Some(tokio::spawn(async move {
            let report = |event| events.send(TaskEvent::Stream { trip, event }).is_ok();

            let mut stream = match backend.open_stream(origin, &destination).await {
                Ok(stream) => stream,
                Err(e) => {
                    report(StreamEvent::Failed(e));
                    return;
                }
            };
            while let Some(item) = stream.next().await {
                let delivered = match item {
                    Ok(event) => report(StreamEvent::Instruction(event)),
                    Err(e) => {
                        report(StreamEvent::Failed(e));
                        return;
                    }
                };
                if !delivered {
                    return;
                }
            }
            report(StreamEvent::Ended);
        }));
        Ok(())
    }

    fn handle_geolocation(&mut self, event: GeolocationEvent) {
        match event {
            GeolocationEvent::Fix(fix) => self.handle_fix(fix),
            GeolocationEvent::Error(e) => {
                warn!(error = %e, "Geolocation failed");
                if !self.geolocation_reported {
                    self.geolocation_reported = true;
                    self.notifier.notify(Notice::error(e.to_string()));
                }
            }
        }
    }

    fn handle_fix(&mut self, fix: PositionFix) {
        let position = fix.position;
        debug!(%position, "Position fix");
        self.snapshot.position = Some(position);

        let backend = Arc::clone(&self.backend);
        tokio::spawn(async move {
            if let Err(e) = backend.update_position(position).await {
                warn!(error = %e, "Position update failed");
            }
        });

        if self.snapshot.origin.is_none() {
            self.snapshot.origin = Some(position);
            self.snapshot.origin_label = ORIGIN_CURRENT.to_string();
            self.maybe_fetch();
        }

        if self.snapshot.has_route() {
            self.track_progress(&fix);
        }
        self.last_fix = Some(fix);
    }

    /// Recompute remaining distance, duration and the traversed prefix.
    fn track_progress(&mut self, fix: &PositionFix) {
        let tolerance = self.tracking.snap_tolerance_m;
        let coords = &self.snapshot.route_coords;
        let remaining = geo::remaining_distance(&fix.position, coords, tolerance);

        let speed = self.last_fix.and_then(|prev| {
            let elapsed = fix.timestamp.checked_duration_since(prev.timestamp)?.as_secs_f64();
            (elapsed > 0.0).then(|| prev.position.distance_to(&fix.position) / elapsed)
        });

        if let Some(speed) = speed.filter(|s| *s >= self.tracking.min_speed_mps) {
            let minutes = minutes_at_speed(remaining, speed);
            self.last_good_duration = Some(geo::format_minutes(minutes));
        }

        let duration = self
            .last_good_duration
            .clone()
            .unwrap_or_else(|| self.snapshot.route_info.duration.clone());
        self.snapshot.route_info = RouteInfo::new(duration, geo::format_km(remaining));

        if let Some(index) = geo::snap_index(&fix.position, coords, tolerance) {
            if index + 1 > self.snapshot.completed_path.len() {
                self.snapshot.completed_path = coords[..=index].to_vec();
            }
            self.next_index = self.next_index.max(index + 1);
        }
        debug!(
            remaining_m = remaining.round(),
            ?speed,
            next_index = self.next_index,
            "Progress updated"
        );
    }

    async fn handle_task_event(&mut self, event: TaskEvent) {
        match event {
            TaskEvent::Route { generation, result } => {
                if generation != self.generation {
                    debug!(generation, current = self.generation, "Discarding stale route info");
                    return;
                }
                self.fetch_task = None;
                self.handle_route_info(result);
            }
            TaskEvent::Stream { trip, event } => {
                if trip != self.trip || !self.snapshot.sending {
                    debug!(trip, current = self.trip, "Discarding stale stream event");
                    return;
                }
                self.handle_stream_event(event).await;
            }
        }
    }

    fn handle_route_info(&mut self, result: Result<RouteSummary>) {
        let sending = self.snapshot.sending;
        match result {
            Ok(summary) => {
                info!(
                    duration = %summary.duration,
                    distance = %summary.distance,
                    waypoints = summary.coordinates.len(),
                    "Route ready"
                );
                self.snapshot.route_info = summary.info();
                self.snapshot.route_coords = summary.coordinates;
                self.snapshot.completed_path.clear();
                self.snapshot.route_error = None;
                self.last_good_duration = None;
                self.next_index = 0;
                if !sending {
                    self.snapshot.state = TripState::RouteReady;
                }
            }
            Err(e) => {
                warn!(error = %e, "Route info request failed");
                self.notifier.notify(Notice::error(format!("Could not get route: {e}")));
                self.snapshot.route_error = Some(e.to_string());
                self.snapshot.route_info = RouteInfo::placeholder();
                self.snapshot.route_coords.clear();
                self.snapshot.completed_path.clear();
                if !sending {
                    self.snapshot.state = TripState::Idle;
                }
            }
        }
    }

    async fn handle_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Instruction(event) => {
                if let Some(text) = &event.text {
                    self.snapshot.current_instruction = Some(text.clone());
                }
                self.forward_instruction(&event).await;

                if event.contains(&self.tracking.completion_phrase) {
                    self.complete_trip();
                }
            }
            StreamEvent::Ended => {
                debug!("Instruction stream closed by backend");
                self.complete_trip();
            }
            StreamEvent::Failed(e) => {
                warn!(error = %e, "Instruction stream failed");
                self.stream_task = None;
                self.notifier.notify(Notice::error(format!("Navigation stream interrupted: {e}")));
                self.snapshot.sending = false;
                self.snapshot.current_instruction = None;
                self.snapshot.route_info = RouteInfo::placeholder();
                self.snapshot.route_coords.clear();
                self.snapshot.completed_path.clear();
                self.snapshot.state = TripState::Idle;
            }
        }
    }

    /// Write one instruction line to the helmet.
    async fn forward_instruction(&mut self, event: &InstructionEvent) {
        let Some(instruction) = event
            .text
            .as_deref()
            .or(self.snapshot.current_instruction.as_deref())
        else {
            return;
        };
        let meters = event.meters.unwrap_or_else(|| {
            self.snapshot.position.map_or(0.0, |position| {
                geo::distance_to_next_step(&position, &self.snapshot.route_coords, self.next_index)
            })
        });

        let message = format_message(instruction, meters);
        if let Err(e) = self.link.send(&message).await {
            warn!(error = %e, link = self.link.name(), "Failed to forward instruction");
        }
    }

    fn complete_trip(&mut self) {
        if let Some(task) = self.stream_task.take() {
            task.abort();
        }
        self.snapshot.current_instruction = None;
        self.snapshot.sending = false;
        self.snapshot.state = TripState::Completed;
        self.notifier.notify(Notice::success("Route completed"));
        info!(trip = self.trip, "Trip completed");
    }
}

impl Drop for TripTracker {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

/// Whole minutes needed to cover `remaining_m` at `speed_mps`.
#[allow(clippy::cast_possible_truncation)]
fn minutes_at_speed(remaining_m: f64, speed_mps: f64) -> i64 {
    (remaining_m / speed_mps / 60.0).round() as i64
}
