//! End-to-end tests against an in-process navigation backend.

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{Stream, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch};

use airide::backend::{HttpBackend, NavigationBackend};
use airide::config::TrackingConfig;
use airide::geolocation::{GeolocationSource, ReplayGeolocation};
use airide::link::MockSerialLink;
use airide::notice::Notifier;
use airide::{Error, History, Position, Settings, TripState, TripTracker};

const TIMEOUT: Duration = Duration::from_secs(10);

type Positions = Arc<Mutex<Vec<Value>>>;

async fn route_info(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("end").map(String::as_str) == Some("Nowhere") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Destinazione non valida"})),
        )
            .into_response();
    }
    if params.get("start").map(String::as_str) != Some("45,9") {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "Partenza non valida"}))).into_response();
    }
    Json(json!({
        "duration": "30 min",
        "distance": "10.0 km",
        "coordinates": [
            {"lat": 45.0, "lon": 9.0},
            {"lat": 45.001, "lon": 9.0},
            {"lat": 45.002, "lon": 9.0}
        ]
    }))
    .into_response()
}

async fn stream() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = vec![
        Event::default().comment("waiting for GPS update"),
        Event::default().data(r#"{"testo":"Navigazione avviata 🚗"}"#),
        Event::default().comment("GPS tracking..."),
        Event::default().data(r#"{"freccia":1,"metri":120,"testo":"Svolta a destra"}"#),
        Event::default().data("not json"),
        Event::default().data(r#"{"testo":"Percorso completato 🎉"}"#),
    ];
    Sse::new(futures::stream::iter(events.into_iter().map(Ok)))
}

async fn update_position(State(positions): State<Positions>, Json(body): Json<Value>) -> StatusCode {
    positions.lock().unwrap().push(body);
    StatusCode::OK
}

async fn serve() -> (SocketAddr, Positions) {
    let positions = Positions::default();
    let app = Router::new()
        .route("/route_info", get(route_info))
        .route("/stream", get(stream))
        .route("/update_position", post(update_position))
        .with_state(positions.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, positions)
}

fn backend(addr: SocketAddr) -> HttpBackend {
    HttpBackend::new(format!("http://{addr}"), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn route_info_success() {
    let (addr, _) = serve().await;
    let summary = backend(addr)
        .route_info(Position::new(45.0, 9.0), "Piazza Duomo, Milano")
        .await
        .unwrap();

    assert_eq!(summary.duration, "30 min");
    assert_eq!(summary.distance, "10.0 km");
    assert_eq!(summary.coordinates.len(), 3);
}

#[tokio::test]
async fn route_info_error_field() {
    let (addr, _) = serve().await;
    let err = backend(addr)
        .route_info(Position::new(45.0, 9.0), "Nowhere")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Backend { status: 400, .. }));
    assert!(err.to_string().contains("Destinazione non valida"));
}

#[tokio::test]
async fn route_info_unreachable_backend() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = backend(addr)
        .route_info(Position::new(45.0, 9.0), "Duomo")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Http(_)));
    assert!(err.is_transport_error());
}

#[tokio::test]
async fn stream_decodes_events_and_skips_comments() {
    let (addr, _) = serve().await;
    let events: Vec<_> = backend(addr)
        .open_stream(Position::new(45.0, 9.0), "Duomo")
        .await
        .unwrap()
        .collect()
        .await;

    let texts: Vec<String> = events
        .into_iter()
        .map(|e| e.unwrap().text.unwrap_or_default())
        .collect();
    assert_eq!(
        texts,
        ["Navigazione avviata 🚗", "Svolta a destra", "Percorso completato 🎉"]
    );
}

#[tokio::test]
async fn update_position_posts_coordinates() {
    let (addr, positions) = serve().await;
    backend(addr)
        .update_position(Position::new(45.5, 9.25))
        .await
        .unwrap();

    let posted = positions.lock().unwrap().clone();
    assert_eq!(posted, vec![json!({"lat": 45.5, "lon": 9.25})]);
}

#[tokio::test]
async fn ride_to_completion() {
    let (addr, positions) = serve().await;
    let link = MockSerialLink::connected();
    let history = History::new().shared();
    let (notifier, _notices) = Notifier::channel();
    let (_settings, settings_rx) = watch::channel(Settings::default());

    let (tracker, handle) = TripTracker::new(
        Arc::new(backend(addr)),
        Arc::new(link.clone()),
        history.clone(),
        notifier,
        settings_rx,
        TrackingConfig::default(),
    );

    let (fix_tx, fix_rx) = mpsc::channel(16);
    let mut replay = ReplayGeolocation::new(vec![Position::new(45.0, 9.0)], Duration::from_millis(20));
    let geolocation = tokio::spawn(async move { replay.watch(fix_tx).await });
    let tracker_task = tokio::spawn(tracker.run(fix_rx));

    handle.set_destination("Piazza Duomo, Milano").await.unwrap();
    let mut home = handle.context();
    let ready = tokio::time::timeout(TIMEOUT, home.wait_for(|s| s.state == TripState::RouteReady))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ready.route_coords.len(), 3);

    handle.send_to_helmet().await.unwrap();
    let done = tokio::time::timeout(TIMEOUT, home.wait_for(|s| s.state == TripState::Completed))
        .await
        .unwrap()
        .unwrap();
    assert!(!done.sending);
    assert!(done.current_instruction.is_none());

    let sent = link.sent_messages();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[1], "Indicazione: Svolta a destra | Metri: 120 m");
    assert!(sent[2].starts_with("Indicazione: Percorso completato"));

    let history = history.lock().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history.routes()[0].from, "45,9");
    assert_eq!(history.routes()[0].duration, "30 min");
    drop(history);

    handle.shutdown().await;
    tracker_task.await.unwrap();
    geolocation.await.unwrap().unwrap();
    assert!(!positions.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_destination_settles_route_wait() {
    let (addr, _positions) = serve().await;
    let (notifier, _notices) = Notifier::channel();
    let (_settings, settings_rx) = watch::channel(Settings::default());

    let (tracker, handle) = TripTracker::new(
        Arc::new(backend(addr)),
        Arc::new(MockSerialLink::connected()),
        History::new().shared(),
        notifier,
        settings_rx,
        TrackingConfig::default(),
    );
    let (_fix_tx, fix_rx) = mpsc::channel(1);
    let tracker_task = tokio::spawn(tracker.run(fix_rx));

    handle.set_origin(Some(Position::new(45.0, 9.0))).await.unwrap();
    handle.set_destination("Nowhere").await.unwrap();

    // Let the 400 come back before anyone looks at the context
    tokio::time::sleep(Duration::from_millis(200)).await;

    let mut home = handle.context();
    let settled = tokio::time::timeout(TIMEOUT, home.wait_for_route())
        .await
        .expect("failed route request was never observed")
        .unwrap();
    assert_eq!(settled.state, TripState::Idle);
    let reason = settled.route_error.unwrap();
    assert!(reason.contains("Destinazione non valida"));

    handle.shutdown().await;
    tracker_task.await.unwrap();
}
