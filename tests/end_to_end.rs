//! Drives the client against a real HTTP server standing in for the queue
//! backend.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::time::timeout;

use caresre_opd_client::config::Config;
use caresre_opd_client::queue_client::{Endpoint, Gateway, HttpGateway, QueueClient, RegistrationRequest, TokenId};
use caresre_opd_client::sync::{DashboardAggregator, RegistrationFlow, RegistrationState, TokenStatusTracker};
use caresre_opd_client::types::{DashboardSource, NetworkErrorKind};

const WAIT: Duration = Duration::from_secs(5);

#[derive(Clone, Default)]
struct Backend {
    registrations: Arc<Mutex<Vec<Value>>>,
    status_polls: Arc<AtomicUsize>,
}

async fn register_patient(State(backend): State<Backend>, Json(body): Json<Value>) -> Json<Value> {
    backend.registrations.lock().unwrap().push(body);
    Json(json!({"token": "T42", "patient_id": "P-42", "token_number": 42}))
}

async fn token_status(State(backend): State<Backend>, Path(id): Path<String>) -> impl IntoResponse {
    if id != "T42" {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Token not found"})));
    }
    let poll = backend.status_polls.fetch_add(1, Ordering::SeqCst);
    let body = if poll == 0 {
        json!({"token_number": "T42", "status": "waiting", "position": 3, "wait_time": 15})
    } else {
        json!({"token_number": "T42", "status": "completed"})
    };
    (StatusCode::OK, Json(body))
}

async fn spawn_backend(backend: Backend) -> SocketAddr {
    let app = Router::new()
        .route("/register-patient", post(register_patient))
        .route("/token-status/{id}", get(token_status))
        .route("/opd-load", get(|| async { "not json" }))
        .route(
            "/doctor-availability",
            get(|| async { Json(json!({"doctors": {"Dr. Rao": {"available": true}}})) }),
        )
        .route("/alerts", get(|| async { Json(json!([])) }))
        .route("/insights", get(|| async { Json(json!({"insights": []})) }))
        .with_state(backend);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn config_for(addr: SocketAddr) -> Config {
    Config {
        api_base_url: format!("http://{addr}"),
        interval_ms: 100,
        request_timeout_ms: 2000,
        ..Config::default()
    }
}

fn client_for(config: &Config) -> QueueClient {
    QueueClient::new(Arc::new(HttpGateway::new(config).unwrap()))
}

#[tokio::test]
async fn register_then_track_until_completed() {
    let backend = Backend::default();
    let addr = spawn_backend(backend.clone()).await;
    let config = config_for(addr);
    let client = client_for(&config);

    let flow = RegistrationFlow::new(client.clone());
    let receipt = flow
        .submit(RegistrationRequest::new("Asha", 34, "fever"))
        .await
        .unwrap();
    assert_eq!(receipt.token.as_str(), "T42");
    assert!(matches!(flow.state(), RegistrationState::Succeeded(_)));

    let sent = backend.registrations.lock().unwrap().clone();
    assert_eq!(
        sent,
        vec![json!({"name": "Asha", "age": 34, "symptoms": "fever", "contact": "", "history": ""})]
    );

    let mut tracker = TokenStatusTracker::new(client, config.polling());
    let mut updates = tracker.subscribe();
    tracker.bind(receipt.token.clone());

    let waiting = timeout(WAIT, updates.wait_for(|state| state.snapshot.is_some()))
        .await
        .unwrap()
        .unwrap()
        .clone();
    let first = waiting.snapshot.unwrap();
    assert_eq!(first.status, "waiting");
    assert_eq!(first.position, Some(3));
    assert_eq!(first.estimated_wait_minutes, Some(15));

    let done = timeout(WAIT, updates.wait_for(|state| state.finished))
        .await
        .unwrap()
        .unwrap()
        .clone();
    let last = done.snapshot.unwrap();
    assert_eq!(last.status, "completed");
    assert_eq!(last.position, None);
    assert_eq!(last.estimated_wait_minutes, None);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(backend.status_polls.load(Ordering::SeqCst), 2);
    assert!(!tracker.is_polling());
}

#[tokio::test]
async fn unknown_token_is_an_http_status_error() {
    let addr = spawn_backend(Backend::default()).await;
    let client = client_for(&config_for(addr));

    let err = client.token_status(&TokenId::from("T99")).await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert!(err.detail.contains("Token not found"));
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    let addr = spawn_backend(Backend::default()).await;
    let gateway = HttpGateway::new(&config_for(addr)).unwrap();

    assert_eq!(gateway.base_url().as_str(), format!("http://{addr}/"));

    let err = gateway.request(&Endpoint::OpdLoad, None).await.unwrap_err();

    assert!(err.is_decode());
}

#[tokio::test]
async fn unreachable_backend_is_a_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = client_for(&config_for(addr));

    let err = client.insights().await.unwrap_err();

    assert_eq!(err.kind, NetworkErrorKind::Connect);
}

#[tokio::test]
async fn dashboard_reports_the_failing_source() {
    let addr = spawn_backend(Backend::default()).await;
    let config = config_for(addr);
    let dashboard = DashboardAggregator::new(client_for(&config), config.polling());
    let mut updates = dashboard.subscribe();

    dashboard.start();
    let state = timeout(WAIT, updates.wait_for(|state| state.last_error.is_some()))
        .await
        .unwrap()
        .unwrap()
        .clone();
    dashboard.stop();

    assert!(state.snapshot.is_none());
    assert_eq!(
        state.last_error.unwrap().failed_sources(),
        vec![DashboardSource::OpdLoad]
    );
}
