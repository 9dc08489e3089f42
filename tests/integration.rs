use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{Days, FixedOffset, Utc};
use fleet_console::api::rest::router;
use fleet_console::backend::memory::{FailPoint, MemoryBackend};
use fleet_console::backend::{Backend, BOOKING_HISTORY, DRIVERS, REPORTS, USERS};
use fleet_console::config::Config;
use fleet_console::engine::earnings::TimeWindow;
use fleet_console::engine::worker::{run_refresh_worker, RefreshRequest};
use fleet_console::models::driver::RuntimeStatus;
use fleet_console::notify::ConsoleEvent;
use fleet_console::state::AppState;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

const ADMIN_EMAIL: &str = "admin@fleet.test";
const ADMIN_PASSWORD: &str = "secret123";

struct Console {
    app: Router,
    state: Arc<AppState>,
    backend: Arc<MemoryBackend>,
    refresh_rx: Option<mpsc::Receiver<RefreshRequest>>,
}

impl Console {
    fn spawn_worker(&mut self) {
        let refresh_rx = self.refresh_rx.take().unwrap();
        tokio::spawn(run_refresh_worker(self.state.clone(), refresh_rx));
    }

    /// Opens a session without going through login, so nothing is queued.
    fn open_session(&self) -> String {
        let session = self
            .state
            .sessions
            .open("admin-1".to_string(), ADMIN_EMAIL.to_string());
        session.token.to_string()
    }
}

fn setup() -> Console {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_account("admin-1", ADMIN_EMAIL, ADMIN_PASSWORD);
    backend.insert_document(USERS, "admin-1", json!({ "role": "Admin", "name": "Ada" }));

    let (state, refresh_rx) = AppState::new(Backend::from_memory(backend.clone()), &Config::default());
    let state = Arc::new(state);

    Console {
        app: router(state.clone()),
        state,
        backend,
        refresh_rx: Some(refresh_rx),
    }
}

fn seed_roster(backend: &MemoryBackend) {
    backend.insert_document(DRIVERS, "A", json!({ "name": "Alma", "email": "alma@fleet.test", "status": "active" }));
    backend.insert_document(DRIVERS, "B", json!({ "name": "Berto", "email": "berto@fleet.test", "status": "active" }));
    backend.insert_document(DRIVERS, "C", json!({ "name": "Cora", "email": "cora@fleet.test", "status": "pending" }));

    backend.set_presence("A", json!({ "isOnline": true, "location": { "latitude": 10.0, "longitude": 20.0 } }));
    backend.set_presence("B", json!({ "isOnline": "false" }));

    backend.insert_document(
        BOOKING_HISTORY,
        "trip-1",
        json!({ "driverId": "B", "riderId": "r1", "status": "ONGOING", "timestamp": Utc::now().timestamp_millis() }),
    );
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn authed(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    body["token"].as_str().unwrap().to_string()
}

async fn wait_for_roster(state: &AppState, len: usize) -> bool {
    for _ in 0..200 {
        if state.drivers().await.len() == len {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

fn earnings_row<'a>(report: &'a Value, id: &str) -> &'a Value {
    report["rows"]
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["driverId"] == id)
        .unwrap()
}

fn driver<'a>(table: &'a Value, id: &str) -> &'a Value {
    table["drivers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["id"] == id)
        .unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let console = setup();
    let response = console.app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["drivers"], 0);
    assert_eq!(body["sessions"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let console = setup();
    seed_roster(&console.backend);
    let token = login(&console.app).await;

    let response = console
        .app
        .clone()
        .oneshot(authed("GET", "/drivers", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = console.app.oneshot(get_request("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("reconciliations_total"));
    assert!(body.contains("drivers_by_runtime_status"));
    assert!(body.contains("map_refresh_ticks_total"));
}

#[tokio::test]
async fn login_requires_both_fields() {
    let console = setup();
    let response = console
        .app
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": "" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Please enter both email and password");
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let console = setup();
    let response = console
        .app
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": "nope-nope" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_admin_login_is_denied() {
    let console = setup();
    console.backend.add_account("rider-1", "rider@fleet.test", "ridepass");
    console
        .backend
        .insert_document(USERS, "rider-1", json!({ "role": "Rider", "name": "Rae" }));

    let response = console
        .app
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            json!({ "email": "rider@fleet.test", "password": "ridepass" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Access denied: Only Admins can log in.");
    assert!(console.state.sessions.is_empty());
}

#[tokio::test]
async fn console_routes_require_a_session() {
    let console = setup();

    let response = console
        .app
        .clone()
        .oneshot(get_request("/drivers"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = console
        .app
        .oneshot(authed("GET", "/drivers", &uuid::Uuid::new_v4().to_string()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_starts_the_map_refresh_once() {
    let console = setup();
    let _first = login(&console.app).await;
    let _second = login(&console.app).await;

    assert!(console.state.map_refresher.is_running());
    assert_eq!(console.state.sessions.len(), 2);
}

#[tokio::test]
async fn drivers_are_reconciled_from_presence_and_bookings() {
    let console = setup();
    seed_roster(&console.backend);
    let token = login(&console.app).await;

    let response = console
        .app
        .clone()
        .oneshot(authed("GET", "/drivers", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let table = body_json(response).await;
    assert_eq!(table["empty"], false);

    let a = driver(&table, "A");
    assert_eq!(a["runtimeStatus"], "online");
    assert_eq!(a["statusClass"], "status-active");
    assert_eq!(a["location"]["latitude"], 10.0);
    assert_eq!(a["location"]["longitude"], 20.0);

    let b = driver(&table, "B");
    assert_eq!(b["runtimeStatus"], "booked");
    assert_eq!(b["statusText"], "Booked");

    let c = driver(&table, "C");
    assert_eq!(c["runtimeStatus"], "offline");
    assert_eq!(c["vehicle"], "N/A");

    let response = console
        .app
        .oneshot(authed("GET", "/drivers/map", &token))
        .await
        .unwrap();
    let map = body_json(response).await;
    assert_eq!(map["markers"].as_array().unwrap().len(), 1);
    assert_eq!(map["markers"][0]["driverId"], "A");
}

#[tokio::test]
async fn driver_search_filters_rows() {
    let console = setup();
    seed_roster(&console.backend);
    let token = login(&console.app).await;

    let response = console
        .app
        .clone()
        .oneshot(authed("GET", "/drivers?q=BERTO", &token))
        .await
        .unwrap();
    let table = body_json(response).await;
    let rows = table["drivers"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "B");

    let response = console
        .app
        .oneshot(authed("GET", "/drivers?q=nobody", &token))
        .await
        .unwrap();
    let table = body_json(response).await;
    assert_eq!(table["empty"], true);
}

#[tokio::test]
async fn presence_failure_degrades_to_offline_with_notification() {
    let console = setup();
    seed_roster(&console.backend);
    let token = login(&console.app).await;
    console.backend.fail(FailPoint::PresenceRead);

    let response = console
        .app
        .clone()
        .oneshot(authed("GET", "/drivers", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let table = body_json(response).await;
    assert_eq!(driver(&table, "A")["runtimeStatus"], "offline");
    assert_eq!(driver(&table, "B")["runtimeStatus"], "booked");
    assert_eq!(driver(&table, "C")["runtimeStatus"], "offline");

    let response = console
        .app
        .oneshot(authed("GET", "/notifications", &token))
        .await
        .unwrap();
    let notifications = body_json(response).await;
    let first = &notifications[0];
    assert_eq!(first["level"], "error");
    assert!(first["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to load driver presence"));
}

#[tokio::test]
async fn roster_failure_is_reported() {
    let console = setup();
    seed_roster(&console.backend);
    let token = login(&console.app).await;
    console.backend.fail(FailPoint::GetAll(DRIVERS.to_string()));

    let response = console
        .app
        .oneshot(authed("GET", "/drivers", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let recent = console.state.notifier.recent();
    assert!(recent[0].message.starts_with("Error loading drivers"));
}

#[tokio::test]
async fn create_driver_validates_and_creates() {
    let console = setup();
    let token = login(&console.app).await;

    let response = console
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/drivers",
            Some(&token),
            json!({ "name": "Dina", "email": "dina@fleet.test", "password": "123", "phone": "0917" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = console
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/drivers",
            Some(&token),
            json!({
                "name": "Dina",
                "email": "dina@fleet.test",
                "password": "123456",
                "phone": "0917",
                "vehicle": { "make": "Toyota", "model": "Vios", "color": "white" }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();

    let response = console
        .app
        .oneshot(authed("GET", &format!("/drivers/{id}"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view = body_json(response).await;
    assert_eq!(view["status"], "active");
    assert_eq!(view["runtimeStatus"], "offline");
}

#[tokio::test]
async fn update_falls_back_to_document_merge() {
    let console = setup();
    seed_roster(&console.backend);
    let token = login(&console.app).await;
    console.backend.fail(FailPoint::UpdateDriverAccount);

    let response = console
        .app
        .clone()
        .oneshot(json_request(
            "PATCH",
            "/drivers/C",
            Some(&token),
            json!({ "name": "Cora Cruz", "email": "cora@fleet.test", "phone": "0918" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let recent = console.state.notifier.recent();
    assert_eq!(recent[0].message, "Driver updated (document store).");

    let response = console
        .app
        .oneshot(authed("GET", "/drivers/C", &token))
        .await
        .unwrap();
    let view = body_json(response).await;
    assert_eq!(view["name"], "Cora Cruz");
    assert_eq!(view["status"], "active");
}

#[tokio::test]
async fn delete_unknown_driver_is_not_found() {
    let console = setup();
    let token = login(&console.app).await;

    let response = console
        .app
        .oneshot(authed("DELETE", "/drivers/ghost", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn earnings_for_today_exclude_other_days() {
    let console = setup();
    seed_roster(&console.backend);
    let token = login(&console.app).await;

    let now = Utc::now().timestamp_millis();
    let yesterday = now - 24 * 60 * 60 * 1000;
    console.backend.insert_document(
        BOOKING_HISTORY,
        "e1",
        json!({ "driverId": "A", "status": "COMPLETED", "finalFare": 100, "timestamp": now }),
    );
    console.backend.insert_document(
        BOOKING_HISTORY,
        "e2",
        json!({ "driverId": "A", "status": "COMPLETED", "timestamp": now }),
    );
    console.backend.insert_document(
        BOOKING_HISTORY,
        "e3",
        json!({ "driverId": "B", "status": "COMPLETED", "finalFare": 50, "timestamp": yesterday }),
    );

    let today = Utc::now().date_naive();
    let response = console
        .app
        .oneshot(authed(
            "GET",
            &format!("/earnings?start={today}&end={today}"),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report = body_json(response).await;
    let rows = report["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["driverId"], "A");
    assert_eq!(rows[0]["total"], 100.0);
    assert_eq!(rows[0]["count"], 2);
    assert_eq!(earnings_row(&report, "B")["count"], 0);
    assert_eq!(earnings_row(&report, "B")["total"], 0.0);
    assert_eq!(earnings_row(&report, "C")["count"], 0);
    assert_eq!(report["grandTotal"], 100.0);
    assert_eq!(report["empty"], false);
}

#[tokio::test]
async fn earnings_skip_malformed_bookings_and_accept_float_timestamps() {
    let console = setup();
    seed_roster(&console.backend);
    let token = login(&console.app).await;

    let now = Utc::now().timestamp_millis();
    console.backend.insert_document(
        BOOKING_HISTORY,
        "f1",
        json!({ "driverId": "A", "status": "COMPLETED", "finalFare": 150, "timestamp": now as f64 + 0.5 }),
    );
    console.backend.insert_document(
        BOOKING_HISTORY,
        "f2",
        json!({ "driverId": "A", "status": "COMPLETED", "finalFare": 40, "riderName": ["not", "text"], "timestamp": now }),
    );

    let today = Utc::now().date_naive();
    let response = console
        .app
        .oneshot(authed(
            "GET",
            &format!("/earnings?start={today}&end={today}"),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report = body_json(response).await;
    assert_eq!(earnings_row(&report, "A")["total"], 150.0);
    assert_eq!(earnings_row(&report, "A")["count"], 1);
    assert_eq!(report["grandTotal"], 150.0);
}

#[tokio::test]
async fn earnings_default_to_the_week_before_today() {
    let console = setup();
    let token = login(&console.app).await;

    let response = console
        .app
        .oneshot(authed("GET", "/earnings", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let report = body_json(response).await;
    let utc = FixedOffset::east_opt(0).unwrap();
    let today = Utc::now().date_naive();
    let start = today.checked_sub_days(Days::new(7)).unwrap();
    assert_eq!(report["window"]["startMs"], TimeWindow::for_day(start, utc).start_ms);
    assert_eq!(report["window"]["endMs"], TimeWindow::for_day(today, utc).end_ms);
    assert_eq!(report["empty"], true);
}

#[tokio::test]
async fn earnings_reject_inverted_range() {
    let console = setup();
    let token = login(&console.app).await;

    let response = console
        .app
        .oneshot(authed(
            "GET",
            "/earnings?start=2026-10-20&end=2026-10-19",
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn usage_for_an_empty_day_is_an_empty_state() {
    let console = setup();
    let token = login(&console.app).await;

    let response = console
        .app
        .oneshot(authed("GET", "/usage?date=2020-01-01", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let usage = body_json(response).await;
    assert_eq!(usage["empty"], true);
    assert_eq!(usage["total"], 0);
    assert_eq!(usage["buckets"].as_array().unwrap().len(), 24);
}

#[tokio::test]
async fn usage_counts_valid_bookings_next_to_malformed_ones() {
    let console = setup();
    let token = login(&console.app).await;

    let now = Utc::now().timestamp_millis();
    console.backend.insert_document(
        BOOKING_HISTORY,
        "u1",
        json!({ "riderName": "Rita", "status": "COMPLETED", "timestamp": now }),
    );
    console.backend.insert_document(
        BOOKING_HISTORY,
        "u2",
        json!({ "riderId": 42, "status": null, "timestamp": now }),
    );
    console.backend.insert_document(
        BOOKING_HISTORY,
        "u3",
        json!({ "riderName": { "first": "Ned" }, "status": "COMPLETED", "timestamp": now }),
    );

    let today = Utc::now().date_naive();
    let response = console
        .app
        .oneshot(authed("GET", &format!("/usage?date={today}"), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let usage = body_json(response).await;
    assert_eq!(usage["total"], 2);
    let riders: Vec<&str> = usage["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["riderName"].as_str().unwrap())
        .collect();
    assert!(riders.contains(&"Rita"));
    assert!(riders.contains(&"42"));
}

#[tokio::test]
async fn passengers_list_with_last_booking() {
    let console = setup();
    console
        .backend
        .insert_document(USERS, "r1", json!({ "role": "Rider", "displayName": "Rae", "email": "rae@fleet.test" }));
    console.backend.insert_document(
        BOOKING_HISTORY,
        "p1",
        json!({ "riderId": "r1", "status": "COMPLETED", "estimatedFare": 90, "timestamp": 1_700_000_000_000i64 }),
    );
    let token = login(&console.app).await;

    let response = console
        .app
        .clone()
        .oneshot(authed("GET", "/passengers", &token))
        .await
        .unwrap();
    let list = body_json(response).await;
    let passengers = list["passengers"].as_array().unwrap();
    assert_eq!(passengers.len(), 1);
    assert_eq!(passengers[0]["name"], "Rae");
    assert_eq!(passengers[0]["lastBookingAt"], 1_700_000_000_000i64);

    let response = console
        .app
        .oneshot(authed("GET", "/passengers/r1/last-booking", &token))
        .await
        .unwrap();
    let last = body_json(response).await;
    assert_eq!(last["empty"], false);
    assert_eq!(last["booking"]["fare"], 90.0);
}

#[tokio::test]
async fn reports_filter_and_resolve() {
    let console = setup();
    seed_roster(&console.backend);
    console.backend.insert_document(
        REPORTS,
        "rep-1",
        json!({ "driverId": "A", "reporterId": "ghost", "message": "Late pickup", "timestamp": 1_700_000_000_000i64 }),
    );
    let token = login(&console.app).await;

    let response = console
        .app
        .clone()
        .oneshot(authed("GET", "/reports?filter=open", &token))
        .await
        .unwrap();
    let list = body_json(response).await;
    let reports = list["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["driverName"], "Alma");
    assert_eq!(reports[0]["reporterName"], "ghost");
    assert_eq!(reports[0]["statusLabel"], "Open");

    let response = console
        .app
        .clone()
        .oneshot(authed("POST", "/reports/rep-1/resolve", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = console
        .app
        .clone()
        .oneshot(authed("GET", "/reports?filter=open", &token))
        .await
        .unwrap();
    let list = body_json(response).await;
    assert_eq!(list["empty"], true);

    let response = console
        .app
        .oneshot(authed("POST", "/reports/missing/resolve", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn views_switch_sections() {
    let console = setup();
    let token = login(&console.app).await;

    let response = console
        .app
        .clone()
        .oneshot(authed("POST", "/views/manageDrivers", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let view = body_json(response).await;
    assert_eq!(view["current"], "manageDrivers");
    assert_eq!(view["title"], "Manage Drivers");

    let visible: Vec<&Value> = view["sections"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|s| s["visible"] == true)
        .collect();
    assert_eq!(visible.len(), 1);

    let response = console
        .app
        .oneshot(authed("POST", "/views/settings", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        console.state.view_state().current,
        fleet_console::views::Section::ManageDrivers
    );
}

#[tokio::test]
async fn logout_resets_the_console() {
    let console = setup();
    seed_roster(&console.backend);
    let token = login(&console.app).await;

    console
        .app
        .clone()
        .oneshot(authed("GET", "/drivers", &token))
        .await
        .unwrap();
    console
        .app
        .clone()
        .oneshot(authed("POST", "/views/monitorDrivers", &token))
        .await
        .unwrap();
    assert_eq!(console.state.drivers().await.len(), 3);

    let response = console
        .app
        .clone()
        .oneshot(authed("POST", "/auth/logout", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(console.state.drivers().await.is_empty());
    assert!(!console.state.map_refresher.is_running());
    assert_eq!(
        console.state.view_state().current,
        fleet_console::views::Section::Dashboard
    );

    let response = console
        .app
        .oneshot(authed("GET", "/auth/me", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn dashboard_stats_count_roster() {
    let console = setup();
    seed_roster(&console.backend);
    let token = login(&console.app).await;

    let response = console
        .app
        .oneshot(authed("GET", "/dashboard/stats", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stats = body_json(response).await;
    assert_eq!(stats["totalDrivers"], 3);
    assert_eq!(stats["activeDrivers"], 2);
    assert_eq!(stats["pendingDrivers"], 1);
    assert_eq!(stats["runtime"]["booked"], 1);
    assert_eq!(stats["recentActivities"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn logout_resets_even_when_provider_sign_out_fails() {
    let console = setup();
    seed_roster(&console.backend);
    let token = login(&console.app).await;

    console
        .app
        .clone()
        .oneshot(authed("GET", "/drivers", &token))
        .await
        .unwrap();
    assert_eq!(console.state.drivers().await.len(), 3);
    console.backend.fail(FailPoint::SignOut);

    let response = console
        .app
        .clone()
        .oneshot(authed("POST", "/auth/logout", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(console.state.sessions.is_empty());
    assert!(console.state.drivers().await.is_empty());
    assert!(!console.state.map_refresher.is_running());
    assert!(console.state.notifier.recent()[0]
        .message
        .starts_with("Sign-out failed"));
}

#[tokio::test]
async fn manage_drivers_view_refreshes_through_the_worker() {
    let mut console = setup();
    seed_roster(&console.backend);
    console.spawn_worker();
    let token = console.open_session();

    let response = console
        .app
        .clone()
        .oneshot(authed("POST", "/views/manageDrivers", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(wait_for_roster(&console.state, 3).await);
    let drivers = console.state.drivers().await;
    let status = |id: &str| {
        drivers
            .iter()
            .find(|d| d.record.id == id)
            .map(|d| d.runtime_status)
            .unwrap()
    };
    assert_eq!(status("A"), RuntimeStatus::Online);
    assert_eq!(status("B"), RuntimeStatus::Booked);
    assert_eq!(status("C"), RuntimeStatus::Offline);
}

#[tokio::test]
async fn monitor_view_broadcasts_stats_from_the_worker() {
    let mut console = setup();
    seed_roster(&console.backend);
    console
        .backend
        .insert_document(REPORTS, "r1", json!({ "message": "late", "timestamp": Utc::now().timestamp_millis() }));
    console.spawn_worker();
    let token = console.open_session();
    let mut events = console.state.events_tx.subscribe();

    console
        .app
        .clone()
        .oneshot(authed("POST", "/views/monitorDrivers", &token))
        .await
        .unwrap();

    let stats = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(ConsoleEvent::Monitor { stats }) = events.recv().await {
                return stats;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(stats.active_rides, 1);
    assert_eq!(stats.open_reports, 1);
}

#[tokio::test]
async fn booked_set_failure_through_the_worker_keeps_presence() {
    let mut console = setup();
    seed_roster(&console.backend);
    console.backend.fail(FailPoint::BookedDrivers);
    console.spawn_worker();
    let token = console.open_session();

    console
        .app
        .clone()
        .oneshot(authed("POST", "/views/manageDrivers", &token))
        .await
        .unwrap();

    assert!(wait_for_roster(&console.state, 3).await);
    let drivers = console.state.drivers().await;
    let status = |id: &str| {
        drivers
            .iter()
            .find(|d| d.record.id == id)
            .map(|d| d.runtime_status)
            .unwrap()
    };
    assert_eq!(status("A"), RuntimeStatus::Online);
    assert_eq!(status("B"), RuntimeStatus::Offline);
    assert!(console
        .state
        .notifier
        .recent()
        .iter()
        .any(|n| n.message.starts_with("Failed to load booked drivers")));
}

#[tokio::test]
async fn refreshes_queued_before_logout_do_not_repopulate_the_roster() {
    let mut console = setup();
    seed_roster(&console.backend);
    let token = login(&console.app).await;

    let response = console
        .app
        .clone()
        .oneshot(authed("POST", "/auth/logout", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // login queued a table refresh and the first map tick
    console.spawn_worker();
    console.state.request_refresh(RefreshRequest::DriverTable);
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(console.state.drivers().await.is_empty());
}

#[tokio::test]
async fn stale_refresh_cannot_publish_after_reset() {
    let console = setup();
    seed_roster(&console.backend);
    let token = login(&console.app).await;

    let stale = console.state.roster_epoch();
    console
        .app
        .clone()
        .oneshot(authed("POST", "/auth/logout", &token))
        .await
        .unwrap();

    let roster = Arc::new(Vec::new());
    assert!(!console.state.replace_drivers(stale, roster.clone()).await);
    assert!(console.state.replace_drivers(console.state.roster_epoch(), roster).await);
}
