use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::Json;
use axum::Router;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::engine::roster::refresh_drivers;
use crate::engine::stats::{dashboard_stats, monitor_stats, DashboardStats, MonitorStats};
use crate::error::AppError;
use crate::notify::{ConsoleEvent, Notification};
use crate::state::AppState;
use crate::views::{UnknownSection, ViewState};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard/stats", get(dashboard))
        .route("/monitor/stats", get(monitor))
        .route("/views", get(current_view))
        .route("/views/:section", post(show_view))
        .route("/notifications", get(notifications))
        .route("/notifications/:id", delete(dismiss_notification))
        .route("/map/refresh", post(start_map_refresh).delete(stop_map_refresh))
}

#[derive(Serialize)]
pub struct MapRefreshState {
    pub running: bool,
    pub changed: bool,
}

async fn dashboard(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
) -> Json<DashboardStats> {
    let drivers = match refresh_drivers(&state).await {
        Ok(drivers) => drivers,
        Err(err) => {
            warn!(error = %err, "dashboard falling back to cached roster");
            state.drivers().await
        }
    };

    Json(dashboard_stats(&drivers))
}

async fn monitor(_session: AdminSession, State(state): State<Arc<AppState>>) -> Json<MonitorStats> {
    let stats = monitor_stats(&state).await;
    let _ = state.events_tx.send(ConsoleEvent::Monitor {
        stats: stats.clone(),
    });
    Json(stats)
}

async fn current_view(_session: AdminSession, State(state): State<Arc<AppState>>) -> Json<ViewState> {
    Json(state.view_state())
}

async fn show_view(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(raw): Path<String>,
) -> Result<Json<ViewState>, AppError> {
    state
        .show_named(&raw)
        .map(Json)
        .map_err(|UnknownSection(raw)| AppError::NotFound(format!("unknown section {raw}")))
}

async fn notifications(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
) -> Json<Vec<Notification>> {
    Json(state.notifier.recent())
}

async fn dismiss_notification(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.notifier.dismiss(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("notification {id} not found")))
    }
}

async fn start_map_refresh(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
) -> Json<MapRefreshState> {
    let changed = state.start_map_refresh();
    Json(MapRefreshState {
        running: state.map_refresher.is_running(),
        changed,
    })
}

async fn stop_map_refresh(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
) -> Json<MapRefreshState> {
    let changed = state.map_refresher.stop();
    Json(MapRefreshState {
        running: state.map_refresher.is_running(),
        changed,
    })
}
