use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::auth::AdminSession;
use crate::engine::reports::{load_reports, reports_today, resolve_report, ReportRow};
use crate::error::AppError;
use crate::models::report::ReportFilter;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reports", get(list_reports))
        .route("/reports/today", get(today_count))
        .route("/reports/:id/resolve", post(resolve))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportParams {
    #[serde(default)]
    pub filter: ReportFilter,
}

#[derive(Serialize)]
pub struct ReportList {
    pub reports: Vec<ReportRow>,
    pub empty: bool,
}

#[derive(Serialize)]
pub struct TodayCount {
    pub count: usize,
}

async fn list_reports(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportParams>,
) -> Result<Json<ReportList>, AppError> {
    let reports = load_reports(&state, params.filter).await?;
    Ok(Json(ReportList {
        empty: reports.is_empty(),
        reports,
    }))
}

async fn resolve(
    session: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(report_id): Path<String>,
) -> Result<StatusCode, AppError> {
    resolve_report(&state, &report_id, &session.uid).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn today_count(_session: AdminSession, State(state): State<Arc<AppState>>) -> Json<TodayCount> {
    Json(TodayCount {
        count: reports_today(&state).await,
    })
}
