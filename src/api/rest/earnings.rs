use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use chrono::{Days, NaiveDate, Utc};
use serde::Deserialize;

use crate::auth::AdminSession;
use crate::engine::earnings::{
    driver_history, load_earnings, EarningsReport, EarningsSort, HistoryEntry, TimeWindow,
};
use crate::engine::usage::{load_usage, HourlyUsage};
use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_LOOKBACK_DAYS: u64 = 7;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/earnings", get(earnings))
        .route("/earnings/:driver_id/history", get(history))
        .route("/usage", get(usage))
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeParams {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub sort: EarningsSort,
}

#[derive(Debug, Default, Deserialize)]
pub struct UsageParams {
    pub date: Option<NaiveDate>,
}

fn today(state: &AppState) -> NaiveDate {
    Utc::now().with_timezone(&state.utc_offset).date_naive()
}

/// A missing start defaults to seven days before the end, which is today
/// unless given, so the default range spans eight calendar days.
fn window_for(state: &AppState, params: &RangeParams) -> Result<TimeWindow, AppError> {
    let end = params.end.unwrap_or_else(|| today(state));
    let start = match params.start {
        Some(start) => start,
        None => end
            .checked_sub_days(Days::new(DEFAULT_LOOKBACK_DAYS))
            .ok_or_else(|| AppError::BadRequest(format!("end date {end} out of range")))?,
    };

    TimeWindow::for_days(start, end, state.utc_offset)
}

async fn earnings(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(params): Query<RangeParams>,
) -> Result<Json<EarningsReport>, AppError> {
    let window = window_for(&state, &params)?;
    Ok(Json(load_earnings(&state, window, params.sort).await?))
}

async fn history(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
    Query(params): Query<RangeParams>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let window = window_for(&state, &params)?;
    Ok(Json(driver_history(&state, &driver_id, window).await?))
}

async fn usage(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(params): Query<UsageParams>,
) -> Result<Json<HourlyUsage>, AppError> {
    let day = params.date.unwrap_or_else(|| today(&state));
    Ok(Json(load_usage(&state, day).await?))
}
