use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::auth::AdminSession;
use crate::engine::drivers::{
    create_driver, delete_driver, update_driver, CreateDriverRequest, UpdateDriverRequest,
};
use crate::engine::map::{map_view, MapView};
use crate::engine::passengers::PLACEHOLDER_IMAGE;
use crate::engine::roster::refresh_drivers;
use crate::error::AppError;
use crate::models::driver::{DriverStatus, DriverView, GeoPoint, RuntimeStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", get(list_drivers).post(create))
        .route("/drivers/map", get(driver_map))
        .route("/drivers/:id", get(get_driver).patch(update).delete(remove))
}

#[derive(Debug, Default, Deserialize)]
pub struct DriverSearch {
    #[serde(default)]
    pub q: Option<String>,
}

/// One row of the driver management table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRow {
    pub id: String,
    pub short_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub vehicle: String,
    pub status: DriverStatus,
    pub runtime_status: RuntimeStatus,
    pub status_class: &'static str,
    pub status_text: &'static str,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
}

impl From<&DriverView> for DriverRow {
    fn from(driver: &DriverView) -> Self {
        let record = &driver.record;
        let (status_class, status_text) = match driver.runtime_status {
            RuntimeStatus::Online => ("status-active", "Online"),
            RuntimeStatus::Booked => ("status-booked", "Booked"),
            RuntimeStatus::Offline => ("status-inactive", "Offline"),
        };

        Self {
            id: record.id.clone(),
            short_id: record.id.chars().take(8).collect(),
            name: record.name.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            vehicle: record
                .vehicle
                .as_ref()
                .map(|v| v.summary())
                .unwrap_or_else(|| "N/A".to_string()),
            status: record.status,
            runtime_status: driver.runtime_status,
            status_class,
            status_text,
            image: driver
                .profile_image_url
                .clone()
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            location: record.location,
        }
    }
}

#[derive(Serialize)]
pub struct DriverTable {
    pub drivers: Vec<DriverRow>,
    pub empty: bool,
}

#[derive(Serialize)]
pub struct CreatedDriver {
    pub id: String,
}

async fn list_drivers(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(search): Query<DriverSearch>,
) -> Result<Json<DriverTable>, AppError> {
    let drivers = refresh_drivers(&state).await?;
    let term = search.q.unwrap_or_default();

    let rows: Vec<DriverRow> = drivers
        .iter()
        .filter(|driver| driver.matches_search(term.trim()))
        .map(DriverRow::from)
        .collect();

    Ok(Json(DriverTable {
        empty: rows.is_empty(),
        drivers: rows,
    }))
}

async fn create(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateDriverRequest>,
) -> Result<(StatusCode, Json<CreatedDriver>), AppError> {
    let id = create_driver(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(CreatedDriver { id })))
}

async fn get_driver(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
) -> Result<Json<DriverView>, AppError> {
    let drivers = refresh_drivers(&state).await?;
    drivers
        .iter()
        .find(|driver| driver.id() == driver_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("driver {driver_id} not found")))
}

async fn update(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
    Json(payload): Json<UpdateDriverRequest>,
) -> Result<StatusCode, AppError> {
    update_driver(&state, &driver_id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
) -> Result<StatusCode, AppError> {
    delete_driver(&state, &driver_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Markers from the last reconciled roster; the map timer keeps it current.
async fn driver_map(_session: AdminSession, State(state): State<Arc<AppState>>) -> Json<MapView> {
    Json(map_view(&state.drivers().await))
}
