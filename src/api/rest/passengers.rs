use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::auth::AdminSession;
use crate::engine::passengers::{last_booking, load_passengers, LastBooking, PassengerRow};
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/passengers", get(list_passengers))
        .route("/passengers/:id/last-booking", get(passenger_last_booking))
}

#[derive(Debug, Default, Deserialize)]
pub struct PassengerSearch {
    pub q: Option<String>,
}

#[derive(Serialize)]
pub struct PassengerList {
    pub passengers: Vec<PassengerRow>,
    pub empty: bool,
}

#[derive(Serialize)]
pub struct LastBookingResponse {
    pub booking: Option<LastBooking>,
    pub empty: bool,
}

async fn list_passengers(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Query(search): Query<PassengerSearch>,
) -> Result<Json<PassengerList>, AppError> {
    let passengers = load_passengers(&state, search.q.as_deref()).await?;
    Ok(Json(PassengerList {
        empty: passengers.is_empty(),
        passengers,
    }))
}

async fn passenger_last_booking(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    Path(passenger_id): Path<String>,
) -> Result<Json<LastBookingResponse>, AppError> {
    let booking = last_booking(&state, &passenger_id).await?;
    Ok(Json(LastBookingResponse {
        empty: booking.is_none(),
        booking,
    }))
}
