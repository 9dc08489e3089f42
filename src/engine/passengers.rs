use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::backend::{decode_all, BackendError, Direction, FilterOp, Query, BOOKING_HISTORY, USERS};
use crate::error::AppError;
use crate::models::booking::BookingRecord;
use crate::models::lenient::millis_value;
use crate::models::user::{UserRecord, PASSENGER_ROLES};
use crate::state::AppState;

pub const PLACEHOLDER_IMAGE: &str = "img/driver-placeholder.svg";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassengerRow {
    pub id: String,
    pub short_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub loyalty_points: f64,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_booking_at: Option<i64>,
}

impl PassengerRow {
    fn new(user: &UserRecord, last_booking_at: Option<i64>) -> Self {
        Self {
            id: user.id.clone(),
            short_id: user.id.chars().take(8).collect(),
            name: user.display_name().to_string(),
            email: user.email.clone().unwrap_or_default(),
            phone: user.phone.clone().unwrap_or_default(),
            loyalty_points: user.loyalty_points.unwrap_or(0.0),
            image: user
                .profile_image_url
                .clone()
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
            last_booking_at,
        }
    }
}

/// Users with a passenger role. Falls back to scanning every user when the
/// role query is rejected.
async fn fetch_passengers(state: &AppState) -> Result<Vec<UserRecord>, BackendError> {
    let query = Query::new().filter("role", FilterOp::In, json!(PASSENGER_ROLES));

    let docs = match state.backend.documents.query(USERS, &query).await {
        Ok(docs) => docs,
        Err(err) => {
            warn!(error = %err, "role query failed; filtering all users");
            state.backend.documents.get_all(USERS).await?
        }
    };

    Ok(decode_all::<UserRecord>(&docs)
        .into_iter()
        .filter(UserRecord::is_passenger)
        .collect())
}

/// Latest booking timestamp for a rider. Uses the ordered query and falls
/// back to scanning the rider's bookings; gives `None` if both fail.
async fn last_booking_timestamp(state: &AppState, rider_id: &str) -> Option<i64> {
    let ordered = Query::new()
        .eq("riderId", rider_id)
        .order_by("timestamp", Direction::Desc)
        .limit(1);

    match state.backend.documents.query(BOOKING_HISTORY, &ordered).await {
        Ok(docs) => docs
            .first()
            .and_then(|doc| doc.get("timestamp"))
            .and_then(millis_value),
        Err(err) => {
            debug!(rider_id, error = %err, "ordered last-booking query failed");
            let docs = state
                .backend
                .documents
                .query(BOOKING_HISTORY, &Query::new().eq("riderId", rider_id))
                .await
                .ok()?;
            docs.iter()
                .filter_map(|doc| doc.get("timestamp").and_then(millis_value))
                .max()
        }
    }
}

pub async fn load_passengers(state: &AppState, search: Option<&str>) -> Result<Vec<PassengerRow>, AppError> {
    let passengers = fetch_passengers(state).await.map_err(|err| {
        state
            .notifier
            .error(format!("Failed to load passengers: {err}"));
        AppError::from(err)
    })?;

    let term = search.unwrap_or_default().trim();
    let passengers: Vec<UserRecord> = passengers
        .into_iter()
        .filter(|user| user.matches_search(term))
        .collect();

    let last_bookings = join_all(
        passengers
            .iter()
            .map(|user| last_booking_timestamp(state, &user.id)),
    )
    .await;

    Ok(passengers
        .iter()
        .zip(last_bookings)
        .map(|(user, last)| PassengerRow::new(user, last))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastBooking {
    #[serde(flatten)]
    pub booking: BookingRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fare: Option<f64>,
    /// Driver phone and vehicle, when the booking carries them.
    pub meta: Vec<String>,
}

pub async fn last_booking(state: &AppState, passenger_id: &str) -> Result<Option<LastBooking>, AppError> {
    let query = Query::new()
        .eq("riderId", passenger_id)
        .order_by("timestamp", Direction::Desc)
        .limit(1);

    let docs = state
        .backend
        .documents
        .query(BOOKING_HISTORY, &query)
        .await?;

    let Some(doc) = docs.first() else {
        return Ok(None);
    };
    let booking: BookingRecord = doc.decode()?;

    let mut meta = Vec::new();
    if let Some(phone) = booking.driver_phone.as_deref().filter(|p| !p.is_empty()) {
        meta.push(format!("Driver Phone: {phone}"));
    }
    if let Some(vehicle) = booking
        .driver_vehicle_details
        .as_deref()
        .filter(|v| !v.is_empty())
    {
        meta.push(format!("Vehicle: {vehicle}"));
    }

    Ok(Some(LastBooking {
        fare: booking.display_fare(),
        booking,
        meta,
    }))
}
