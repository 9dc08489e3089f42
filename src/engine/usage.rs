use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};
use serde::Serialize;

use crate::backend::{decode_all, Query, BOOKING_HISTORY};
use crate::engine::earnings::TimeWindow;
use crate::error::AppError;
use crate::models::booking::BookingRecord;
use crate::state::AppState;

pub const HOURS_PER_DAY: usize = 24;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourCount {
    pub hour: u32,
    pub label: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRow {
    pub position: usize,
    pub timestamp: i64,
    pub time: DateTime<FixedOffset>,
    pub rider_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fare: Option<f64>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyUsage {
    pub date: NaiveDate,
    pub buckets: [u32; HOURS_PER_DAY],
    pub total: u32,
    /// Only the hours that saw at least one booking.
    pub hourly: Vec<HourCount>,
    pub rows: Vec<UsageRow>,
    pub empty: bool,
}

/// 12-hour clock label for a bucket: `12 AM`, `1 AM`, ..., `11 PM`.
pub fn hour_label(hour: u32) -> String {
    let display = if hour % 12 == 0 { 12 } else { hour % 12 };
    let suffix = if hour < 12 { "AM" } else { "PM" };
    format!("{display} {suffix}")
}

/// Buckets the bookings that fall on `day` (in `offset`) by local hour.
pub fn hourly_usage(bookings: &[BookingRecord], day: NaiveDate, offset: FixedOffset) -> HourlyUsage {
    let mut buckets = [0u32; HOURS_PER_DAY];
    let mut rows: Vec<UsageRow> = Vec::new();

    for booking in bookings {
        let Some(timestamp) = booking.timestamp else {
            continue;
        };
        let Some(time) = DateTime::from_timestamp_millis(timestamp) else {
            continue;
        };
        let time = time.with_timezone(&offset);
        if time.date_naive() != day {
            continue;
        }

        buckets[time.hour() as usize] += 1;
        rows.push(UsageRow {
            position: 0,
            timestamp,
            time,
            rider_name: booking
                .rider_name
                .clone()
                .filter(|name| !name.is_empty())
                .or_else(|| booking.rider_id.clone().filter(|id| !id.is_empty()))
                .unwrap_or_else(|| "—".to_string()),
            fare: booking.display_fare(),
            status: if booking.status.is_empty() {
                "—".to_string()
            } else {
                booking.status.clone()
            },
        });
    }

    rows.sort_by_key(|row| row.timestamp);
    for (index, row) in rows.iter_mut().enumerate() {
        row.position = index + 1;
    }

    let hourly = buckets
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .map(|(hour, count)| HourCount {
            hour: hour as u32,
            label: hour_label(hour as u32),
            count: *count,
        })
        .collect();

    let total = buckets.iter().sum();
    HourlyUsage {
        date: day,
        buckets,
        total,
        hourly,
        empty: total == 0,
        rows,
    }
}

pub async fn load_usage(state: &AppState, day: NaiveDate) -> Result<HourlyUsage, AppError> {
    let window = TimeWindow::for_day(day, state.utc_offset);
    let query = Query::new().between("timestamp", window.start_ms, window.end_ms);

    let docs = match state.backend.documents.query(BOOKING_HISTORY, &query).await {
        Ok(docs) => docs,
        Err(err) => {
            state
                .notifier
                .error(format!("Failed to load usage report: {err}"));
            return Err(err.into());
        }
    };

    let bookings = decode_all::<BookingRecord>(&docs);
    Ok(hourly_usage(&bookings, day, state.utc_offset))
}
