use chrono::{FixedOffset, NaiveDate, NaiveTime};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::backend::{decode_all, Query, BOOKING_HISTORY};
use crate::engine::roster::load_roster;
use crate::error::AppError;
use crate::models::booking::{BookingRecord, STATUS_COMPLETED};
use crate::models::driver::DriverRecord;
use crate::state::AppState;

/// Inclusive range of epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeWindow {
    /// From the first millisecond of `start` to the last of `end`, in `offset`.
    pub fn for_days(start: NaiveDate, end: NaiveDate, offset: FixedOffset) -> Result<Self, AppError> {
        if start > end {
            return Err(AppError::BadRequest(format!(
                "start date {start} is after end date {end}"
            )));
        }

        Ok(Self {
            start_ms: day_start_ms(start, offset),
            end_ms: day_start_ms(end, offset) + DAY_MS - 1,
        })
    }

    pub fn for_day(day: NaiveDate, offset: FixedOffset) -> Self {
        let start_ms = day_start_ms(day, offset);
        Self {
            start_ms,
            end_ms: start_ms + DAY_MS - 1,
        }
    }

    pub fn contains(&self, timestamp_ms: i64) -> bool {
        (self.start_ms..=self.end_ms).contains(&timestamp_ms)
    }
}

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn day_start_ms(day: NaiveDate, offset: FixedOffset) -> i64 {
    day.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
        - i64::from(offset.local_minus_utc()) * 1000
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EarningsSort {
    #[default]
    Total,
    Name,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsRow {
    pub driver_id: String,
    pub driver_name: String,
    pub total: f64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsReport {
    pub window: TimeWindow,
    pub rows: Vec<EarningsRow>,
    pub grand_total: f64,
    pub empty: bool,
}

impl EarningsReport {
    pub fn new(window: TimeWindow, rows: Vec<EarningsRow>) -> Self {
        let grand_total = rows.iter().map(|row| row.total).sum();
        let empty = rows.is_empty();
        Self {
            window,
            rows,
            grand_total,
            empty,
        }
    }
}

/// Total fare and booking count of the bookings inside `window`, optionally
/// restricted to one status. Bookings without a usable fare still count.
pub fn summarize(bookings: &[BookingRecord], window: &TimeWindow, status: Option<&str>) -> (f64, u32) {
    bookings
        .iter()
        .filter(|booking| booking.timestamp.is_some_and(|ts| window.contains(ts)))
        .filter(|booking| status.is_none_or(|status| booking.status == status))
        .fold((0.0, 0), |(total, count), booking| {
            (total + booking.fare_amount(), count + 1)
        })
}

pub fn sort_rows(rows: &mut [EarningsRow], sort: EarningsSort) {
    match sort {
        EarningsSort::Total => rows.sort_by(|a, b| b.total.total_cmp(&a.total)),
        EarningsSort::Name => rows.sort_by(|a, b| {
            a.driver_name
                .to_lowercase()
                .cmp(&b.driver_name.to_lowercase())
                .then_with(|| a.driver_id.cmp(&b.driver_id))
        }),
    }
}

fn driver_name(driver: &DriverRecord) -> String {
    if driver.name.is_empty() {
        "Unknown".to_string()
    } else {
        driver.name.clone()
    }
}

/// Groups an already-fetched booking list per roster driver. Every driver
/// gets a row, zero when nothing of theirs falls in the window.
pub fn aggregate_earnings(
    drivers: &[DriverRecord],
    bookings: &[BookingRecord],
    window: &TimeWindow,
    status: Option<&str>,
    sort: EarningsSort,
) -> Vec<EarningsRow> {
    let mut rows: Vec<EarningsRow> = drivers
        .iter()
        .map(|driver| {
            let own: Vec<BookingRecord> = bookings
                .iter()
                .filter(|booking| booking.driver_id.as_deref() == Some(driver.id.as_str()))
                .cloned()
                .collect();
            let (total, count) = summarize(&own, window, status);
            EarningsRow {
                driver_id: driver.id.clone(),
                driver_name: driver_name(driver),
                total,
                count,
            }
        })
        .collect();

    sort_rows(&mut rows, sort);
    rows
}

/// Completed-booking earnings for every roster driver; drivers without a
/// booking in the window get a zero row. Each driver's history is queried
/// separately, and a failed query yields a zero row and a notification
/// without aborting the rest.
pub async fn load_earnings(
    state: &AppState,
    window: TimeWindow,
    sort: EarningsSort,
) -> Result<EarningsReport, AppError> {
    let drivers = load_roster(state).await.map_err(|err| {
        state
            .notifier
            .error(format!("Failed to load drivers: {err}"));
        AppError::from(err)
    })?;

    let lookups = drivers.iter().map(|driver| async move {
        let query = Query::new()
            .eq("driverId", driver.id.as_str())
            .eq("status", STATUS_COMPLETED)
            .between("timestamp", window.start_ms, window.end_ms);

        let (total, count) = match state.backend.documents.query(BOOKING_HISTORY, &query).await {
            Ok(docs) => summarize(&decode_all::<BookingRecord>(&docs), &window, Some(STATUS_COMPLETED)),
            Err(err) => {
                let label = if driver.name.is_empty() { &driver.id } else { &driver.name };
                state
                    .notifier
                    .error(format!("Earnings history failed for {label}: {err}"));
                (0.0, 0)
            }
        };

        EarningsRow {
            driver_id: driver.id.clone(),
            driver_name: driver_name(driver),
            total,
            count,
        }
    });

    let mut rows: Vec<EarningsRow> = join_all(lookups).await;
    sort_rows(&mut rows, sort);

    let report = EarningsReport::new(window, rows);
    info!(
        drivers = report.rows.len(),
        grand_total = report.grand_total,
        "earnings aggregated"
    );
    Ok(report)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub booking: BookingRecord,
    pub fare: f64,
}

/// One driver's completed bookings inside the window, newest first.
pub async fn driver_history(
    state: &AppState,
    driver_id: &str,
    window: TimeWindow,
) -> Result<Vec<HistoryEntry>, AppError> {
    let query = Query::new()
        .eq("driverId", driver_id)
        .eq("status", STATUS_COMPLETED)
        .between("timestamp", window.start_ms, window.end_ms);

    let docs = match state.backend.documents.query(BOOKING_HISTORY, &query).await {
        Ok(docs) => docs,
        Err(err) => {
            state
                .notifier
                .error(format!("Failed to load booking history: {err}"));
            return Err(err.into());
        }
    };

    let mut bookings = decode_all::<BookingRecord>(&docs);
    bookings.sort_by(|a, b| {
        b.timestamp
            .unwrap_or(0)
            .cmp(&a.timestamp.unwrap_or(0))
    });

    Ok(bookings
        .into_iter()
        .map(|booking| HistoryEntry {
            fare: booking.fare_amount(),
            booking,
        })
        .collect())
}
