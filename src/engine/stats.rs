use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::backend::{decode_all, BackendError, Query, BOOKING_HISTORY, REPORTS};
use crate::engine::earnings::TimeWindow;
use crate::engine::reconcile::{runtime_counts, RuntimeCounts};
use crate::models::booking::BookingRecord;
use crate::models::driver::{DriverStatus, DriverView};
use crate::models::report::Report;
use crate::state::AppState;

const RECENT_ACTIVITY_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub driver_id: String,
    pub name: String,
    pub activity: &'static str,
    pub status: DriverStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_drivers: usize,
    pub active_drivers: usize,
    pub pending_drivers: usize,
    pub runtime: RuntimeCounts,
    pub recent_activities: Vec<RecentActivity>,
}

pub fn dashboard_stats(drivers: &[DriverView]) -> DashboardStats {
    let count = |status: DriverStatus| {
        drivers
            .iter()
            .filter(|driver| driver.record.status == status)
            .count()
    };

    let recent_activities = drivers
        .iter()
        .take(RECENT_ACTIVITY_LIMIT)
        .map(|driver| RecentActivity {
            driver_id: driver.record.id.clone(),
            name: driver.record.name.clone(),
            activity: match driver.record.status {
                DriverStatus::Active => "Started shift",
                DriverStatus::Pending => "New driver application",
                DriverStatus::Inactive => "Account created",
            },
            status: driver.record.status,
            created_at: driver.record.created_at,
        })
        .collect();

    DashboardStats {
        total_drivers: drivers.len(),
        active_drivers: count(DriverStatus::Active),
        pending_drivers: count(DriverStatus::Pending),
        runtime: runtime_counts(drivers),
        recent_activities,
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStats {
    pub on_duty_drivers: usize,
    pub completed_rides_today: usize,
    pub active_rides: usize,
    pub open_reports: usize,
}

/// Monitoring counters. Each source is read independently; one that fails
/// reports zero.
pub async fn monitor_stats(state: &AppState) -> MonitorStats {
    let drivers = state.drivers().await;
    let on_duty_drivers = drivers
        .iter()
        .filter(|driver| driver.record.status == DriverStatus::Active)
        .count();

    let today = Utc::now().with_timezone(&state.utc_offset).date_naive();
    let window = TimeWindow::for_day(today, state.utc_offset);

    let bookings_today = async {
        let query = Query::new().between("timestamp", window.start_ms, window.end_ms);
        let docs = state.backend.documents.query(BOOKING_HISTORY, &query).await?;
        Ok::<_, BackendError>(decode_all::<BookingRecord>(&docs))
    };
    let reports = async {
        let docs = state.backend.documents.get_all(REPORTS).await?;
        Ok::<_, BackendError>(decode_all::<Report>(&docs))
    };

    let (bookings_today, reports) = futures::join!(bookings_today, reports);

    let (completed_rides_today, active_rides) = match bookings_today {
        Ok(bookings) => (
            bookings.iter().filter(|b| b.is_completed()).count(),
            bookings.iter().filter(|b| b.is_active_trip()).count(),
        ),
        Err(err) => {
            warn!(error = %err, "monitor stats: booking lookup failed");
            (0, 0)
        }
    };

    let open_reports = match reports {
        Ok(reports) => reports.iter().filter(|r| !r.is_resolved()).count(),
        Err(err) => {
            warn!(error = %err, "monitor stats: report lookup failed");
            0
        }
    };

    MonitorStats {
        on_duty_drivers,
        completed_rides_today,
        active_rides,
        open_reports,
    }
}

#[cfg(test)]
mod tests {
    use super::dashboard_stats;
    use crate::models::driver::{DriverRecord, DriverStatus, DriverView, RuntimeStatus};

    fn driver(id: &str, status: DriverStatus, runtime: RuntimeStatus) -> DriverView {
        let mut view = DriverView::new(DriverRecord {
            id: id.to_string(),
            name: format!("Driver {id}"),
            status,
            ..DriverRecord::default()
        });
        view.runtime_status = runtime;
        view
    }

    #[test]
    fn counts_persisted_and_runtime_status_separately() {
        let drivers = vec![
            driver("a", DriverStatus::Active, RuntimeStatus::Booked),
            driver("b", DriverStatus::Pending, RuntimeStatus::Online),
            driver("c", DriverStatus::Active, RuntimeStatus::Offline),
            driver("d", DriverStatus::Inactive, RuntimeStatus::Offline),
        ];

        let stats = dashboard_stats(&drivers);

        assert_eq!(stats.total_drivers, 4);
        assert_eq!(stats.active_drivers, 2);
        assert_eq!(stats.pending_drivers, 1);
        assert_eq!(stats.runtime.booked, 1);
        assert_eq!(stats.runtime.offline, 2);
        assert_eq!(stats.recent_activities[1].activity, "New driver application");
        assert_eq!(stats.recent_activities[3].activity, "Account created");
    }

    #[test]
    fn recent_activities_are_capped_at_five() {
        let drivers: Vec<DriverView> = (0..8)
            .map(|i| driver(&i.to_string(), DriverStatus::Active, RuntimeStatus::Online))
            .collect();

        let stats = dashboard_stats(&drivers);
        assert_eq!(stats.recent_activities.len(), 5);
        assert_eq!(stats.recent_activities[0].activity, "Started shift");
    }

    #[test]
    fn empty_roster_is_all_zero() {
        let stats = dashboard_stats(&[]);
        assert_eq!(stats.total_drivers, 0);
        assert!(stats.recent_activities.is_empty());
    }
}
