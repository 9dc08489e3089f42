use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::backend::{decode_all, Direction, Query, DRIVERS, REPORTS, USERS};
use crate::engine::earnings::TimeWindow;
use crate::error::AppError;
use crate::models::report::{Report, ReportFilter};
use crate::models::user::UserRecord;
use crate::state::AppState;

pub const REPORT_PAGE_SIZE: usize = 100;
const MESSAGE_PREVIEW_CHARS: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    #[serde(flatten)]
    pub report: Report,
    pub message_preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporter_name: Option<String>,
    pub status_label: &'static str,
}

pub fn message_preview(message: Option<&str>) -> String {
    match message {
        None | Some("") => "—".to_string(),
        Some(message) if message.chars().count() > MESSAGE_PREVIEW_CHARS => {
            let mut preview: String = message.chars().take(MESSAGE_PREVIEW_CHARS).collect();
            preview.push('…');
            preview
        }
        Some(message) => message.to_string(),
    }
}

/// Looks up display names by id in `collection`; any miss keeps the raw id.
async fn resolve_names(
    state: &AppState,
    collection: &str,
    ids: BTreeSet<String>,
    pick: fn(&UserRecord) -> Option<String>,
) -> HashMap<String, String> {
    let lookups = ids.into_iter().map(|id| async move {
        let name = match state.backend.documents.get(collection, &id).await {
            Ok(Some(doc)) => doc.decode::<UserRecord>().ok().and_then(|user| pick(&user)),
            _ => None,
        };
        let name = name.filter(|n| !n.is_empty()).unwrap_or_else(|| id.clone());
        (id, name)
    });

    join_all(lookups).await.into_iter().collect()
}

pub async fn load_reports(state: &AppState, filter: ReportFilter) -> Result<Vec<ReportRow>, AppError> {
    let query = Query::new()
        .order_by("timestamp", Direction::Desc)
        .limit(REPORT_PAGE_SIZE);

    let docs = state
        .backend
        .documents
        .query(REPORTS, &query)
        .await
        .map_err(|err| {
            state
                .notifier
                .error(format!("Failed to load reports: {err}"));
            AppError::from(err)
        })?;
    let reports = decode_all::<Report>(&docs);

    let reports: Vec<Report> = reports.into_iter().filter(|r| filter.accepts(r)).collect();

    let driver_ids: BTreeSet<String> = reports.iter().filter_map(|r| r.driver_id.clone()).collect();
    let reporter_ids: BTreeSet<String> = reports.iter().filter_map(|r| r.reporter_id.clone()).collect();

    let (driver_names, reporter_names) = futures::join!(
        resolve_names(state, DRIVERS, driver_ids, |user| user.name.clone()),
        resolve_names(state, USERS, reporter_ids, |user| {
            user.display_name.clone().or_else(|| user.name.clone())
        }),
    );

    Ok(reports
        .into_iter()
        .map(|report| ReportRow {
            message_preview: message_preview(report.message.as_deref()),
            driver_name: report
                .driver_id
                .as_ref()
                .and_then(|id| driver_names.get(id).cloned()),
            reporter_name: report
                .reporter_id
                .as_ref()
                .and_then(|id| reporter_names.get(id).cloned()),
            status_label: if report.is_resolved() { "Resolved" } else { "Open" },
            report,
        })
        .collect())
}

pub async fn resolve_report(state: &AppState, report_id: &str, admin_uid: &str) -> Result<(), AppError> {
    if state.backend.documents.get(REPORTS, report_id).await?.is_none() {
        return Err(AppError::NotFound(format!("report {report_id} not found")));
    }

    let patch = json!({
        "status": "resolved",
        "resolvedAt": Utc::now().timestamp_millis(),
        "resolvedBy": admin_uid,
    });

    match state.backend.documents.merge(REPORTS, report_id, patch).await {
        Ok(()) => {
            info!(report_id, resolved_by = admin_uid, "report resolved");
            state.notifier.success("Report marked as resolved");
            Ok(())
        }
        Err(err) => {
            state.notifier.error(format!("Failed to resolve: {err}"));
            Err(err.into())
        }
    }
}

/// Reports filed today; zero when the lookup fails.
pub async fn reports_today(state: &AppState) -> usize {
    let today = Utc::now().with_timezone(&state.utc_offset).date_naive();
    let window = TimeWindow::for_day(today, state.utc_offset);
    let query = Query::new().between("timestamp", window.start_ms, window.end_ms);

    state
        .backend
        .documents
        .query(REPORTS, &query)
        .await
        .map(|docs| docs.len())
        .unwrap_or(0)
}
