use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, DRIVERS, USERS};
use crate::engine::reconcile::{reconcile, runtime_counts};
use crate::error::AppError;
use crate::models::driver::{DriverRecord, DriverView};
use crate::models::presence::{ingest_presence_tree, BookedSet, PresenceSnapshot};
use crate::models::user::UserRecord;
use crate::notify::ConsoleEvent;
use crate::state::AppState;

/// Fetches the roster, skipping documents that do not decode.
pub async fn load_roster(state: &AppState) -> Result<Vec<DriverRecord>, BackendError> {
    let docs = state.backend.documents.get_all(DRIVERS).await?;

    Ok(docs
        .iter()
        .filter_map(|doc| match doc.decode::<DriverRecord>() {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(driver_id = %doc.id, error = %err, "skipping malformed driver document");
                None
            }
        })
        .collect())
}

async fn fetch_presence(state: &AppState) -> Result<PresenceSnapshot, BackendError> {
    let tree = state.backend.presence.read_drivers_tree().await?;
    Ok(ingest_presence_tree(&tree))
}

async fn fetch_booked(state: &AppState) -> Result<BookedSet, BackendError> {
    Ok(state.backend.callables.get_booked_drivers().await?.into_set())
}

/// Profile images live on the `users` record with the driver's id. Lookups
/// are best-effort; a failed one just leaves the placeholder.
async fn fetch_profile_images(state: &AppState, roster: &[DriverRecord]) -> HashMap<String, String> {
    let lookups = roster.iter().map(|driver| async move {
        match state.backend.documents.get(USERS, &driver.id).await {
            Ok(Some(doc)) => doc
                .decode::<UserRecord>()
                .ok()
                .and_then(|user| user.profile_image_url)
                .filter(|url| !url.is_empty())
                .map(|url| (driver.id.clone(), url)),
            Ok(None) => None,
            Err(err) => {
                debug!(driver_id = %driver.id, error = %err, "profile image lookup failed");
                None
            }
        }
    });

    join_all(lookups).await.into_iter().flatten().collect()
}

/// Runs a full reconciliation pass and publishes the result.
///
/// Presence, booked set and profile images are fetched concurrently and all
/// of them are awaited; a failure in one never cancels the others. Only a
/// failed roster fetch fails the pass. Passes run one at a time, and a pass
/// that overlaps a console reset returns its roster without publishing it.
pub async fn refresh_drivers(state: &AppState) -> Result<Arc<Vec<DriverView>>, AppError> {
    let _permit = state.refresh_permit().await;
    let epoch = state.roster_epoch();
    let start = Instant::now();

    let roster = match load_roster(state).await {
        Ok(roster) => roster,
        Err(err) => {
            state
                .notifier
                .error(format!("Error loading drivers: {err}"));
            record_outcome(state, "error", start);
            return Err(err.into());
        }
    };

    let (presence, booked, images) = futures::join!(
        fetch_presence(state),
        fetch_booked(state),
        fetch_profile_images(state, &roster),
    );

    let presence = presence
        .map_err(|err| {
            state
                .notifier
                .error(format!("Failed to load driver presence: {err}"));
        })
        .ok();
    let booked = booked
        .map_err(|err| {
            state
                .notifier
                .error(format!("Failed to load booked drivers: {err}"));
        })
        .ok();

    let outcome = if presence.is_some() && booked.is_some() {
        "success"
    } else {
        "partial"
    };

    let drivers = Arc::new(reconcile(&roster, presence.as_ref(), booked.as_ref(), &images));
    let counts = runtime_counts(&drivers);

    if !state.replace_drivers(epoch, drivers.clone()).await {
        debug!(epoch, "console reset during refresh; discarding roster");
        record_outcome(state, "discarded", start);
        return Ok(drivers);
    }
    state
        .metrics
        .record_runtime_counts(counts.online, counts.offline, counts.booked);
    let _ = state.events_tx.send(ConsoleEvent::Drivers {
        drivers: drivers.as_ref().clone(),
    });

    record_outcome(state, outcome, start);
    info!(
        drivers = drivers.len(),
        online = counts.online,
        booked = counts.booked,
        outcome,
        "drivers reconciled"
    );

    Ok(drivers)
}

fn record_outcome(state: &AppState, outcome: &str, start: Instant) {
    state
        .metrics
        .reconcile_latency_seconds
        .with_label_values(&[outcome])
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .reconciliations_total
        .with_label_values(&[outcome])
        .inc();
}
