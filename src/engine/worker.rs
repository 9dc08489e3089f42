use std::sync::{Arc, Mutex};
use std::time::Duration;

use prometheus::IntCounter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::engine::roster::refresh_drivers;
use crate::engine::stats::monitor_stats;
use crate::notify::ConsoleEvent;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshRequest {
    DriverTable,
    MonitorStats,
    MapTick,
}

/// Serves queued refresh requests. Requests that arrive while no administrator
/// is signed in are dropped, so work queued before a logout never repopulates
/// the console.
pub async fn run_refresh_worker(state: Arc<AppState>, mut refresh_rx: mpsc::Receiver<RefreshRequest>) {
    info!("refresh worker started");

    while let Some(request) = refresh_rx.recv().await {
        if state.sessions.is_empty() {
            debug!(?request, "no active session; skipping refresh");
            continue;
        }

        match request {
            RefreshRequest::DriverTable | RefreshRequest::MapTick => {
                if let Err(err) = refresh_drivers(&state).await {
                    error!(?request, error = %err, "driver refresh failed");
                }
            }
            RefreshRequest::MonitorStats => {
                let stats = monitor_stats(&state).await;
                let _ = state.events_tx.send(ConsoleEvent::Monitor { stats });
            }
        }
    }

    warn!("refresh worker stopped: request channel closed");
}

/// Periodic map refresh. At most one timer runs no matter how often
/// [`MapRefresher::start`] is called.
pub struct MapRefresher {
    period: Duration,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl MapRefresher {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            handle: Mutex::new(None),
        }
    }

    /// Returns `false` when a timer is already running.
    pub fn start(&self, refresh_tx: mpsc::Sender<RefreshRequest>, ticks: IntCounter) -> bool {
        let mut handle = self.handle.lock().unwrap_or_else(|p| p.into_inner());
        if handle.as_ref().is_some_and(|task| !task.is_finished()) {
            return false;
        }

        let period = self.period;
        *handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                ticks.inc();
                if refresh_tx.send(RefreshRequest::MapTick).await.is_err() {
                    break;
                }
            }
        }));

        info!(period_secs = period.as_secs(), "map refresh started");
        true
    }

    pub fn stop(&self) -> bool {
        let mut handle = self.handle.lock().unwrap_or_else(|p| p.into_inner());
        match handle.take() {
            Some(task) => {
                task.abort();
                info!("map refresh stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        let handle = self.handle.lock().unwrap_or_else(|p| p.into_inner());
        handle.as_ref().is_some_and(|task| !task.is_finished())
    }
}
