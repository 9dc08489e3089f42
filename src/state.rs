use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::FixedOffset;
use tokio::sync::{broadcast, mpsc, MutexGuard, RwLock};
use tracing::warn;

use crate::auth::SessionStore;
use crate::backend::Backend;
use crate::config::Config;
use crate::engine::worker::{MapRefresher, RefreshRequest};
use crate::models::driver::DriverView;
use crate::notify::{ConsoleEvent, Notifier};
use crate::observability::metrics::Metrics;
use crate::views::{Section, UnknownSection, ViewRouter, ViewState};

/// Console controller. Owns the reconciled roster and every piece of shared
/// UI state; handlers and workers reach it through an `Arc`.
pub struct AppState {
    pub backend: Backend,
    pub sessions: SessionStore,
    drivers: RwLock<Arc<Vec<DriverView>>>,
    /// Bumped on every console reset; a refresh that started under an older
    /// value must not publish its roster.
    roster_epoch: AtomicU64,
    refresh_lock: tokio::sync::Mutex<()>,
    views: Mutex<ViewRouter>,
    pub notifier: Notifier,
    pub events_tx: broadcast::Sender<ConsoleEvent>,
    pub refresh_tx: mpsc::Sender<RefreshRequest>,
    pub map_refresher: MapRefresher,
    pub metrics: Metrics,
    pub utc_offset: FixedOffset,
    pub static_dir: PathBuf,
}

impl AppState {
    pub fn new(backend: Backend, config: &Config) -> (Self, mpsc::Receiver<RefreshRequest>) {
        let (refresh_tx, refresh_rx) = mpsc::channel(config.event_buffer_size.max(1));
        let (events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size.max(1));
        let metrics = Metrics::new();

        let mut views = ViewRouter::new();
        for (section, request) in [
            (Section::ManageDrivers, RefreshRequest::DriverTable),
            (Section::MonitorDrivers, RefreshRequest::MonitorStats),
        ] {
            let tx = refresh_tx.clone();
            views.on_show(section, Box::new(move || enqueue_refresh(&tx, request)));
        }

        let notifier = Notifier::new(
            config.notification_history,
            events_tx.clone(),
            metrics.notifications_total.clone(),
        );

        (
            Self {
                backend,
                sessions: SessionStore::new(),
                drivers: RwLock::new(Arc::new(Vec::new())),
                roster_epoch: AtomicU64::new(0),
                refresh_lock: tokio::sync::Mutex::new(()),
                views: Mutex::new(views),
                notifier,
                events_tx,
                refresh_tx,
                map_refresher: MapRefresher::new(Duration::from_secs(config.map_refresh_secs.max(1))),
                metrics,
                utc_offset: config.utc_offset,
                static_dir: config.static_dir.clone(),
            },
            refresh_rx,
        )
    }

    /// Last reconciled roster.
    pub async fn drivers(&self) -> Arc<Vec<DriverView>> {
        self.drivers.read().await.clone()
    }

    pub fn roster_epoch(&self) -> u64 {
        self.roster_epoch.load(Ordering::Acquire)
    }

    /// Held for the length of a reconciliation pass. Passes publish in the
    /// order they acquire it.
    pub async fn refresh_permit(&self) -> MutexGuard<'_, ()> {
        self.refresh_lock.lock().await
    }

    /// Swaps in a freshly reconciled roster; the previous list is dropped
    /// whole. Returns `false` without touching the roster when the console
    /// was reset after `epoch` was read.
    pub async fn replace_drivers(&self, epoch: u64, drivers: Arc<Vec<DriverView>>) -> bool {
        let mut current = self.drivers.write().await;
        if self.roster_epoch.load(Ordering::Acquire) != epoch {
            return false;
        }

        *current = drivers;
        true
    }

    pub fn request_refresh(&self, request: RefreshRequest) {
        enqueue_refresh(&self.refresh_tx, request);
    }

    pub fn show_section(&self, section: Section) -> ViewState {
        let mut views = self.views.lock().unwrap_or_else(|p| p.into_inner());
        views.show(section)
    }

    pub fn show_named(&self, raw: &str) -> Result<ViewState, UnknownSection> {
        let mut views = self.views.lock().unwrap_or_else(|p| p.into_inner());
        views.show_named(raw)
    }

    pub fn view_state(&self) -> ViewState {
        let views = self.views.lock().unwrap_or_else(|p| p.into_inner());
        views.state()
    }

    pub fn start_map_refresh(&self) -> bool {
        self.map_refresher.start(
            self.refresh_tx.clone(),
            self.metrics.map_refresh_ticks_total.clone(),
        )
    }

    /// Drops everything tied to the signed-in administrator.
    pub async fn reset_console(&self) {
        self.show_section(Section::Dashboard);
        self.map_refresher.stop();

        let mut current = self.drivers.write().await;
        self.roster_epoch.fetch_add(1, Ordering::AcqRel);
        *current = Arc::new(Vec::new());
    }
}

fn enqueue_refresh(tx: &mpsc::Sender<RefreshRequest>, request: RefreshRequest) {
    if let Err(err) = tx.try_send(request) {
        warn!(?request, error = %err, "refresh request dropped");
    }
}
