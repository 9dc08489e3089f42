use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use prometheus::IntCounterVec;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::stats::MonitorStats;
use crate::models::driver::DriverView;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

impl NotificationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationLevel::Success => "success",
            NotificationLevel::Error => "error",
        }
    }
}

/// Transient, dismissible notice shown to the administrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub level: NotificationLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Everything pushed to live console subscribers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsoleEvent {
    Drivers { drivers: Vec<DriverView> },
    Monitor { stats: MonitorStats },
    Notification(Notification),
}

/// Shared notification channel fed by every error boundary in the console.
pub struct Notifier {
    history: Mutex<VecDeque<Notification>>,
    capacity: usize,
    events_tx: broadcast::Sender<ConsoleEvent>,
    counter: IntCounterVec,
}

impl Notifier {
    pub fn new(
        capacity: usize,
        events_tx: broadcast::Sender<ConsoleEvent>,
        counter: IntCounterVec,
    ) -> Self {
        Self {
            history: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            events_tx,
            counter,
        }
    }

    pub fn success(&self, message: impl Into<String>) -> Notification {
        self.push(NotificationLevel::Success, message.into())
    }

    pub fn error(&self, message: impl Into<String>) -> Notification {
        self.push(NotificationLevel::Error, message.into())
    }

    fn push(&self, level: NotificationLevel, message: String) -> Notification {
        match level {
            NotificationLevel::Success => info!(message = %message, "notification"),
            NotificationLevel::Error => warn!(message = %message, "notification"),
        }

        let notification = Notification {
            id: Uuid::new_v4(),
            level,
            message,
            at: Utc::now(),
        };

        {
            let mut history = self.history.lock().unwrap_or_else(|p| p.into_inner());
            if self.capacity > 0 {
                while history.len() >= self.capacity {
                    history.pop_front();
                }
                history.push_back(notification.clone());
            }
        }

        self.counter.with_label_values(&[level.as_str()]).inc();
        let _ = self
            .events_tx
            .send(ConsoleEvent::Notification(notification.clone()));
        notification
    }

    /// Most recent first.
    pub fn recent(&self) -> Vec<Notification> {
        let history = self.history.lock().unwrap_or_else(|p| p.into_inner());
        history.iter().rev().cloned().collect()
    }

    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut history = self.history.lock().unwrap_or_else(|p| p.into_inner());
        let before = history.len();
        history.retain(|n| n.id != id);
        history.len() != before
    }
}
