//! Collaborators owned by the hosted platform: document store, realtime
//! presence tree, callable procedures and the auth provider.
//!
//! The console only ever talks to these traits. [`memory::MemoryBackend`]
//! implements all of them for local runs and tests.

pub mod memory;
pub mod query;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::models::driver::Vehicle;
use crate::models::presence::BookedDriversResponse;

pub use query::{Direction, Filter, FilterOp, Query};

pub const DRIVERS: &str = "drivers";
pub const USERS: &str = "users";
pub const BOOKING_HISTORY: &str = "bookinghistory";
pub const REPORTS: &str = "reports";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("malformed document {id}: {reason}")]
    Malformed { id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Decodes the document body into a model, exposing the document id as `id`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BackendError> {
        let mut data = self.data.clone();
        if let Value::Object(fields) = &mut data {
            fields.insert("id".to_string(), Value::String(self.id.clone()));
        }

        serde_json::from_value(data).map_err(|err| BackendError::Malformed {
            id: self.id.clone(),
            reason: err.to_string(),
        })
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }
}

/// Decodes every document that fits `T`. Documents that do not decode are
/// logged and skipped, so one bad record never empties an aggregate.
pub fn decode_all<T: DeserializeOwned>(docs: &[Document]) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match doc.decode::<T>() {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(doc_id = %doc.id, error = %err, "skipping malformed document");
                None
            }
        })
        .collect()
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>, BackendError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, BackendError>;

    /// Stores a new document under a generated id and returns that id.
    async fn create(&self, collection: &str, data: Value) -> Result<String, BackendError>;

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), BackendError>;

    /// Shallow-merges `data` into the document, creating it when missing.
    async fn merge(&self, collection: &str, id: &str, data: Value) -> Result<(), BackendError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), BackendError>;
}

#[async_trait]
pub trait PresenceStore: Send + Sync {
    /// One-shot read of the whole `drivers/` tree keyed by driver id.
    async fn read_drivers_tree(&self) -> Result<Value, BackendError>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDriverAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub license: String,
    pub address: String,
    pub vehicle: Vehicle,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverAccountUpdate {
    pub driver_id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub phone: String,
    pub license: String,
    pub address: String,
    pub vehicle: Vehicle,
    pub status: crate::models::driver::DriverStatus,
}

#[async_trait]
pub trait Callables: Send + Sync {
    async fn get_booked_drivers(&self) -> Result<BookedDriversResponse, BackendError>;

    /// Creates the auth account and the driver profile; returns the new uid.
    async fn create_driver_account(&self, profile: NewDriverAccount) -> Result<String, BackendError>;

    async fn update_driver_account(&self, payload: DriverAccountUpdate) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, BackendError>;

    async fn sign_out(&self, uid: &str) -> Result<(), BackendError>;
}

/// Handles to every platform collaborator.
#[derive(Clone)]
pub struct Backend {
    pub documents: Arc<dyn DocumentStore>,
    pub presence: Arc<dyn PresenceStore>,
    pub callables: Arc<dyn Callables>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Backend {
    pub fn from_memory(memory: Arc<memory::MemoryBackend>) -> Self {
        Self {
            documents: memory.clone(),
            presence: memory.clone(),
            callables: memory.clone(),
            auth: memory,
        }
    }
}
