use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::query::compare;
use crate::backend::{
    AuthProvider, AuthUser, BackendError, Callables, Direction, Document, DocumentStore,
    DriverAccountUpdate, NewDriverAccount, PresenceStore, Query, BOOKING_HISTORY, DRIVERS,
};
use crate::models::booking::BookingRecord;
use crate::models::presence::BookedDriversResponse;
use crate::models::user::ROLE_DRIVER;

/// Operations that can be made to fail on demand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailPoint {
    PresenceRead,
    BookedDrivers,
    CreateDriverAccount,
    UpdateDriverAccount,
    SignOut,
    GetAll(String),
    Get(String),
    Query(String),
    /// Queries on a collection with an equality filter on this value.
    QueryMatching(String, String),
}

#[derive(Debug, Clone)]
struct Account {
    uid: String,
    email: String,
    password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub collections: HashMap<String, HashMap<String, Value>>,
    pub presence: HashMap<String, Value>,
    pub accounts: Vec<FixtureAccount>,
}

#[derive(Debug, Deserialize)]
pub struct FixtureAccount {
    pub uid: String,
    pub email: String,
    pub password: String,
}

/// In-process stand-in for the hosted platform.
#[derive(Default)]
pub struct MemoryBackend {
    collections: DashMap<String, BTreeMap<String, Value>>,
    presence: DashMap<String, Value>,
    accounts: DashMap<String, Account>,
    failures: DashMap<FailPoint, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture_file(path: &Path) -> Result<Self, BackendError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            BackendError::Unavailable(format!("failed to read {}: {err}", path.display()))
        })?;
        let fixture: Fixture = serde_json::from_str(&raw).map_err(|err| BackendError::Malformed {
            id: path.display().to_string(),
            reason: err.to_string(),
        })?;

        let backend = Self::new();
        backend.load_fixture(fixture);
        Ok(backend)
    }

    pub fn load_fixture(&self, fixture: Fixture) {
        let mut documents = 0usize;
        for (collection, docs) in fixture.collections {
            for (id, data) in docs {
                self.insert_document(&collection, &id, data);
                documents += 1;
            }
        }
        for (driver_id, entry) in fixture.presence {
            self.set_presence(&driver_id, entry);
        }
        for account in fixture.accounts {
            self.add_account(&account.uid, &account.email, &account.password);
        }

        info!(
            documents,
            presence = self.presence.len(),
            accounts = self.accounts.len(),
            "memory backend seeded"
        );
    }

    pub fn insert_document(&self, collection: &str, id: &str, data: Value) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
    }

    pub fn set_presence(&self, driver_id: &str, entry: Value) {
        self.presence.insert(driver_id.to_string(), entry);
    }

    pub fn clear_presence(&self) {
        self.presence.clear();
    }

    pub fn add_account(&self, uid: &str, email: &str, password: &str) {
        self.accounts.insert(
            email.to_lowercase(),
            Account {
                uid: uid.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            },
        );
    }

    pub fn fail(&self, point: FailPoint) {
        self.failures.insert(point, "injected failure".to_string());
    }

    pub fn heal(&self, point: &FailPoint) {
        self.failures.remove(point);
    }

    fn check(&self, point: &FailPoint) -> Result<(), BackendError> {
        match self.failures.get(point) {
            Some(reason) => Err(BackendError::Unavailable(format!("{point:?}: {}", reason.value()))),
            None => Ok(()),
        }
    }

    fn check_query(&self, collection: &str, query: &Query) -> Result<(), BackendError> {
        self.check(&FailPoint::Query(collection.to_string()))?;
        for value in query.equality_values() {
            if let Some(value) = value.as_str() {
                self.check(&FailPoint::QueryMatching(
                    collection.to_string(),
                    value.to_string(),
                ))?;
            }
        }
        Ok(())
    }

    fn snapshot(&self, collection: &str) -> Vec<Document> {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn account_by_uid(&self, uid: &str) -> Option<String> {
        self.accounts
            .iter()
            .find(|entry| entry.value().uid == uid)
            .map(|entry| entry.key().clone())
    }
}

fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl DocumentStore for MemoryBackend {
    async fn get_all(&self, collection: &str) -> Result<Vec<Document>, BackendError> {
        self.check(&FailPoint::GetAll(collection.to_string()))?;
        Ok(self.snapshot(collection))
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError> {
        self.check(&FailPoint::Get(collection.to_string()))?;
        Ok(self.collections.get(collection).and_then(|docs| {
            docs.get(id).map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            })
        }))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, BackendError> {
        self.check_query(collection, query)?;

        let mut docs: Vec<Document> = self
            .snapshot(collection)
            .into_iter()
            .filter(|doc| query.matches(&doc.data))
            .collect();

        if let Some((field, direction)) = &query.order_by {
            docs.retain(|doc| doc.get(field).is_some());
            docs.sort_by(|a, b| {
                let ordering = match (a.get(field), b.get(field)) {
                    (Some(a), Some(b)) => compare(a, b).unwrap_or(std::cmp::Ordering::Equal),
                    _ => std::cmp::Ordering::Equal,
                };
                match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = query.limit {
            docs.truncate(limit);
        }

        debug!(collection, matched = docs.len(), "query evaluated");
        Ok(docs)
    }

    async fn create(&self, collection: &str, data: Value) -> Result<String, BackendError> {
        let id = new_document_id();
        self.insert_document(collection, &id, data);
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<(), BackendError> {
        self.insert_document(collection, id, data);
        Ok(())
    }

    async fn merge(&self, collection: &str, id: &str, data: Value) -> Result<(), BackendError> {
        let Value::Object(patch) = data else {
            return Err(BackendError::Malformed {
                id: id.to_string(),
                reason: "merge payload must be an object".to_string(),
            });
        };

        let mut docs = self.collections.entry(collection.to_string()).or_default();
        let doc = docs
            .entry(id.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !doc.is_object() {
            *doc = Value::Object(Map::new());
        }
        if let Value::Object(fields) = doc {
            for (key, value) in patch {
                fields.insert(key, value);
            }
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), BackendError> {
        let removed = self
            .collections
            .get_mut(collection)
            .and_then(|mut docs| docs.remove(id));

        match removed {
            Some(_) => Ok(()),
            None => Err(BackendError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }),
        }
    }
}

#[async_trait]
impl PresenceStore for MemoryBackend {
    async fn read_drivers_tree(&self) -> Result<Value, BackendError> {
        self.check(&FailPoint::PresenceRead)?;

        let tree: Map<String, Value> = self
            .presence
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        Ok(Value::Object(tree))
    }
}

#[async_trait]
impl Callables for MemoryBackend {
    async fn get_booked_drivers(&self) -> Result<BookedDriversResponse, BackendError> {
        self.check(&FailPoint::BookedDrivers)?;

        let mut driver_ids: Vec<Value> = Vec::new();
        for doc in self.snapshot(BOOKING_HISTORY) {
            let Ok(booking) = doc.decode::<BookingRecord>() else {
                continue;
            };
            if !booking.is_active_trip() {
                continue;
            }
            if let Some(driver_id) = booking.driver_id {
                let driver_id = Value::String(driver_id);
                if !driver_ids.contains(&driver_id) {
                    driver_ids.push(driver_id);
                }
            }
        }

        Ok(BookedDriversResponse { driver_ids })
    }

    async fn create_driver_account(&self, profile: NewDriverAccount) -> Result<String, BackendError> {
        self.check(&FailPoint::CreateDriverAccount)?;

        let key = profile.email.to_lowercase();
        if self.accounts.contains_key(&key) {
            return Err(BackendError::AlreadyExists(format!(
                "email {} is already registered",
                profile.email
            )));
        }

        let uid = new_document_id();
        self.add_account(&uid, &profile.email, &profile.password);
        self.insert_document(
            DRIVERS,
            &uid,
            json!({
                "uid": uid,
                "role": ROLE_DRIVER,
                "name": profile.name,
                "email": profile.email,
                "phone": profile.phone,
                "license": profile.license,
                "address": profile.address,
                "vehicle": profile.vehicle,
                "status": "active",
                "createdAt": Utc::now().timestamp_millis(),
            }),
        );

        Ok(uid)
    }

    async fn update_driver_account(&self, payload: DriverAccountUpdate) -> Result<(), BackendError> {
        self.check(&FailPoint::UpdateDriverAccount)?;

        let exists = self
            .collections
            .get(DRIVERS)
            .map(|docs| docs.contains_key(&payload.driver_id))
            .unwrap_or(false);
        if !exists {
            return Err(BackendError::NotFound {
                collection: DRIVERS.to_string(),
                id: payload.driver_id,
            });
        }

        if let Some(key) = self.account_by_uid(&payload.driver_id) {
            if let Some((_, mut account)) = self.accounts.remove(&key) {
                account.email = payload.email.clone();
                if let Some(password) = payload.password.as_ref().filter(|p| !p.is_empty()) {
                    account.password = password.clone();
                }
                self.accounts.insert(account.email.to_lowercase(), account);
            }
        }

        self.merge(
            DRIVERS,
            &payload.driver_id,
            json!({
                "name": payload.name,
                "email": payload.email,
                "phone": payload.phone,
                "license": payload.license,
                "address": payload.address,
                "vehicle": payload.vehicle,
                "status": payload.status,
            }),
        )
        .await
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, BackendError> {
        let account = self
            .accounts
            .get(&email.to_lowercase())
            .ok_or(BackendError::InvalidCredentials)?;

        if account.password != password {
            return Err(BackendError::InvalidCredentials);
        }

        Ok(AuthUser {
            uid: account.uid.clone(),
            email: account.email.clone(),
        })
    }

    async fn sign_out(&self, uid: &str) -> Result<(), BackendError> {
        self.check(&FailPoint::SignOut)?;
        debug!(uid, "signed out");
        Ok(())
    }
}
