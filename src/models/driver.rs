use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Vehicle {
    pub make: String,
    pub model: String,
    pub year: String,
    pub color: String,
    pub license_plate: String,
}

impl Vehicle {
    /// Table summary, e.g. `Toyota Vios (white)`.
    pub fn summary(&self) -> String {
        format!("{} {} ({})", self.make, self.model, self.color)
    }
}

/// Administrator-set lifecycle flag stored on the driver document.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DriverStatus {
    Active,
    #[default]
    Inactive,
    Pending,
}

/// Derived on every reconciliation pass; never written back to the store.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeStatus {
    Online,
    #[default]
    Offline,
    Booked,
}

impl RuntimeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeStatus::Online => "online",
            RuntimeStatus::Offline => "offline",
            RuntimeStatus::Booked => "booked",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DriverRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub license: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<Vehicle>,
    pub status: DriverStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// A roster entry annotated by the reconciler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DriverView {
    #[serde(flatten)]
    pub record: DriverRecord,
    pub runtime_status: RuntimeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

impl DriverView {
    pub fn new(record: DriverRecord) -> Self {
        Self {
            record,
            runtime_status: RuntimeStatus::Offline,
            profile_image_url: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    pub fn location(&self) -> Option<GeoPoint> {
        self.record.location
    }

    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        if term.is_empty() {
            return true;
        }

        self.record.name.to_lowercase().contains(&term)
            || self.record.email.to_lowercase().contains(&term)
            || self.record.phone.contains(&term)
    }
}
