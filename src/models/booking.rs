use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::lenient;

pub const STATUS_COMPLETED: &str = "COMPLETED";

/// Statuses that mean a driver is currently on a trip.
pub const ACTIVE_TRIP_STATUSES: [&str; 5] =
    ["ACCEPTED", "ARRIVING", "ARRIVED", "ONGOING", "IN_PROGRESS"];

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_id")]
    pub driver_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_vehicle_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_id")]
    pub rider_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rider_name: Option<String>,
    #[serde(deserialize_with = "lenient::text")]
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_fare: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_fare: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient::millis")]
    pub timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_address: Option<String>,
}

impl BookingRecord {
    /// Amount counted towards earnings. The final fare is preferred whenever
    /// it is set; a value that is not a number counts as zero.
    pub fn fare_amount(&self) -> f64 {
        self.final_fare
            .as_ref()
            .filter(|v| !v.is_null())
            .or_else(|| self.estimated_fare.as_ref().filter(|v| !v.is_null()))
            .and_then(numeric_value)
            .unwrap_or(0.0)
    }

    /// Fare shown in usage listings: only a numeric final or estimated fare.
    pub fn display_fare(&self) -> Option<f64> {
        self.final_fare
            .as_ref()
            .and_then(Value::as_f64)
            .or_else(|| self.estimated_fare.as_ref().and_then(Value::as_f64))
    }

    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }

    pub fn is_active_trip(&self) -> bool {
        ACTIVE_TRIP_STATUSES
            .iter()
            .any(|status| self.status.eq_ignore_ascii_case(status))
    }

    pub fn display_id(&self) -> &str {
        self.booking_id.as_deref().unwrap_or(&self.id)
    }
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}
