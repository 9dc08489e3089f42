use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::backend::{DriverAccountUpdate, NewDriverAccount, DRIVERS};
use crate::engine::worker::RefreshRequest;
use crate::error::AppError;
use crate::models::driver::{DriverStatus, Vehicle};
use crate::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateDriverRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub license: String,
    pub address: String,
    pub vehicle: Vehicle,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateDriverRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub license: String,
    pub address: String,
    pub vehicle: Vehicle,
    pub status: Option<DriverStatus>,
}

fn trimmed_vehicle(vehicle: Vehicle) -> Vehicle {
    Vehicle {
        make: vehicle.make.trim().to_string(),
        model: vehicle.model.trim().to_string(),
        year: vehicle.year.trim().to_string(),
        color: vehicle.color.trim().to_string(),
        license_plate: vehicle.license_plate.trim().to_string(),
    }
}

pub fn validate_new_driver(request: CreateDriverRequest) -> Result<NewDriverAccount, AppError> {
    let name = request.name.trim().to_string();
    let email = request.email.trim().to_string();
    let phone = request.phone.trim().to_string();

    if name.is_empty() || email.is_empty() || phone.is_empty() {
        return Err(AppError::BadRequest(
            "Please fill in all required fields".to_string(),
        ));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    Ok(NewDriverAccount {
        name,
        email,
        password: request.password,
        phone,
        license: request.license.trim().to_string(),
        address: request.address.trim().to_string(),
        vehicle: trimmed_vehicle(request.vehicle),
    })
}

pub fn validate_update(driver_id: &str, request: UpdateDriverRequest) -> Result<DriverAccountUpdate, AppError> {
    let name = request.name.trim().to_string();
    let email = request.email.trim().to_string();

    if driver_id.trim().is_empty() || name.is_empty() || email.is_empty() {
        return Err(AppError::BadRequest("Name and email are required".to_string()));
    }

    let password = request.password.trim().to_string();
    Ok(DriverAccountUpdate {
        driver_id: driver_id.to_string(),
        name,
        email,
        password: (!password.is_empty()).then_some(password),
        phone: request.phone.trim().to_string(),
        license: request.license.trim().to_string(),
        address: request.address.trim().to_string(),
        vehicle: trimmed_vehicle(request.vehicle),
        status: request.status.unwrap_or(DriverStatus::Active),
    })
}

pub async fn create_driver(state: &AppState, request: CreateDriverRequest) -> Result<String, AppError> {
    let account = validate_new_driver(request).inspect_err(|err| {
        state.notifier.error(err_message(err));
    })?;

    match state.backend.callables.create_driver_account(account).await {
        Ok(uid) => {
            info!(driver_id = %uid, "driver account created");
            state.notifier.success("Driver created successfully!");
            state.request_refresh(RefreshRequest::DriverTable);
            Ok(uid)
        }
        Err(err) => {
            state
                .notifier
                .error(format!("Error creating driver: {err}"));
            Err(err.into())
        }
    }
}

/// Updates through the account procedure; when that fails, writes the
/// profile fields straight into the driver document instead.
pub async fn update_driver(
    state: &AppState,
    driver_id: &str,
    request: UpdateDriverRequest,
) -> Result<(), AppError> {
    let payload = validate_update(driver_id, request).inspect_err(|err| {
        state.notifier.error(err_message(err));
    })?;

    let fallback = json!({
        "name": payload.name,
        "email": payload.email,
        "phone": payload.phone,
        "license": payload.license,
        "address": payload.address,
        "status": payload.status,
        "vehicle": payload.vehicle,
    });

    match state.backend.callables.update_driver_account(payload).await {
        Ok(()) => {
            state.notifier.success("Driver updated successfully!");
        }
        Err(err) => {
            warn!(driver_id, error = %err, "account update failed; merging driver document");
            if let Err(err) = state
                .backend
                .documents
                .merge(DRIVERS, driver_id, fallback)
                .await
            {
                state.notifier.error(format!("Update failed: {err}"));
                return Err(err.into());
            }
            state.notifier.success("Driver updated (document store).");
        }
    }

    state.request_refresh(RefreshRequest::DriverTable);
    Ok(())
}

pub async fn delete_driver(state: &AppState, driver_id: &str) -> Result<(), AppError> {
    match state.backend.documents.delete(DRIVERS, driver_id).await {
        Ok(()) => {
            info!(driver_id, "driver deleted");
            state.notifier.success("Driver deleted successfully!");
            state.request_refresh(RefreshRequest::DriverTable);
            Ok(())
        }
        Err(err) => {
            state
                .notifier
                .error(format!("Error deleting driver: {err}"));
            Err(err.into())
        }
    }
}

fn err_message(err: &AppError) -> String {
    match err {
        AppError::BadRequest(msg) => msg.clone(),
        other => other.to_string(),
    }
}
