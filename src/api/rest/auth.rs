use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::backend::USERS;
use crate::engine::worker::RefreshRequest;
use crate::error::AppError;
use crate::models::user::UserRecord;
use crate::state::AppState;
use crate::views::ViewState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub token: Uuid,
    pub uid: String,
    pub email: String,
    pub view: ViewState,
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub status: &'static str,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest(
            "Please enter both email and password".to_string(),
        ));
    }

    let user = state
        .backend
        .auth
        .sign_in(payload.email.trim(), &payload.password)
        .await?;

    let profile = state
        .backend
        .documents
        .get(USERS, &user.uid)
        .await?
        .map(|doc| doc.decode::<UserRecord>())
        .transpose()?;

    if !profile.as_ref().is_some_and(UserRecord::is_admin) {
        if let Err(err) = state.backend.auth.sign_out(&user.uid).await {
            warn!(uid = %user.uid, error = %err, "sign-out after rejected login failed");
        }
        return Err(AppError::Forbidden(
            "Access denied: Only Admins can log in.".to_string(),
        ));
    }

    let session = state.sessions.open(user.uid, user.email);
    info!(uid = %session.uid, "admin signed in");

    state.start_map_refresh();
    state.request_refresh(RefreshRequest::DriverTable);

    Ok(Json(LoginResponse {
        token: session.token,
        uid: session.uid,
        email: session.email,
        view: state.view_state(),
    }))
}

/// The local session always ends and the console is always reset; a failed
/// provider sign-out is only reported.
async fn logout(State(state): State<Arc<AppState>>, session: AdminSession) -> Json<LogoutResponse> {
    state.sessions.close(&session.token);

    if let Err(err) = state.backend.auth.sign_out(&session.uid).await {
        warn!(uid = %session.uid, error = %err, "provider sign-out failed");
        state.notifier.error(format!("Sign-out failed: {err}"));
    }

    if state.sessions.is_empty() {
        state.reset_console().await;
    }

    info!(uid = %session.uid, "admin signed out");
    Json(LogoutResponse {
        status: "signed_out",
    })
}

async fn me(session: AdminSession) -> Json<AdminSession> {
    Json(session)
}
