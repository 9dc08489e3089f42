use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct AdminSession {
    pub token: Uuid,
    pub uid: String,
    pub email: String,
    pub signed_in_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<Uuid, AdminSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, uid: String, email: String) -> AdminSession {
        let session = AdminSession {
            token: Uuid::new_v4(),
            uid,
            email,
            signed_in_at: Utc::now(),
        };
        self.sessions.insert(session.token, session.clone());
        session
    }

    pub fn get(&self, token: &Uuid) -> Option<AdminSession> {
        self.sessions.get(token).map(|entry| entry.value().clone())
    }

    pub fn close(&self, token: &Uuid) -> Option<AdminSession> {
        self.sessions.remove(token).map(|(_, session)| session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn bearer_token(parts: &Parts) -> Result<Uuid, AppError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?
        .to_str()
        .map_err(|_| AppError::Unauthorized("malformed authorization header".to_string()))?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("expected bearer token".to_string()))?;

    Uuid::parse_str(token.trim())
        .map_err(|_| AppError::Unauthorized("malformed bearer token".to_string()))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        state
            .sessions
            .get(&token)
            .ok_or_else(|| AppError::Unauthorized("session expired".to_string()))
    }
}
