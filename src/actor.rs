use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::Serialize;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

/// Caller identity for audit attribution. Authentication happens upstream;
/// the access-control gateway forwards the resolved identity in headers
/// and this service treats it as opaque input.
#[derive(Debug, Clone, Serialize)]
pub struct Actor {
    pub id: Uuid,
    pub label: String,
}

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_LABEL_HEADER: &str = "x-actor-label";

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(ACTOR_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or_else(AppError::unauthorized)?;

        let label = parts
            .headers
            .get(ACTOR_LABEL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("unknown")
            .to_string();

        Ok(Actor { id, label })
    }
}
