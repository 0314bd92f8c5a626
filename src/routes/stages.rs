use axum::Json;

use crate::stages::{self, StageInfo};

pub async fn list_stages() -> Json<Vec<StageInfo>> {
    Json(stages::catalog())
}
