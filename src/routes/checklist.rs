use axum::{
    extract::{Json, Multipart, Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use super::candidates::to_iso;
use crate::actor::Actor;
use crate::checklist::{self, Checklist, ChecklistItem, ChecklistSummary, FileAccess};
use crate::error::{AppError, AppResult};
use crate::pipeline;
use crate::stages::Stage;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ChecklistQuery {
    pub stage: Option<String>,
}

#[derive(Deserialize)]
pub struct ToggleDocumentRequest {
    pub completed: bool,
}

#[derive(Serialize)]
pub struct ChecklistItemResponse {
    pub stage_document_id: Uuid,
    pub document_name: String,
    pub is_required: bool,
    pub display_order: i32,
    pub is_completed: bool,
    pub completed_at: Option<String>,
    pub attached_file_ref: Option<String>,
}

#[derive(Serialize)]
pub struct ChecklistResponse {
    pub stage: &'static str,
    pub stage_label: &'static str,
    pub items: Vec<ChecklistItemResponse>,
    pub summary: ChecklistSummary,
}

impl From<ChecklistItem> for ChecklistItemResponse {
    fn from(item: ChecklistItem) -> Self {
        Self {
            stage_document_id: item.stage_document_id,
            document_name: item.document_name,
            is_required: item.is_required,
            display_order: item.display_order,
            is_completed: item.is_completed,
            completed_at: item.completed_at.map(to_iso),
            attached_file_ref: item.attached_file_ref,
        }
    }
}

fn to_checklist_response(checklist: Checklist) -> ChecklistResponse {
    ChecklistResponse {
        stage: checklist.stage.key(),
        stage_label: checklist.stage.label(),
        items: checklist.items.into_iter().map(Into::into).collect(),
        summary: checklist.summary,
    }
}

pub async fn get_checklist(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    Query(params): Query<ChecklistQuery>,
) -> AppResult<Json<ChecklistResponse>> {
    let stage = match params.stage {
        Some(key) => key
            .parse::<Stage>()
            .map_err(|err| AppError::bad_request(err.to_string()))?,
        None => {
            let candidate = pipeline::candidate(state.store.as_ref(), candidate_id).await?;
            pipeline::stage_of(&candidate)?
        }
    };

    let checklist = checklist::checklist(state.store.as_ref(), candidate_id, stage).await?;
    Ok(Json(to_checklist_response(checklist)))
}

pub async fn toggle_document(
    State(state): State<AppState>,
    Path((candidate_id, stage_document_id)): Path<(Uuid, Uuid)>,
    actor: Actor,
    Json(payload): Json<ToggleDocumentRequest>,
) -> AppResult<Json<ChecklistItemResponse>> {
    let item = checklist::toggle(
        state.store.as_ref(),
        &state.audit,
        &actor,
        candidate_id,
        stage_document_id,
        payload.completed,
    )
    .await?;
    Ok(Json(item.into()))
}

pub async fn attach_document_file(
    State(state): State<AppState>,
    Path((candidate_id, stage_document_id)): Path<(Uuid, Uuid)>,
    actor: Actor,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<ChecklistItemResponse>)> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut original_name: Option<String> = None;
    let mut content_type: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        let msg = format!("invalid multipart data: {err}");
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(msg)
    })? {
        let name = field.name().map(|n| n.to_string());
        if name.as_deref() == Some("file") {
            original_name = field.file_name().map(|n| n.to_string());
            content_type = field.content_type().map(|mime| mime.to_string());
            let data = field.bytes().await.map_err(|err| {
                let msg = format!("failed to read file bytes: {err}");
                error!(error = %err, "failed to read file bytes");
                AppError::bad_request(msg)
            })?;
            file_bytes = Some(data.to_vec());
        }
    }

    let bytes = file_bytes.ok_or_else(|| AppError::bad_request("missing 'file' field"))?;
    if bytes.is_empty() {
        return Err(AppError::bad_request("uploaded file is empty"));
    }
    let original_name = original_name.unwrap_or_else(|| "attachment".to_string());
    let content_type = content_type.or_else(|| {
        mime_guess::from_path(&original_name)
            .first_raw()
            .map(|mime| mime.to_string())
    });

    let item = checklist::attach_file(
        state.store.as_ref(),
        state.storage.as_ref(),
        &state.audit,
        &actor,
        candidate_id,
        stage_document_id,
        bytes,
        &original_name,
        content_type,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

pub async fn document_file_url(
    State(state): State<AppState>,
    Path((candidate_id, stage_document_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<FileAccess>> {
    let access = checklist::file_url(
        state.store.as_ref(),
        state.storage.as_ref(),
        candidate_id,
        stage_document_id,
    )
    .await?;
    Ok(Json(access))
}

pub async fn remove_document_file(
    State(state): State<AppState>,
    Path((candidate_id, stage_document_id)): Path<(Uuid, Uuid)>,
    actor: Actor,
) -> AppResult<StatusCode> {
    checklist::remove_file(
        state.store.as_ref(),
        state.storage.as_ref(),
        &state.audit,
        &actor,
        candidate_id,
        stage_document_id,
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
