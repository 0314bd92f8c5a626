use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::actor::Actor;
use crate::audit::{AuditAction, AuditRecorder};
use crate::models::{CandidateDocument, NewStageDocument, StageDocument};
use crate::stages::{Stage, UnknownStage};
use crate::storage::ObjectStorage;
use crate::store::{DocumentStatusChange, PipelineStore, StoreError};

pub const PRESIGNED_URL_EXPIRY_SECONDS: u64 = 300;

#[derive(Debug, Error)]
pub enum ChecklistError {
    #[error("candidate not found")]
    CandidateNotFound,
    #[error("checklist document not found")]
    DocumentNotFound,
    #[error(transparent)]
    UnknownStage(#[from] UnknownStage),
    #[error("no file is attached to this checklist item")]
    NoAttachment,
    #[error("document storage failure: {0}")]
    Storage(#[source] anyhow::Error),
    #[error("persistence store failure: {0}")]
    Store(#[source] anyhow::Error),
}

pub type ChecklistResult<T> = Result<T, ChecklistError>;

fn candidate_err(err: StoreError) -> ChecklistError {
    match err {
        StoreError::NotFound => ChecklistError::CandidateNotFound,
        StoreError::StaleStage => ChecklistError::Store(anyhow::anyhow!("unexpected stale stage")),
        StoreError::Backend(err) => ChecklistError::Store(err),
    }
}

fn document_err(err: StoreError) -> ChecklistError {
    match err {
        StoreError::NotFound => ChecklistError::DocumentNotFound,
        StoreError::StaleStage => ChecklistError::Store(anyhow::anyhow!("unexpected stale stage")),
        StoreError::Backend(err) => ChecklistError::Store(err),
    }
}

/// Catalog definition merged with the candidate's status row. Items with
/// no status row read as incomplete with no attachment.
#[derive(Debug, Clone, Serialize)]
pub struct ChecklistItem {
    pub stage_document_id: Uuid,
    pub document_name: String,
    pub is_required: bool,
    pub display_order: i32,
    pub is_completed: bool,
    pub completed_at: Option<NaiveDateTime>,
    pub attached_file_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChecklistSummary {
    pub completed_count: usize,
    pub required_count: usize,
    pub completed_required_count: usize,
    pub all_required_complete: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Checklist {
    pub stage: Stage,
    pub items: Vec<ChecklistItem>,
    pub summary: ChecklistSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileAccess {
    pub url: String,
    pub expires_in: u64,
    pub file_ref: String,
}

fn merge(definition: &StageDocument, status: Option<&CandidateDocument>) -> ChecklistItem {
    ChecklistItem {
        stage_document_id: definition.id,
        document_name: definition.document_name.clone(),
        is_required: definition.is_required,
        display_order: definition.display_order,
        is_completed: status.map(|row| row.is_completed).unwrap_or(false),
        completed_at: status.and_then(|row| row.completed_at),
        attached_file_ref: status.and_then(|row| row.attached_file_ref.clone()),
    }
}

pub fn summarize(items: &[ChecklistItem]) -> ChecklistSummary {
    let completed_count = items.iter().filter(|item| item.is_completed).count();
    let required_count = items.iter().filter(|item| item.is_required).count();
    let completed_required_count = items
        .iter()
        .filter(|item| item.is_required && item.is_completed)
        .count();
    ChecklistSummary {
        completed_count,
        required_count,
        completed_required_count,
        all_required_complete: required_count > 0 && completed_required_count == required_count,
    }
}

/// The merged checklist for a candidate and stage, in catalog display
/// order regardless of when status rows were created.
pub async fn checklist(
    store: &dyn PipelineStore,
    candidate_id: Uuid,
    stage: Stage,
) -> ChecklistResult<Checklist> {
    store.candidate(candidate_id).await.map_err(candidate_err)?;

    let definitions = store
        .stage_documents_for(stage.key().to_string())
        .await
        .map_err(|err| ChecklistError::Store(anyhow::anyhow!(err)))?;
    let ids: Vec<Uuid> = definitions.iter().map(|def| def.id).collect();
    let statuses = store
        .document_statuses(candidate_id, ids)
        .await
        .map_err(|err| ChecklistError::Store(anyhow::anyhow!(err)))?;
    let by_definition: HashMap<Uuid, CandidateDocument> = statuses
        .into_iter()
        .map(|row| (row.stage_document_id, row))
        .collect();

    let items: Vec<ChecklistItem> = definitions
        .iter()
        .map(|def| merge(def, by_definition.get(&def.id)))
        .collect();
    let summary = summarize(&items);

    Ok(Checklist {
        stage,
        items,
        summary,
    })
}

async fn load_definition(
    store: &dyn PipelineStore,
    candidate_id: Uuid,
    stage_document_id: Uuid,
) -> ChecklistResult<StageDocument> {
    store.candidate(candidate_id).await.map_err(candidate_err)?;
    store
        .stage_document(stage_document_id)
        .await
        .map_err(document_err)
}

async fn current_status(
    store: &dyn PipelineStore,
    candidate_id: Uuid,
    stage_document_id: Uuid,
) -> ChecklistResult<Option<CandidateDocument>> {
    let rows = store
        .document_statuses(candidate_id, vec![stage_document_id])
        .await
        .map_err(|err| ChecklistError::Store(anyhow::anyhow!(err)))?;
    Ok(rows.into_iter().next())
}

/// Set or clear completion. Idempotent: repeating a state is a plain
/// upsert, never a second row. Completion and attachment are independent
/// signals; un-completing keeps the attached file.
pub async fn toggle(
    store: &dyn PipelineStore,
    audit: &AuditRecorder,
    actor: &Actor,
    candidate_id: Uuid,
    stage_document_id: Uuid,
    completed: bool,
) -> ChecklistResult<ChecklistItem> {
    let definition = load_definition(store, candidate_id, stage_document_id).await?;
    let before = current_status(store, candidate_id, stage_document_id).await?;

    let row = store
        .upsert_document_status(
            candidate_id,
            stage_document_id,
            DocumentStatusChange::Completion { completed },
        )
        .await
        .map_err(|err| ChecklistError::Store(anyhow::anyhow!(err)))?;

    audit
        .record(
            actor,
            AuditAction::Update,
            "candidate_document",
            row.id,
            before.map(|row| json!({ "is_completed": row.is_completed })),
            Some(json!({ "is_completed": row.is_completed })),
            format!(
                "marked '{}' {} for candidate {}",
                definition.document_name,
                if completed { "complete" } else { "incomplete" },
                candidate_id
            ),
        )
        .await;

    Ok(merge(&definition, Some(&row)))
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => ch,
            _ => '_',
        })
        .collect();
    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned
    }
}

/// Upload bytes to object storage, then commit the reference. Attaching
/// does not mark the item complete. A previously attached object is
/// removed from storage after the reference moves, best-effort.
#[allow(clippy::too_many_arguments)]
pub async fn attach_file(
    store: &dyn PipelineStore,
    storage: &dyn ObjectStorage,
    audit: &AuditRecorder,
    actor: &Actor,
    candidate_id: Uuid,
    stage_document_id: Uuid,
    bytes: Vec<u8>,
    original_name: &str,
    content_type: Option<String>,
) -> ChecklistResult<ChecklistItem> {
    let definition = load_definition(store, candidate_id, stage_document_id).await?;
    let previous = current_status(store, candidate_id, stage_document_id)
        .await?
        .and_then(|row| row.attached_file_ref);

    let file_ref = format!(
        "candidates/{candidate_id}/documents/{stage_document_id}/{}_{}",
        Uuid::new_v4(),
        sanitize_file_name(original_name)
    );
    storage
        .put_object(&file_ref, bytes, content_type)
        .await
        .map_err(ChecklistError::Storage)?;

    let row = store
        .upsert_document_status(
            candidate_id,
            stage_document_id,
            DocumentStatusChange::Attachment {
                file_ref: Some(file_ref.clone()),
            },
        )
        .await
        .map_err(|err| ChecklistError::Store(anyhow::anyhow!(err)))?;

    if let Some(old_ref) = previous {
        if old_ref != file_ref {
            if let Err(err) = storage.delete_object(&old_ref).await {
                tracing::warn!(
                    file_ref = %old_ref,
                    error = %err,
                    "failed to delete replaced attachment from storage"
                );
            }
        }
    }

    audit
        .record(
            actor,
            AuditAction::Update,
            "candidate_document",
            row.id,
            None,
            Some(json!({ "attached_file_ref": file_ref })),
            format!(
                "attached file to '{}' for candidate {}",
                definition.document_name, candidate_id
            ),
        )
        .await;

    Ok(merge(&definition, Some(&row)))
}

/// Remove the attachment. Storage deletion runs first; when it fails the
/// reference is kept and the error surfaces, so no dangling reference can
/// outlive its object.
pub async fn remove_file(
    store: &dyn PipelineStore,
    storage: &dyn ObjectStorage,
    audit: &AuditRecorder,
    actor: &Actor,
    candidate_id: Uuid,
    stage_document_id: Uuid,
) -> ChecklistResult<ChecklistItem> {
    let definition = load_definition(store, candidate_id, stage_document_id).await?;
    let file_ref = current_status(store, candidate_id, stage_document_id)
        .await?
        .and_then(|row| row.attached_file_ref)
        .ok_or(ChecklistError::NoAttachment)?;

    storage
        .delete_object(&file_ref)
        .await
        .map_err(ChecklistError::Storage)?;

    let row = store
        .upsert_document_status(
            candidate_id,
            stage_document_id,
            DocumentStatusChange::Attachment { file_ref: None },
        )
        .await
        .map_err(|err| ChecklistError::Store(anyhow::anyhow!(err)))?;

    audit
        .record(
            actor,
            AuditAction::Update,
            "candidate_document",
            row.id,
            Some(json!({ "attached_file_ref": file_ref })),
            None,
            format!(
                "removed attached file from '{}' for candidate {}",
                definition.document_name, candidate_id
            ),
        )
        .await;

    Ok(merge(&definition, Some(&row)))
}

/// Presigned download access for the attached file.
pub async fn file_url(
    store: &dyn PipelineStore,
    storage: &dyn ObjectStorage,
    candidate_id: Uuid,
    stage_document_id: Uuid,
) -> ChecklistResult<FileAccess> {
    load_definition(store, candidate_id, stage_document_id).await?;
    let file_ref = current_status(store, candidate_id, stage_document_id)
        .await?
        .and_then(|row| row.attached_file_ref)
        .ok_or(ChecklistError::NoAttachment)?;

    let url = storage
        .presign_get_object(&file_ref, Duration::from_secs(PRESIGNED_URL_EXPIRY_SECONDS))
        .await
        .map_err(ChecklistError::Storage)?;

    Ok(FileAccess {
        url,
        expires_in: PRESIGNED_URL_EXPIRY_SECONDS,
        file_ref,
    })
}

/// Default per-stage document catalog. Migrations seed the same set for
/// Postgres; in-memory stores seed from here.
pub fn default_stage_documents() -> Vec<NewStageDocument> {
    let catalog: &[(Stage, &[(&str, bool)])] = &[
        (
            Stage::PassportReceived,
            &[
                ("Passport copy", true),
                ("Personal photo", true),
                ("National ID copy", false),
            ],
        ),
        (
            Stage::Interview,
            &[("Interview evaluation form", true), ("CV", false)],
        ),
        (
            Stage::Medical,
            &[("Medical fitness certificate", true), ("Lab results", false)],
        ),
        (
            Stage::PoliceClearance,
            &[("Police clearance certificate", true)],
        ),
        (
            Stage::Mofa,
            &[
                ("MOFA attestation receipt", true),
                ("Employment contract copy", true),
            ],
        ),
        (Stage::Taseer, &[("Taseer enrollment confirmation", true)]),
        (Stage::Takamul, &[("Takamul registration slip", true)]),
        (Stage::Training, &[("Training completion certificate", true)]),
        (Stage::Fingerprint, &[("Fingerprint submission receipt", true)]),
        (
            Stage::Embassy,
            &[
                ("Embassy submission receipt", true),
                ("Visa application form", true),
            ],
        ),
        (Stage::VisaIssued, &[("Visa sticker copy", true)]),
        (
            Stage::Manpower,
            &[
                ("Manpower clearance letter", true),
                ("Travel insurance", false),
            ],
        ),
        (
            Stage::Flight,
            &[("Flight ticket", true), ("Boarding confirmation", false)],
        ),
    ];

    catalog
        .iter()
        .flat_map(|(stage, documents)| {
            documents
                .iter()
                .enumerate()
                .map(|(index, (name, required))| NewStageDocument {
                    id: Uuid::new_v4(),
                    stage: stage.key().to_string(),
                    document_name: name.to_string(),
                    is_required: *required,
                    display_order: index as i32,
                })
        })
        .collect()
}
