pub mod pg;

pub use pg::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Candidate, CandidateDocument, CandidateProfileUpdate, NewAuditLogEntry, NewCandidate,
    NewStageHistoryEntry, StageDocument, StageHistoryEntry,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("row not found")]
    NotFound,
    /// The conditional stage update matched no row because the candidate's
    /// stage moved between read and write.
    #[error("candidate stage changed since it was read")]
    StaleStage,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Mutation applied to a candidate/document status row. The store stamps
/// timestamps itself so both backends agree on the semantics: completing
/// sets `completed_at`, un-completing clears it, attachment changes leave
/// completion untouched.
#[derive(Debug, Clone)]
pub enum DocumentStatusChange {
    Completion { completed: bool },
    Attachment { file_ref: Option<String> },
}

/// Persistence collaborator for the pipeline core. Rows are keyed by
/// opaque UUIDs; the stage transition commit is atomic and conditional on
/// the stage the caller read, which is what serializes per-candidate
/// writers.
#[async_trait]
pub trait PipelineStore: Send + Sync + 'static {
    /// Insert a candidate together with the intake history entry, as one
    /// transaction.
    async fn insert_candidate(
        &self,
        candidate: NewCandidate,
        intake: NewStageHistoryEntry,
    ) -> StoreResult<Candidate>;

    async fn candidate(&self, id: Uuid) -> StoreResult<Candidate>;

    async fn list_candidates(&self) -> StoreResult<Vec<Candidate>>;

    async fn update_candidate_profile(
        &self,
        id: Uuid,
        changes: CandidateProfileUpdate,
    ) -> StoreResult<Candidate>;

    /// Move `current_stage` to `entry.stage` and append the history entry
    /// atomically. Fails with [`StoreError::StaleStage`] when
    /// `current_stage` no longer equals `expected_stage`.
    async fn commit_stage_transition(
        &self,
        candidate_id: Uuid,
        expected_stage: String,
        entry: NewStageHistoryEntry,
    ) -> StoreResult<Candidate>;

    async fn stage_history(&self, candidate_id: Uuid) -> StoreResult<Vec<StageHistoryEntry>>;

    /// Catalog rows for a stage, in display order.
    async fn stage_documents_for(&self, stage: String) -> StoreResult<Vec<StageDocument>>;

    async fn stage_document(&self, id: Uuid) -> StoreResult<StageDocument>;

    async fn document_statuses(
        &self,
        candidate_id: Uuid,
        stage_document_ids: Vec<Uuid>,
    ) -> StoreResult<Vec<CandidateDocument>>;

    /// Create-if-absent/else-update keyed on the candidate/document pair.
    async fn upsert_document_status(
        &self,
        candidate_id: Uuid,
        stage_document_id: Uuid,
        change: DocumentStatusChange,
    ) -> StoreResult<CandidateDocument>;

    async fn append_audit(&self, entry: NewAuditLogEntry) -> StoreResult<()>;
}
