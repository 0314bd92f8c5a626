use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel::{select, PgConnection};
use uuid::Uuid;

use crate::db::PgPool;
use crate::models::{
    Candidate, CandidateDocument, CandidateProfileUpdate, NewAuditLogEntry, NewCandidate,
    NewCandidateDocument, NewStageHistoryEntry, StageDocument, StageHistoryEntry,
};
use crate::schema::{audit_log, candidate_documents, candidates, stage_documents, stage_history};
use crate::store::{DocumentStatusChange, PipelineStore, StoreError, StoreResult};

impl From<diesel::result::Error> for StoreError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => StoreError::NotFound,
            other => StoreError::Backend(other.into()),
        }
    }
}

/// Diesel/Postgres implementation. Blocking connection work runs on the
/// blocking pool so handler futures stay schedulable.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn with_conn<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| StoreError::Backend(anyhow!("database pool error: {err}")))?;
            f(&mut conn)
        })
        .await
        .map_err(|err| StoreError::Backend(anyhow!("database task panicked: {err}")))?
    }
}

#[async_trait]
impl PipelineStore for PgStore {
    async fn insert_candidate(
        &self,
        candidate: NewCandidate,
        intake: NewStageHistoryEntry,
    ) -> StoreResult<Candidate> {
        self.with_conn(move |conn| {
            conn.transaction::<Candidate, StoreError, _>(|conn| {
                diesel::insert_into(candidates::table)
                    .values(&candidate)
                    .execute(conn)?;
                diesel::insert_into(stage_history::table)
                    .values(&intake)
                    .execute(conn)?;
                Ok(candidates::table.find(candidate.id).first(conn)?)
            })
        })
        .await
    }

    async fn candidate(&self, id: Uuid) -> StoreResult<Candidate> {
        self.with_conn(move |conn| Ok(candidates::table.find(id).first(conn)?))
            .await
    }

    async fn list_candidates(&self) -> StoreResult<Vec<Candidate>> {
        self.with_conn(move |conn| {
            Ok(candidates::table
                .order(candidates::created_at.asc())
                .load(conn)?)
        })
        .await
    }

    async fn update_candidate_profile(
        &self,
        id: Uuid,
        changes: CandidateProfileUpdate,
    ) -> StoreResult<Candidate> {
        self.with_conn(move |conn| {
            Ok(diesel::update(candidates::table.find(id))
                .set(&changes)
                .get_result(conn)?)
        })
        .await
    }

    async fn commit_stage_transition(
        &self,
        candidate_id: Uuid,
        expected_stage: String,
        entry: NewStageHistoryEntry,
    ) -> StoreResult<Candidate> {
        self.with_conn(move |conn| {
            conn.transaction::<Candidate, StoreError, _>(|conn| {
                let updated = diesel::update(
                    candidates::table
                        .find(candidate_id)
                        .filter(candidates::current_stage.eq(&expected_stage)),
                )
                .set((
                    candidates::current_stage.eq(&entry.stage),
                    candidates::updated_at.eq(entry.completed_at),
                ))
                .execute(conn)?;

                if updated == 0 {
                    let found: bool =
                        select(exists(candidates::table.find(candidate_id))).get_result(conn)?;
                    return Err(if found {
                        StoreError::StaleStage
                    } else {
                        StoreError::NotFound
                    });
                }

                diesel::insert_into(stage_history::table)
                    .values(&entry)
                    .execute(conn)?;

                Ok(candidates::table.find(candidate_id).first(conn)?)
            })
        })
        .await
    }

    async fn stage_history(&self, candidate_id: Uuid) -> StoreResult<Vec<StageHistoryEntry>> {
        self.with_conn(move |conn| {
            Ok(stage_history::table
                .filter(stage_history::candidate_id.eq(candidate_id))
                .order(stage_history::completed_at.asc())
                .load(conn)?)
        })
        .await
    }

    async fn stage_documents_for(&self, stage: String) -> StoreResult<Vec<StageDocument>> {
        self.with_conn(move |conn| {
            Ok(stage_documents::table
                .filter(stage_documents::stage.eq(&stage))
                .order(stage_documents::display_order.asc())
                .load(conn)?)
        })
        .await
    }

    async fn stage_document(&self, id: Uuid) -> StoreResult<StageDocument> {
        self.with_conn(move |conn| Ok(stage_documents::table.find(id).first(conn)?))
            .await
    }

    async fn document_statuses(
        &self,
        candidate_id: Uuid,
        stage_document_ids: Vec<Uuid>,
    ) -> StoreResult<Vec<CandidateDocument>> {
        self.with_conn(move |conn| {
            Ok(candidate_documents::table
                .filter(candidate_documents::candidate_id.eq(candidate_id))
                .filter(candidate_documents::stage_document_id.eq_any(&stage_document_ids))
                .load(conn)?)
        })
        .await
    }

    async fn upsert_document_status(
        &self,
        candidate_id: Uuid,
        stage_document_id: Uuid,
        change: DocumentStatusChange,
    ) -> StoreResult<CandidateDocument> {
        self.with_conn(move |conn| {
            let now = Utc::now().naive_utc();
            let row = match change {
                DocumentStatusChange::Completion { completed } => {
                    let completed_at = completed.then_some(now);
                    let fresh = NewCandidateDocument {
                        id: Uuid::new_v4(),
                        candidate_id,
                        stage_document_id,
                        is_completed: completed,
                        completed_at,
                        attached_file_ref: None,
                        updated_at: now,
                    };
                    diesel::insert_into(candidate_documents::table)
                        .values(&fresh)
                        .on_conflict((
                            candidate_documents::candidate_id,
                            candidate_documents::stage_document_id,
                        ))
                        .do_update()
                        .set((
                            candidate_documents::is_completed.eq(completed),
                            candidate_documents::completed_at.eq(completed_at),
                            candidate_documents::updated_at.eq(now),
                        ))
                        .get_result(conn)?
                }
                DocumentStatusChange::Attachment { file_ref } => {
                    let fresh = NewCandidateDocument {
                        id: Uuid::new_v4(),
                        candidate_id,
                        stage_document_id,
                        is_completed: false,
                        completed_at: None,
                        attached_file_ref: file_ref.clone(),
                        updated_at: now,
                    };
                    diesel::insert_into(candidate_documents::table)
                        .values(&fresh)
                        .on_conflict((
                            candidate_documents::candidate_id,
                            candidate_documents::stage_document_id,
                        ))
                        .do_update()
                        .set((
                            candidate_documents::attached_file_ref.eq(file_ref),
                            candidate_documents::updated_at.eq(now),
                        ))
                        .get_result(conn)?
                }
            };
            Ok(row)
        })
        .await
    }

    async fn append_audit(&self, entry: NewAuditLogEntry) -> StoreResult<()> {
        self.with_conn(move |conn| {
            diesel::insert_into(audit_log::table)
                .values(&entry)
                .execute(conn)?;
            Ok(())
        })
        .await
    }
}
