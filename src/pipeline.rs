use chrono::{NaiveDate, Utc};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::actor::Actor;
use crate::audit::{AuditAction, AuditRecorder};
use crate::expiry::{self, ComplianceView};
use crate::models::{
    Candidate, CandidateProfileUpdate, NewCandidate, NewStageHistoryEntry, StageHistoryEntry,
};
use crate::stages::{Stage, UnknownStage};
use crate::store::{PipelineStore, StoreError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("candidate not found")]
    CandidateNotFound,
    #[error("candidate is already at the terminal stage '{0}'")]
    NoNextStage(&'static str),
    #[error(transparent)]
    UnknownStage(#[from] UnknownStage),
    #[error("candidate stage changed concurrently; re-read and retry")]
    ConcurrentModification,
    #[error("persistence store failure: {0}")]
    Store(#[source] anyhow::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl From<StoreError> for PipelineError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => PipelineError::CandidateNotFound,
            StoreError::StaleStage => PipelineError::ConcurrentModification,
            StoreError::Backend(err) => PipelineError::Store(err),
        }
    }
}

/// Intake payload for a new candidate. The initial stage is not a caller
/// choice; every candidate enters at the front of the catalog.
#[derive(Debug, Clone)]
pub struct CandidateIntake {
    pub full_name: String,
    pub passport_number: String,
    pub nationality: String,
    pub phone: Option<String>,
    pub employer: Option<String>,
    pub medical_fit_date: Option<NaiveDate>,
    pub visa_issue_date: Option<NaiveDate>,
    pub passport_issue_date: Option<NaiveDate>,
    pub passport_expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub candidate: Candidate,
    pub from: Stage,
    pub to: Stage,
}

#[derive(Debug, Clone)]
pub struct CandidateState {
    pub candidate: Candidate,
    pub stage: Stage,
    pub progress: f64,
    pub compliance: ComplianceView,
}

pub fn stage_of(candidate: &Candidate) -> PipelineResult<Stage> {
    Ok(candidate.current_stage.parse()?)
}

pub fn profile_snapshot(candidate: &Candidate) -> serde_json::Value {
    json!({
        "full_name": candidate.full_name,
        "passport_number": candidate.passport_number,
        "nationality": candidate.nationality,
        "phone": candidate.phone,
        "employer": candidate.employer,
        "current_stage": candidate.current_stage,
        "medical_fit_date": candidate.medical_fit_date,
        "visa_issue_date": candidate.visa_issue_date,
        "passport_issue_date": candidate.passport_issue_date,
        "passport_expiry_date": candidate.passport_expiry_date,
    })
}

/// Register a candidate at the first catalog stage, writing the intake
/// history entry in the same transaction and a `create` audit entry.
pub async fn create(
    store: &dyn PipelineStore,
    audit: &AuditRecorder,
    actor: &Actor,
    intake: CandidateIntake,
) -> PipelineResult<Candidate> {
    let initial = Stage::first();
    let candidate_id = Uuid::new_v4();
    let now = Utc::now().naive_utc();

    let candidate = NewCandidate {
        id: candidate_id,
        full_name: intake.full_name,
        passport_number: intake.passport_number,
        nationality: intake.nationality,
        phone: intake.phone,
        employer: intake.employer,
        current_stage: initial.key().to_string(),
        medical_fit_date: intake.medical_fit_date,
        visa_issue_date: intake.visa_issue_date,
        passport_issue_date: intake.passport_issue_date,
        passport_expiry_date: intake.passport_expiry_date,
    };
    let entry = NewStageHistoryEntry {
        id: Uuid::new_v4(),
        candidate_id,
        stage: initial.key().to_string(),
        completed_at: now,
        notes: Some("Intake".to_string()),
        actor_id: actor.id,
    };

    let created = store.insert_candidate(candidate, entry).await?;

    audit
        .record(
            actor,
            AuditAction::Create,
            "candidate",
            created.id,
            None,
            Some(profile_snapshot(&created)),
            format!("registered candidate '{}'", created.full_name),
        )
        .await;

    Ok(created)
}

/// Single-step forward transition. The stage write is conditional on the
/// stage read here, so a concurrent writer surfaces as
/// [`PipelineError::ConcurrentModification`] instead of a double advance.
pub async fn advance(
    store: &dyn PipelineStore,
    audit: &AuditRecorder,
    actor: &Actor,
    candidate_id: Uuid,
    notes: Option<String>,
) -> PipelineResult<TransitionOutcome> {
    let candidate = store.candidate(candidate_id).await?;
    let current = stage_of(&candidate)?;
    let next = current
        .next()
        .ok_or(PipelineError::NoNextStage(current.key()))?;

    commit_transition(store, audit, actor, candidate_id, current, next, notes).await
}

/// Administrative override to any catalog stage, regression included.
/// Writes the same history and audit records as the guided path. The
/// target is absolute, so a lost race is retried once against the fresh
/// stage before surfacing the conflict.
pub async fn set_stage(
    store: &dyn PipelineStore,
    audit: &AuditRecorder,
    actor: &Actor,
    candidate_id: Uuid,
    target: Stage,
    notes: Option<String>,
) -> PipelineResult<TransitionOutcome> {
    let candidate = store.candidate(candidate_id).await?;
    let current = stage_of(&candidate)?;

    match commit_transition(
        store,
        audit,
        actor,
        candidate_id,
        current,
        target,
        notes.clone(),
    )
    .await
    {
        Err(PipelineError::ConcurrentModification) => {
            let candidate = store.candidate(candidate_id).await?;
            let current = stage_of(&candidate)?;
            commit_transition(store, audit, actor, candidate_id, current, target, notes).await
        }
        other => other,
    }
}

async fn commit_transition(
    store: &dyn PipelineStore,
    audit: &AuditRecorder,
    actor: &Actor,
    candidate_id: Uuid,
    from: Stage,
    to: Stage,
    notes: Option<String>,
) -> PipelineResult<TransitionOutcome> {
    let entry = NewStageHistoryEntry {
        id: Uuid::new_v4(),
        candidate_id,
        stage: to.key().to_string(),
        completed_at: Utc::now().naive_utc(),
        notes,
        actor_id: actor.id,
    };

    let candidate = store
        .commit_stage_transition(candidate_id, from.key().to_string(), entry)
        .await?;

    audit
        .record(
            actor,
            AuditAction::Update,
            "candidate",
            candidate_id,
            Some(json!({ "current_stage": from.key() })),
            Some(json!({ "current_stage": to.key() })),
            format!("stage moved from '{}' to '{}'", from.key(), to.key()),
        )
        .await;

    Ok(TransitionOutcome {
        candidate,
        from,
        to,
    })
}

pub async fn state(
    store: &dyn PipelineStore,
    candidate_id: Uuid,
    today: NaiveDate,
) -> PipelineResult<CandidateState> {
    let candidate = store.candidate(candidate_id).await?;
    let stage = stage_of(&candidate)?;
    let compliance = expiry::compliance_view(
        candidate.medical_fit_date,
        candidate.visa_issue_date,
        candidate.passport_expiry_date,
        today,
    );
    Ok(CandidateState {
        progress: stage.progress(),
        stage,
        compliance,
        candidate,
    })
}

pub async fn candidate(
    store: &dyn PipelineStore,
    candidate_id: Uuid,
) -> PipelineResult<Candidate> {
    Ok(store.candidate(candidate_id).await?)
}

pub async fn roster(store: &dyn PipelineStore) -> PipelineResult<Vec<Candidate>> {
    Ok(store.list_candidates().await?)
}

pub async fn history(
    store: &dyn PipelineStore,
    candidate_id: Uuid,
) -> PipelineResult<Vec<StageHistoryEntry>> {
    // Existence check first so an unknown id is a 404, not an empty list.
    store.candidate(candidate_id).await?;
    Ok(store.stage_history(candidate_id).await?)
}

/// Apply a profile edit and audit it with old/new snapshots. Stage moves
/// are rejected here by construction: [`CandidateProfileUpdate`] carries
/// no stage field.
pub async fn update_profile(
    store: &dyn PipelineStore,
    audit: &AuditRecorder,
    actor: &Actor,
    candidate_id: Uuid,
    mut changes: CandidateProfileUpdate,
) -> PipelineResult<Candidate> {
    let before = store.candidate(candidate_id).await?;
    changes.updated_at = Some(Utc::now().naive_utc());
    let after = store.update_candidate_profile(candidate_id, changes).await?;

    audit
        .record(
            actor,
            AuditAction::Update,
            "candidate",
            candidate_id,
            Some(profile_snapshot(&before)),
            Some(profile_snapshot(&after)),
            format!("updated profile of '{}'", after.full_name),
        )
        .await;

    Ok(after)
}
