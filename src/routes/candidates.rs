use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::Actor;
use crate::error::{AppError, AppResult};
use crate::expiry::ComplianceView;
use crate::models::{Candidate, CandidateProfileUpdate, StageHistoryEntry};
use crate::pipeline::{self, CandidateIntake};
use crate::stages::Stage;
use crate::state::AppState;

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}

#[derive(Deserialize)]
pub struct CreateCandidateRequest {
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

#[derive(Deserialize, Default)]
pub struct UpdateCandidateRequest {
    pub full_name: Option<String>,
    pub passport_number: Option<String>,
    pub nationality: Option<String>,
    pub phone: Option<String>,
    pub employer: Option<String>,
    pub medical_fit_date: Option<NaiveDate>,
    pub visa_issue_date: Option<NaiveDate>,
    pub passport_issue_date: Option<NaiveDate>,
    pub passport_expiry_date: Option<NaiveDate>,
}

#[derive(Deserialize, Default)]
pub struct TransitionRequest {
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct SetStageRequest {
    pub stage: String,
    pub notes: Option<String>,
}

#[derive(Serialize)]
pub struct CandidateResponse {
    pub id: Uuid,
    pub full_name: String,
    pub passport_number: String,
    pub nationality: String,
    pub phone: Option<String>,
    pub employer: Option<String>,
    pub current_stage: &'static str,
    pub stage_label: &'static str,
    pub progress: f64,
    pub medical_fit_date: Option<NaiveDate>,
    pub visa_issue_date: Option<NaiveDate>,
    pub passport_issue_date: Option<NaiveDate>,
    pub passport_expiry_date: Option<NaiveDate>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize)]
pub struct CandidateDetailResponse {
    pub candidate: CandidateResponse,
    pub compliance: ComplianceView,
}

#[derive(Serialize)]
pub struct TransitionResponse {
    pub candidate: CandidateResponse,
    pub from: &'static str,
    pub to: &'static str,
}

#[derive(Serialize)]
pub struct StageHistoryResponse {
    pub id: Uuid,
    pub stage: String,
    pub stage_label: Option<&'static str>,
    pub completed_at: String,
    pub notes: Option<String>,
    pub actor_id: Uuid,
}

pub(crate) fn to_candidate_response(candidate: Candidate) -> AppResult<CandidateResponse> {
    let stage = pipeline::stage_of(&candidate)?;
    Ok(CandidateResponse {
        id: candidate.id,
        full_name: candidate.full_name,
        passport_number: candidate.passport_number,
        nationality: candidate.nationality,
        phone: candidate.phone,
        employer: candidate.employer,
        current_stage: stage.key(),
        stage_label: stage.label(),
        progress: stage.progress(),
        medical_fit_date: candidate.medical_fit_date,
        visa_issue_date: candidate.visa_issue_date,
        passport_issue_date: candidate.passport_issue_date,
        passport_expiry_date: candidate.passport_expiry_date,
        created_at: to_iso(candidate.created_at),
        updated_at: to_iso(candidate.updated_at),
    })
}

fn to_history_response(entry: StageHistoryEntry) -> StageHistoryResponse {
    let stage_label = entry.stage.parse::<Stage>().ok().map(Stage::label);
    StageHistoryResponse {
        id: entry.id,
        stage: entry.stage,
        stage_label,
        completed_at: to_iso(entry.completed_at),
        notes: entry.notes,
        actor_id: entry.actor_id,
    }
}

fn required_field(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn optional_field(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(str::to_string)
}

pub async fn create_candidate(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateCandidateRequest>,
) -> AppResult<(StatusCode, Json<CandidateResponse>)> {
    let intake = CandidateIntake {
        full_name: required_field(&payload.full_name, "full_name")?,
        passport_number: required_field(&payload.passport_number, "passport_number")?,
        nationality: required_field(&payload.nationality, "nationality")?,
        phone: optional_field(payload.phone),
        employer: optional_field(payload.employer),
        medical_fit_date: payload.medical_fit_date,
        visa_issue_date: payload.visa_issue_date,
        passport_issue_date: payload.passport_issue_date,
        passport_expiry_date: payload.passport_expiry_date,
    };

    let candidate = pipeline::create(state.store.as_ref(), &state.audit, &actor, intake).await?;
    Ok((StatusCode::CREATED, Json(to_candidate_response(candidate)?)))
}

pub async fn list_candidates(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<CandidateResponse>>> {
    let roster = pipeline::roster(state.store.as_ref()).await?;
    let response = roster
        .into_iter()
        .map(to_candidate_response)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(response))
}

pub async fn get_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> AppResult<Json<CandidateDetailResponse>> {
    let today = Utc::now().date_naive();
    let state_view = pipeline::state(state.store.as_ref(), candidate_id, today).await?;
    Ok(Json(CandidateDetailResponse {
        candidate: to_candidate_response(state_view.candidate)?,
        compliance: state_view.compliance,
    }))
}

pub async fn update_candidate(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<UpdateCandidateRequest>,
) -> AppResult<Json<CandidateResponse>> {
    let changes = CandidateProfileUpdate {
        full_name: payload
            .full_name
            .map(|value| required_field(&value, "full_name"))
            .transpose()?,
        passport_number: payload
            .passport_number
            .map(|value| required_field(&value, "passport_number"))
            .transpose()?,
        nationality: payload
            .nationality
            .map(|value| required_field(&value, "nationality"))
            .transpose()?,
        phone: optional_field(payload.phone),
        employer: optional_field(payload.employer),
        medical_fit_date: payload.medical_fit_date,
        visa_issue_date: payload.visa_issue_date,
        passport_issue_date: payload.passport_issue_date,
        passport_expiry_date: payload.passport_expiry_date,
        updated_at: None,
    };

    if changes.is_empty() {
        return Err(AppError::bad_request("no changes provided"));
    }

    let candidate = pipeline::update_profile(
        state.store.as_ref(),
        &state.audit,
        &actor,
        candidate_id,
        changes,
    )
    .await?;
    Ok(Json(to_candidate_response(candidate)?))
}

pub async fn advance_stage(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    actor: Actor,
    payload: Option<Json<TransitionRequest>>,
) -> AppResult<Json<TransitionResponse>> {
    let notes = payload.and_then(|Json(body)| body.notes);
    let outcome = pipeline::advance(
        state.store.as_ref(),
        &state.audit,
        &actor,
        candidate_id,
        notes,
    )
    .await?;
    Ok(Json(TransitionResponse {
        candidate: to_candidate_response(outcome.candidate)?,
        from: outcome.from.key(),
        to: outcome.to.key(),
    }))
}

pub async fn set_stage(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
    actor: Actor,
    Json(payload): Json<SetStageRequest>,
) -> AppResult<Json<TransitionResponse>> {
    let target: Stage = payload
        .stage
        .parse()
        .map_err(|err: crate::stages::UnknownStage| AppError::bad_request(err.to_string()))?;

    let outcome = pipeline::set_stage(
        state.store.as_ref(),
        &state.audit,
        &actor,
        candidate_id,
        target,
        payload.notes,
    )
    .await?;
    Ok(Json(TransitionResponse {
        candidate: to_candidate_response(outcome.candidate)?,
        from: outcome.from.key(),
        to: outcome.to.key(),
    }))
}

pub async fn stage_history(
    State(state): State<AppState>,
    Path(candidate_id): Path<Uuid>,
) -> AppResult<Json<Vec<StageHistoryResponse>>> {
    let entries = pipeline::history(state.store.as_ref(), candidate_id).await?;
    Ok(Json(entries.into_iter().map(to_history_response).collect()))
}
