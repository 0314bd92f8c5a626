use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = candidates)]
pub struct Candidate {
    pub id: Uuid,
    pub full_name: String,
    pub passport_number: String,
    pub nationality: String,
    pub phone: Option<String>,
    pub employer: Option<String>,
    pub current_stage: String,
    pub medical_fit_date: Option<NaiveDate>,
    pub visa_issue_date: Option<NaiveDate>,
    pub passport_issue_date: Option<NaiveDate>,
    pub passport_expiry_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = candidates)]
pub struct NewCandidate {
    pub id: Uuid,
    pub full_name: String,
    pub passport_number: String,
    pub nationality: String,
    pub phone: Option<String>,
    pub employer: Option<String>,
    pub current_stage: String,
    pub medical_fit_date: Option<NaiveDate>,
    pub visa_issue_date: Option<NaiveDate>,
    pub passport_issue_date: Option<NaiveDate>,
    pub passport_expiry_date: Option<NaiveDate>,
}

/// Profile fields an edit may touch. `None` leaves the column unchanged;
/// `current_stage` deliberately has no entry here — stage moves go
/// through the pipeline engine only.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = candidates)]
pub struct CandidateProfileUpdate {
    pub full_name: Option<String>,
    pub passport_number: Option<String>,
    pub nationality: Option<String>,
    pub phone: Option<String>,
    pub employer: Option<String>,
    pub medical_fit_date: Option<NaiveDate>,
    pub visa_issue_date: Option<NaiveDate>,
    pub passport_issue_date: Option<NaiveDate>,
    pub passport_expiry_date: Option<NaiveDate>,
    pub updated_at: Option<NaiveDateTime>,
}

impl CandidateProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.passport_number.is_none()
            && self.nationality.is_none()
            && self.phone.is_none()
            && self.employer.is_none()
            && self.medical_fit_date.is_none()
            && self.visa_issue_date.is_none()
            && self.passport_issue_date.is_none()
            && self.passport_expiry_date.is_none()
    }
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = stage_history)]
#[diesel(belongs_to(Candidate))]
pub struct StageHistoryEntry {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub stage: String,
    pub completed_at: NaiveDateTime,
    pub notes: Option<String>,
    pub actor_id: Uuid,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = stage_history)]
pub struct NewStageHistoryEntry {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub stage: String,
    pub completed_at: NaiveDateTime,
    pub notes: Option<String>,
    pub actor_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = stage_documents)]
pub struct StageDocument {
    pub id: Uuid,
    pub stage: String,
    pub document_name: String,
    pub is_required: bool,
    pub display_order: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = stage_documents)]
pub struct NewStageDocument {
    pub id: Uuid,
    pub stage: String,
    pub document_name: String,
    pub is_required: bool,
    pub display_order: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = candidate_documents)]
#[diesel(belongs_to(Candidate))]
#[diesel(belongs_to(StageDocument))]
pub struct CandidateDocument {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub stage_document_id: Uuid,
    pub is_completed: bool,
    pub completed_at: Option<NaiveDateTime>,
    pub attached_file_ref: Option<String>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = candidate_documents)]
pub struct NewCandidateDocument {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub stage_document_id: Uuid,
    pub is_completed: bool,
    pub completed_at: Option<NaiveDateTime>,
    pub attached_file_ref: Option<String>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = audit_log)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub actor_label: String,
    pub action: String,
    pub entity_name: String,
    pub entity_id: Uuid,
    pub old_snapshot: Option<serde_json::Value>,
    pub new_snapshot: Option<serde_json::Value>,
    pub description: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = audit_log)]
pub struct NewAuditLogEntry {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub actor_label: String,
    pub action: String,
    pub entity_name: String,
    pub entity_id: Uuid,
    pub old_snapshot: Option<serde_json::Value>,
    pub new_snapshot: Option<serde_json::Value>,
    pub description: String,
}
