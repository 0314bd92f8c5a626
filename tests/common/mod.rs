use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, ensure, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tower::util::ServiceExt;
use uuid::Uuid;

use recruitline::checklist::default_stage_documents;
use recruitline::config::AppConfig;
use recruitline::models::{
    AuditLogEntry, Candidate, CandidateDocument, CandidateProfileUpdate, NewAuditLogEntry,
    NewCandidate, NewStageHistoryEntry, StageDocument, StageHistoryEntry,
};
use recruitline::routes;
use recruitline::stages::Stage;
use recruitline::state::AppState;
use recruitline::storage::ObjectStorage;
use recruitline::store::{DocumentStatusChange, PipelineStore, StoreError, StoreResult};

#[derive(Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// In-memory stand-in for S3, with a switchable delete failure so the
/// "storage deletion must precede reference clearing" contract is
/// testable.
#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
    fail_deletes: AtomicBool,
}

impl FakeStorage {
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    #[allow(dead_code)]
    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    #[allow(dead_code)]
    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<()> {
        let mut guard = self.objects.lock().unwrap();
        guard.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type,
            },
        );
        Ok(())
    }

    async fn presign_get_object(&self, key: &str, expires_in: Duration) -> Result<String> {
        let guard = self.objects.lock().unwrap();
        ensure!(guard.contains_key(key), "object {key} missing");
        Ok(format!(
            "https://fake-storage/{key}?expires_in={}",
            expires_in.as_secs()
        ))
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(anyhow!("storage unavailable"));
        }
        let mut guard = self.objects.lock().unwrap();
        guard.remove(key);
        Ok(())
    }
}

#[derive(Default)]
struct MemoryInner {
    candidates: HashMap<Uuid, Candidate>,
    history: Vec<StageHistoryEntry>,
    stage_documents: Vec<StageDocument>,
    statuses: HashMap<(Uuid, Uuid), CandidateDocument>,
    audit: Vec<AuditLogEntry>,
}

/// Mutex-guarded store with the same conditional-update and upsert
/// semantics as the Postgres implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
    fail_audit: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        let store = MemoryStore::default();
        {
            let mut inner = store.inner.lock().unwrap();
            inner.stage_documents = default_stage_documents()
                .into_iter()
                .map(|doc| StageDocument {
                    id: doc.id,
                    stage: doc.stage,
                    document_name: doc.document_name,
                    is_required: doc.is_required,
                    display_order: doc.display_order,
                })
                .collect();
        }
        store
    }

    pub fn set_fail_audit(&self, fail: bool) {
        self.fail_audit.store(fail, Ordering::SeqCst);
    }

    pub fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.inner.lock().unwrap().audit.clone()
    }

    pub fn history_len(&self, candidate_id: Uuid) -> usize {
        self.inner
            .lock()
            .unwrap()
            .history
            .iter()
            .filter(|entry| entry.candidate_id == candidate_id)
            .count()
    }

    pub fn status_row_count(&self, candidate_id: Uuid) -> usize {
        self.inner
            .lock()
            .unwrap()
            .statuses
            .keys()
            .filter(|(candidate, _)| *candidate == candidate_id)
            .count()
    }

    /// First catalog document for a stage, in display order.
    pub fn first_document_for(&self, stage: Stage) -> StageDocument {
        let inner = self.inner.lock().unwrap();
        inner
            .stage_documents
            .iter()
            .filter(|doc| doc.stage == stage.key())
            .min_by_key(|doc| doc.display_order)
            .cloned()
            .expect("stage has no catalog documents")
    }

    pub fn documents_for(&self, stage: Stage) -> Vec<StageDocument> {
        let inner = self.inner.lock().unwrap();
        let mut documents: Vec<StageDocument> = inner
            .stage_documents
            .iter()
            .filter(|doc| doc.stage == stage.key())
            .cloned()
            .collect();
        documents.sort_by_key(|doc| doc.display_order);
        documents
    }
}

#[async_trait]
impl PipelineStore for MemoryStore {
    async fn insert_candidate(
        &self,
        candidate: NewCandidate,
        intake: NewStageHistoryEntry,
    ) -> StoreResult<Candidate> {
        let now = Utc::now().naive_utc();
        let row = Candidate {
            id: candidate.id,
            full_name: candidate.full_name,
            passport_number: candidate.passport_number,
            nationality: candidate.nationality,
            phone: candidate.phone,
            employer: candidate.employer,
            current_stage: candidate.current_stage,
            medical_fit_date: candidate.medical_fit_date,
            visa_issue_date: candidate.visa_issue_date,
            passport_issue_date: candidate.passport_issue_date,
            passport_expiry_date: candidate.passport_expiry_date,
            created_at: now,
            updated_at: now,
        };
        let mut inner = self.inner.lock().unwrap();
        inner.candidates.insert(row.id, row.clone());
        inner.history.push(StageHistoryEntry {
            id: intake.id,
            candidate_id: intake.candidate_id,
            stage: intake.stage,
            completed_at: intake.completed_at,
            notes: intake.notes,
            actor_id: intake.actor_id,
        });
        Ok(row)
    }

    async fn candidate(&self, id: Uuid) -> StoreResult<Candidate> {
        self.inner
            .lock()
            .unwrap()
            .candidates
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn list_candidates(&self) -> StoreResult<Vec<Candidate>> {
        let inner = self.inner.lock().unwrap();
        let mut candidates: Vec<Candidate> = inner.candidates.values().cloned().collect();
        candidates.sort_by_key(|candidate| candidate.created_at);
        Ok(candidates)
    }

    async fn update_candidate_profile(
        &self,
        id: Uuid,
        changes: CandidateProfileUpdate,
    ) -> StoreResult<Candidate> {
        let mut inner = self.inner.lock().unwrap();
        let candidate = inner.candidates.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(value) = changes.full_name {
            candidate.full_name = value;
        }
        if let Some(value) = changes.passport_number {
            candidate.passport_number = value;
        }
        if let Some(value) = changes.nationality {
            candidate.nationality = value;
        }
        if let Some(value) = changes.phone {
            candidate.phone = Some(value);
        }
        if let Some(value) = changes.employer {
            candidate.employer = Some(value);
        }
        if let Some(value) = changes.medical_fit_date {
            candidate.medical_fit_date = Some(value);
        }
        if let Some(value) = changes.visa_issue_date {
            candidate.visa_issue_date = Some(value);
        }
        if let Some(value) = changes.passport_issue_date {
            candidate.passport_issue_date = Some(value);
        }
        if let Some(value) = changes.passport_expiry_date {
            candidate.passport_expiry_date = Some(value);
        }
        if let Some(value) = changes.updated_at {
            candidate.updated_at = value;
        }
        Ok(candidate.clone())
    }

    async fn commit_stage_transition(
        &self,
        candidate_id: Uuid,
        expected_stage: String,
        entry: NewStageHistoryEntry,
    ) -> StoreResult<Candidate> {
        let mut inner = self.inner.lock().unwrap();
        let candidate = inner
            .candidates
            .get_mut(&candidate_id)
            .ok_or(StoreError::NotFound)?;
        if candidate.current_stage != expected_stage {
            return Err(StoreError::StaleStage);
        }
        candidate.current_stage = entry.stage.clone();
        candidate.updated_at = entry.completed_at;
        let updated = candidate.clone();
        inner.history.push(StageHistoryEntry {
            id: entry.id,
            candidate_id: entry.candidate_id,
            stage: entry.stage,
            completed_at: entry.completed_at,
            notes: entry.notes,
            actor_id: entry.actor_id,
        });
        Ok(updated)
    }

    async fn stage_history(&self, candidate_id: Uuid) -> StoreResult<Vec<StageHistoryEntry>> {
        let inner = self.inner.lock().unwrap();
        let mut entries: Vec<StageHistoryEntry> = inner
            .history
            .iter()
            .filter(|entry| entry.candidate_id == candidate_id)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.completed_at);
        Ok(entries)
    }

    async fn stage_documents_for(&self, stage: String) -> StoreResult<Vec<StageDocument>> {
        let inner = self.inner.lock().unwrap();
        let mut documents: Vec<StageDocument> = inner
            .stage_documents
            .iter()
            .filter(|doc| doc.stage == stage)
            .cloned()
            .collect();
        documents.sort_by_key(|doc| doc.display_order);
        Ok(documents)
    }

    async fn stage_document(&self, id: Uuid) -> StoreResult<StageDocument> {
        self.inner
            .lock()
            .unwrap()
            .stage_documents
            .iter()
            .find(|doc| doc.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn document_statuses(
        &self,
        candidate_id: Uuid,
        stage_document_ids: Vec<Uuid>,
    ) -> StoreResult<Vec<CandidateDocument>> {
        let inner = self.inner.lock().unwrap();
        Ok(stage_document_ids
            .iter()
            .filter_map(|doc_id| inner.statuses.get(&(candidate_id, *doc_id)).cloned())
            .collect())
    }

    async fn upsert_document_status(
        &self,
        candidate_id: Uuid,
        stage_document_id: Uuid,
        change: DocumentStatusChange,
    ) -> StoreResult<CandidateDocument> {
        let now = Utc::now().naive_utc();
        let mut inner = self.inner.lock().unwrap();
        let row = inner
            .statuses
            .entry((candidate_id, stage_document_id))
            .or_insert_with(|| CandidateDocument {
                id: Uuid::new_v4(),
                candidate_id,
                stage_document_id,
                is_completed: false,
                completed_at: None,
                attached_file_ref: None,
                updated_at: now,
            });
        match change {
            DocumentStatusChange::Completion { completed } => {
                row.is_completed = completed;
                row.completed_at = completed.then_some(now);
            }
            DocumentStatusChange::Attachment { file_ref } => {
                row.attached_file_ref = file_ref;
            }
        }
        row.updated_at = now;
        Ok(row.clone())
    }

    async fn append_audit(&self, entry: NewAuditLogEntry) -> StoreResult<()> {
        if self.fail_audit.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow!("audit sink unavailable")));
        }
        let mut inner = self.inner.lock().unwrap();
        inner.audit.push(AuditLogEntry {
            id: entry.id,
            actor_id: entry.actor_id,
            actor_label: entry.actor_label,
            action: entry.action,
            entity_name: entry.entity_name,
            entity_id: entry.entity_id,
            old_snapshot: entry.old_snapshot,
            new_snapshot: entry.new_snapshot,
            description: entry.description,
            created_at: Utc::now().naive_utc(),
        });
        Ok(())
    }
}

pub struct TestApp {
    #[allow(dead_code)]
    pub state: AppState,
    router: Router,
    pub store: Arc<MemoryStore>,
    pub storage: Arc<FakeStorage>,
    pub actor_id: Uuid,
}

impl TestApp {
    pub fn new() -> Self {
        let config = AppConfig {
            database_url: "postgres://unused".to_string(),
            database_max_pool_size: 1,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            cors_allowed_origin: None,
            aws_endpoint_url: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region: "us-east-1".to_string(),
            s3_bucket: "test-bucket".to_string(),
        };

        let store = Arc::new(MemoryStore::new());
        let storage = Arc::new(FakeStorage::default());
        let store_for_state: Arc<dyn PipelineStore> = store.clone();
        let storage_for_state: Arc<dyn ObjectStorage> = storage.clone();
        let state = AppState::new(store_for_state, storage_for_state, config);
        let router = routes::create_router(state.clone());

        Self {
            state,
            router,
            store,
            storage,
            actor_id: Uuid::new_v4(),
        }
    }

    fn request_builder(&self, method: Method, path: &str, with_actor: bool) -> axum::http::request::Builder {
        let mut builder = Request::builder().method(method).uri(path);
        if with_actor {
            builder = builder
                .header("x-actor-id", self.actor_id.to_string())
                .header("x-actor-label", "Case Officer");
        }
        builder
    }

    pub async fn get(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = self
            .request_builder(Method::GET, path, true)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn delete(&self, path: &str) -> Result<hyper::Response<Body>> {
        let request = self
            .request_builder(Method::DELETE, path, true)
            .body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        with_actor: bool,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let request = self
            .request_builder(method, path, with_actor)
            .header("content-type", "application/json")
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, true).await
    }

    pub async fn patch_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PATCH, path, payload, true).await
    }

    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PUT, path, payload, true).await
    }

    pub async fn upload_file(
        &self,
        path: &str,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<hyper::Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let mut body = Vec::new();
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        body.extend(data);
        body.extend(b"\r\n");
        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let request = self
            .request_builder(Method::POST, path, true)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    /// Intake helper: registers a candidate and returns its id.
    pub async fn create_candidate(&self, full_name: &str, passport_number: &str) -> Result<Uuid> {
        let response = self
            .post_json(
                "/api/candidates",
                &serde_json::json!({
                    "full_name": full_name,
                    "passport_number": passport_number,
                    "nationality": "Kenyan",
                }),
            )
            .await?;
        ensure!(
            response.status() == StatusCode::CREATED,
            "candidate intake failed with status {}",
            response.status()
        );
        let body = body_to_vec(response.into_body()).await?;
        let value: serde_json::Value = serde_json::from_slice(&body)?;
        let id = value
            .get("id")
            .and_then(|id| id.as_str())
            .ok_or_else(|| anyhow!("intake response missing id"))?;
        Ok(Uuid::parse_str(id)?)
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

pub async fn body_json<T: DeserializeOwned>(body: Body) -> Result<T> {
    let bytes = body_to_vec(body).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
