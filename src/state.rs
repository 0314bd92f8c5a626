use std::sync::Arc;

use crate::{audit::AuditRecorder, config::AppConfig, storage::ObjectStorage, store::PipelineStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PipelineStore>,
    pub storage: Arc<dyn ObjectStorage>,
    pub config: Arc<AppConfig>,
    pub audit: AuditRecorder,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PipelineStore>,
        storage: Arc<dyn ObjectStorage>,
        config: AppConfig,
    ) -> Self {
        let audit = AuditRecorder::new(store.clone());
        Self {
            store,
            storage,
            config: Arc::new(config),
            audit,
        }
    }
}
