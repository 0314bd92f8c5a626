use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::actor::Actor;
use crate::models::NewAuditLogEntry;
use crate::store::PipelineStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write-only sink for the append-only audit trail. A failed append must
/// never fail the mutation it describes; it is logged so gaps remain
/// detectable operationally.
#[derive(Clone)]
pub struct AuditRecorder {
    store: Arc<dyn PipelineStore>,
}

impl AuditRecorder {
    pub fn new(store: Arc<dyn PipelineStore>) -> Self {
        Self { store }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record(
        &self,
        actor: &Actor,
        action: AuditAction,
        entity_name: &str,
        entity_id: Uuid,
        old_snapshot: Option<Value>,
        new_snapshot: Option<Value>,
        description: impl Into<String>,
    ) {
        let entry = NewAuditLogEntry {
            id: Uuid::new_v4(),
            actor_id: actor.id,
            actor_label: actor.label.clone(),
            action: action.as_str().to_string(),
            entity_name: entity_name.to_string(),
            entity_id,
            old_snapshot,
            new_snapshot,
            description: description.into(),
        };

        if let Err(err) = self.store.append_audit(entry).await {
            tracing::error!(
                entity = entity_name,
                %entity_id,
                action = action.as_str(),
                error = %err,
                "failed to append audit entry"
            );
        }
    }
}
