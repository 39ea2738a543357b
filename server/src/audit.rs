//! Authorization audit trail.
//!
//! Every record is emitted as a tracing event on the `scopegate::audit`
//! target. Depending on the sink it is also persisted to `authz_audit_log`
//! or kept in memory. Audit failures are logged and never fail the
//! operation being audited.

use std::sync::Arc;

use scopegate_common::ScopeType;
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::permissions::queries::write_audit_log;

/// Action tag of access guard decisions.
pub const ACTION_GUARD_CHECK: &str = "guard.check";
/// Action tag of data gateway bypass uses.
pub const ACTION_GATEWAY_BYPASS: &str = "gateway.bypass";

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub actor_id: Option<String>,
    pub action: String,
    pub permission: Option<String>,
    pub scope_type: Option<ScopeType>,
    pub scope_id: Option<String>,
    pub outcome: String,
    pub details: Option<JsonValue>,
}

impl AuditRecord {
    #[must_use]
    pub fn new(action: &str, outcome: &str) -> Self {
        Self {
            actor_id: None,
            action: action.to_string(),
            permission: None,
            scope_type: None,
            scope_id: None,
            outcome: outcome.to_string(),
            details: None,
        }
    }

    #[must_use]
    pub fn actor(mut self, actor_id: Option<&str>) -> Self {
        self.actor_id = actor_id.map(str::to_string);
        self
    }

    #[must_use]
    pub fn permission(mut self, permission: &str) -> Self {
        self.permission = Some(permission.to_string());
        self
    }

    #[must_use]
    pub fn scope(mut self, scope_type: ScopeType, scope_id: Option<&str>) -> Self {
        self.scope_type = Some(scope_type);
        self.scope_id = scope_id.map(str::to_string);
        self
    }

    #[must_use]
    pub fn details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Clone)]
enum AuditSink {
    Tracing,
    Postgres(PgPool),
    Memory(Arc<Mutex<Vec<AuditRecord>>>),
}

/// Writes audit records.
#[derive(Clone)]
pub struct AuditRecorder {
    sink: AuditSink,
}

impl AuditRecorder {
    /// Emit tracing events only.
    #[must_use]
    pub const fn tracing_only() -> Self {
        Self {
            sink: AuditSink::Tracing,
        }
    }

    /// Also persist records to `authz_audit_log`.
    #[must_use]
    pub const fn postgres(pool: PgPool) -> Self {
        Self {
            sink: AuditSink::Postgres(pool),
        }
    }

    /// Also keep records in memory, readable through [`Self::records`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            sink: AuditSink::Memory(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Write one record.
    pub async fn record(&self, record: AuditRecord) {
        tracing::info!(
            target: "scopegate::audit",
            action = %record.action,
            actor_id = ?record.actor_id,
            permission = ?record.permission,
            scope_type = ?record.scope_type,
            scope_id = ?record.scope_id,
            outcome = %record.outcome,
            "authorization audit"
        );

        match &self.sink {
            AuditSink::Tracing => {}
            AuditSink::Postgres(pool) => {
                let scope_type = record.scope_type.map(|s| s.as_str());
                if let Err(e) = write_audit_log(
                    pool,
                    record.actor_id.as_deref(),
                    &record.action,
                    record.permission.as_deref(),
                    scope_type,
                    record.scope_id.as_deref(),
                    &record.outcome,
                    record.details,
                )
                .await
                {
                    tracing::warn!(error = %e, action = %record.action, "Failed to persist audit record");
                }
            }
            AuditSink::Memory(records) => records.lock().await.push(record),
        }
    }

    /// Records kept by an in-memory recorder; empty for other sinks.
    pub async fn records(&self) -> Vec<AuditRecord> {
        match &self.sink {
            AuditSink::Memory(records) => records.lock().await.clone(),
            AuditSink::Tracing | AuditSink::Postgres(_) => Vec::new(),
        }
    }
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sink = match self.sink {
            AuditSink::Tracing => "tracing",
            AuditSink::Postgres(_) => "postgres",
            AuditSink::Memory(_) => "memory",
        };
        f.debug_struct("AuditRecorder").field("sink", &sink).finish()
    }
}
