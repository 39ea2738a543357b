//! Database models for the permission system.
//!
//! These rows are maintained by the administrative surface; this crate only
//! reads them.

use chrono::{DateTime, Utc};
use scopegate_common::ScopeType;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Permission definition.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Permission {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role tag to permission binding, joined with the permission name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RolePermissionBinding {
    pub role: String,
    pub permission_id: Uuid,
    pub permission_name: String,
}

/// Per-user grant or revoke exception.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserPermissionOverride {
    pub id: Uuid,
    pub user_id: String,
    pub permission_id: Uuid,
    pub permission_name: String,
    pub granted: bool,
    #[sqlx(try_from = "String")]
    pub scope_type: ScopeType,
    pub scope_id: Option<String>,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserPermissionOverride {
    /// Whether `valid_until` has passed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|until| until <= now)
    }
}

/// Named bundle of permissions for bulk assignment.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PermissionGroup {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Group membership of a permission.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GroupMapping {
    pub group_id: Uuid,
    pub permission_id: Uuid,
}

/// Authorization audit log entry.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor_id: Option<String>,
    pub action: String,
    pub permission: Option<String>,
    pub scope_type: Option<String>,
    pub scope_id: Option<String>,
    pub outcome: String,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn override_until(valid_until: Option<DateTime<Utc>>) -> UserPermissionOverride {
        let now = Utc::now();
        UserPermissionOverride {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            permission_id: Uuid::new_v4(),
            permission_name: "payments.read".to_string(),
            granted: true,
            scope_type: ScopeType::Global,
            scope_id: None,
            valid_until,
            created_by: None,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_override_without_expiry_never_expires() {
        assert!(!override_until(None).is_expired(Utc::now()));
    }

    #[test]
    fn test_override_expiry_boundary() {
        let now = Utc::now();
        assert!(override_until(Some(now)).is_expired(now));
        assert!(override_until(Some(now - Duration::seconds(1))).is_expired(now));
        assert!(!override_until(Some(now + Duration::seconds(1))).is_expired(now));
    }
}
