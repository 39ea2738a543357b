//! Scope-enforcing data gateway.

use serde_json::json;

use super::bypass::Bypass;
use super::collection::ScopedCollection;
use super::predicate::ScopePredicate;
use super::query::{Operation, ScopedInsert, ScopedQuery, ScopedStatement, ScopedUpdate};
use crate::audit::{AuditRecord, AuditRecorder, ACTION_GATEWAY_BYPASS};
use crate::error::AuthzResult;
use crate::scope;

/// Entry point for every statement on a scope-carrying collection.
///
/// Reads the operation's context from the propagation store. Without a
/// context, or for an anonymous one, statements are refused.
#[derive(Debug, Clone)]
pub struct DataGateway {
    audit: AuditRecorder,
}

impl DataGateway {
    #[must_use]
    pub const fn new(audit: AuditRecorder) -> Self {
        Self { audit }
    }

    /// `SELECT columns FROM collection WHERE <scope>`; empty `columns` selects `*`.
    pub async fn select<'a>(
        &self,
        collection: &ScopedCollection,
        columns: &[&str],
        bypass: Option<Bypass>,
    ) -> AuthzResult<ScopedQuery<'a>> {
        let predicate = self.predicate(collection, Operation::Select, bypass).await?;
        Ok(ScopedQuery::select(collection, columns, predicate))
    }

    /// `INSERT INTO collection (columns.., <scope column>) VALUES (..)`.
    ///
    /// Under a UNIT or SELF context the scope column is filled from the
    /// context and may not appear in `columns`. GLOBAL operations and
    /// bypasses insert exactly the listed columns.
    pub async fn insert<'a>(
        &self,
        collection: &ScopedCollection,
        columns: &[&str],
        bypass: Option<Bypass>,
    ) -> AuthzResult<ScopedInsert<'a>> {
        let predicate = self.predicate(collection, Operation::Insert, bypass).await?;
        ScopedInsert::new(collection, columns, predicate)
    }

    /// `UPDATE collection SET ... WHERE <scope>`.
    pub async fn update<'a>(
        &self,
        collection: &ScopedCollection,
        bypass: Option<Bypass>,
    ) -> AuthzResult<ScopedUpdate<'a>> {
        let predicate = self.predicate(collection, Operation::Update, bypass).await?;
        Ok(ScopedUpdate::new(collection, predicate))
    }

    /// `DELETE FROM collection WHERE <scope>`.
    pub async fn delete<'a>(
        &self,
        collection: &ScopedCollection,
        bypass: Option<Bypass>,
    ) -> AuthzResult<ScopedStatement<'a>> {
        let predicate = self.predicate(collection, Operation::Delete, bypass).await?;
        Ok(ScopedStatement::delete(collection, predicate))
    }

    async fn predicate(
        &self,
        collection: &ScopedCollection,
        operation: Operation,
        bypass: Option<Bypass>,
    ) -> AuthzResult<ScopePredicate> {
        let Some(bypass) = bypass else {
            let ctx = scope::require_current()?;
            return ScopePredicate::for_context(&ctx, collection);
        };

        // Background jobs may bypass outside any operation; the requester
        // is then recorded as absent.
        let ctx = scope::current();
        let requester = ctx.as_ref().and_then(|c| c.user_id());
        tracing::warn!(
            table = collection.table(),
            operation = operation.as_str(),
            requester = ?requester,
            reason = bypass.reason(),
            "Scope predicate bypassed"
        );

        let mut record = AuditRecord::new(ACTION_GATEWAY_BYPASS, "used")
            .actor(requester)
            .details(json!({
                "table": collection.table(),
                "operation": operation.as_str(),
                "reason": bypass.reason(),
            }));
        if let Some(ctx) = &ctx {
            record = record.scope(ctx.scope_type(), ctx.unit_id());
        }
        self.audit.record(record).await;

        Ok(ScopePredicate::Unrestricted)
    }
}
