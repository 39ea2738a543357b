//! Query builders that always carry the scope predicate.
//!
//! Builders can only be obtained from the gateway, which pushes the
//! predicate as the first condition of the `WHERE` clause, or as the scope
//! column value of an `INSERT`. Callers may add further conditions but
//! cannot remove it.

use sqlx::postgres::PgRow;
use sqlx::{Encode, FromRow, PgPool, Postgres, QueryBuilder, Type};

use super::collection::{quote_ident, ScopedCollection};
use super::predicate::ScopePredicate;
use crate::error::{AuthzError, AuthzResult};

/// Statement kind, kept for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Push ` AND "column" = $n`.
fn push_eq<'a, T>(builder: &mut QueryBuilder<'a, Postgres>, column: &str, value: T)
where
    T: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
{
    builder
        .push(" AND ")
        .push(quote_ident(column))
        .push(" = ")
        .push_bind(value);
}

/// Start a `WHERE` clause with the scope predicate.
fn push_where(builder: &mut QueryBuilder<'_, Postgres>, predicate: &ScopePredicate) {
    builder.push(" WHERE ");
    predicate.push_onto(builder);
}

/// A filtered `SELECT`.
///
/// Conditions, ordering and limit may be added in any order; they render
/// as `WHERE .. ORDER BY .. LIMIT ..`.
pub struct ScopedQuery<'a> {
    builder: QueryBuilder<'a, Postgres>,
    predicate: ScopePredicate,
    binds: usize,
    ordering: Vec<(String, bool)>,
    limit: Option<i64>,
}

impl<'a> ScopedQuery<'a> {
    pub(crate) fn select(
        collection: &ScopedCollection,
        columns: &[&str],
        predicate: ScopePredicate,
    ) -> Self {
        let mut builder = QueryBuilder::new("SELECT ");
        if columns.is_empty() {
            builder.push("*");
        } else {
            let mut separated = builder.separated(", ");
            for column in columns {
                separated.push(quote_ident(column));
            }
        }
        builder.push(" FROM ").push(quote_ident(collection.table()));
        push_where(&mut builder, &predicate);
        Self {
            builder,
            binds: predicate.binds(),
            predicate,
            ordering: Vec::new(),
            limit: None,
        }
    }

    /// Add `AND column = value`.
    #[must_use]
    pub fn and_eq<T>(mut self, column: &str, value: T) -> Self
    where
        T: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
    {
        push_eq(&mut self.builder, column, value);
        self.binds += 1;
        self
    }

    /// Order by `column`; later calls add tie-breakers.
    #[must_use]
    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.ordering.push((column.to_string(), descending));
        self
    }

    /// Return at most `limit` rows; the last call wins.
    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The predicate this statement carries.
    #[must_use]
    pub const fn predicate(&self) -> &ScopePredicate {
        &self.predicate
    }

    #[must_use]
    pub const fn operation(&self) -> Operation {
        Operation::Select
    }

    fn ordering_clause(&self) -> String {
        let mut clause = String::new();
        for (i, (column, descending)) in self.ordering.iter().enumerate() {
            clause.push_str(if i == 0 { " ORDER BY " } else { ", " });
            clause.push_str(&quote_ident(column));
            clause.push_str(if *descending { " DESC" } else { " ASC" });
        }
        clause
    }

    /// SQL text with bind placeholders.
    #[must_use]
    pub fn sql(&self) -> String {
        let mut sql = format!("{}{}", self.builder.sql(), self.ordering_clause());
        if self.limit.is_some() {
            sql.push_str(&format!(" LIMIT ${}", self.binds + 1));
        }
        sql
    }

    /// Run the select and map rows.
    pub async fn fetch_all<T>(mut self, pool: &PgPool) -> sqlx::Result<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let ordering = self.ordering_clause();
        self.builder.push(ordering);
        if let Some(limit) = self.limit {
            self.builder.push(" LIMIT ").push_bind(limit);
        }
        tracing::debug!(operation = "select", sql = self.builder.sql(), "Scoped query");
        self.builder.build_query_as::<T>().fetch_all(pool).await
    }
}

impl std::fmt::Debug for ScopedQuery<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedQuery")
            .field("sql", &self.sql())
            .field("predicate", &self.predicate)
            .finish()
    }
}

/// A filtered `UPDATE` or `DELETE` ready to run.
pub struct ScopedStatement<'a> {
    builder: QueryBuilder<'a, Postgres>,
    predicate: ScopePredicate,
    operation: Operation,
}

impl<'a> ScopedStatement<'a> {
    pub(crate) fn delete(collection: &ScopedCollection, predicate: ScopePredicate) -> Self {
        let mut builder = QueryBuilder::new("DELETE FROM ");
        builder.push(quote_ident(collection.table()));
        Self::filtered(builder, predicate, Operation::Delete)
    }

    fn filtered(mut builder: QueryBuilder<'a, Postgres>, predicate: ScopePredicate, operation: Operation) -> Self {
        push_where(&mut builder, &predicate);
        Self {
            builder,
            predicate,
            operation,
        }
    }

    /// Add `AND column = value`.
    #[must_use]
    pub fn and_eq<T>(mut self, column: &str, value: T) -> Self
    where
        T: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
    {
        push_eq(&mut self.builder, column, value);
        self
    }

    /// The predicate this statement carries.
    #[must_use]
    pub const fn predicate(&self) -> &ScopePredicate {
        &self.predicate
    }

    #[must_use]
    pub const fn operation(&self) -> Operation {
        self.operation
    }

    /// SQL text with bind placeholders.
    #[must_use]
    pub fn sql(&self) -> &str {
        self.builder.sql()
    }

    /// Run the statement; returns affected rows.
    pub async fn execute(mut self, pool: &PgPool) -> sqlx::Result<u64> {
        tracing::debug!(operation = self.operation.as_str(), sql = self.builder.sql(), "Scoped statement");
        Ok(self.builder.build().execute(pool).await?.rows_affected())
    }
}

impl std::fmt::Debug for ScopedStatement<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedStatement")
            .field("sql", &self.builder.sql())
            .field("predicate", &self.predicate)
            .field("operation", &self.operation)
            .finish()
    }
}

/// An `UPDATE` still collecting assignments.
///
/// Becomes runnable only through [`ScopedUpdate::filtered`], which appends
/// the scope predicate.
pub struct ScopedUpdate<'a> {
    builder: QueryBuilder<'a, Postgres>,
    predicate: ScopePredicate,
    assignments: usize,
}

impl<'a> ScopedUpdate<'a> {
    pub(crate) fn new(collection: &ScopedCollection, predicate: ScopePredicate) -> Self {
        let mut builder = QueryBuilder::new("UPDATE ");
        builder.push(quote_ident(collection.table())).push(" SET ");
        Self {
            builder,
            predicate,
            assignments: 0,
        }
    }

    /// Assign `column = value`.
    ///
    /// The column the predicate filters on cannot be reassigned: a row
    /// cannot be moved out of the caller's scope.
    pub fn set<T>(mut self, column: &str, value: T) -> AuthzResult<Self>
    where
        T: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
    {
        if self.predicate.column() == Some(column) {
            return Err(AuthzError::ScopeViolation(format!(
                "cannot reassign scope column {column}"
            )));
        }
        if self.assignments > 0 {
            self.builder.push(", ");
        }
        self.builder
            .push(quote_ident(column))
            .push(" = ")
            .push_bind(value);
        self.assignments += 1;
        Ok(self)
    }

    /// Finish the assignment list and append the scope predicate.
    pub fn filtered(self) -> AuthzResult<ScopedStatement<'a>> {
        if self.assignments == 0 {
            return Err(AuthzError::ScopeViolation("update without assignments".into()));
        }
        Ok(ScopedStatement::filtered(self.builder, self.predicate, Operation::Update))
    }
}

/// An `INSERT` of one row.
///
/// The scope column is appended by the gateway and bound to the context's
/// unit or user; callers list and bind only their own columns.
pub struct ScopedInsert<'a> {
    builder: QueryBuilder<'a, Postgres>,
    predicate: ScopePredicate,
    columns: usize,
    values: usize,
}

impl<'a> ScopedInsert<'a> {
    pub(crate) fn new(
        collection: &ScopedCollection,
        columns: &[&str],
        predicate: ScopePredicate,
    ) -> AuthzResult<Self> {
        if let Some(scoped) = predicate.column() {
            if columns.contains(&scoped) {
                return Err(AuthzError::ScopeViolation(format!(
                    "scope column {scoped} is set from the operation's scope"
                )));
            }
        }
        if columns.is_empty() && predicate.column().is_none() {
            return Err(AuthzError::ScopeViolation("insert without columns".into()));
        }

        let mut builder = QueryBuilder::new("INSERT INTO ");
        builder.push(quote_ident(collection.table())).push(" (");
        {
            let mut separated = builder.separated(", ");
            for column in columns.iter().copied().chain(predicate.column()) {
                separated.push(quote_ident(column));
            }
        }
        builder.push(") VALUES (");

        Ok(Self {
            builder,
            predicate,
            columns: columns.len(),
            values: 0,
        })
    }

    /// Bind the value of the next listed column.
    #[must_use]
    pub fn value<T>(mut self, value: T) -> Self
    where
        T: 'a + Encode<'a, Postgres> + Type<Postgres> + Send,
    {
        if self.values > 0 {
            self.builder.push(", ");
        }
        self.builder.push_bind(value);
        self.values += 1;
        self
    }

    /// The predicate whose column this insert fills.
    #[must_use]
    pub const fn predicate(&self) -> &ScopePredicate {
        &self.predicate
    }

    #[must_use]
    pub const fn operation(&self) -> Operation {
        Operation::Insert
    }

    /// SQL text with bind placeholders.
    #[must_use]
    pub fn sql(&self) -> String {
        let mut sql = self.builder.sql().to_string();
        if self.predicate.column().is_some() {
            if self.values > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&format!("${}", self.values + 1));
        }
        sql.push(')');
        sql
    }

    /// Run the insert; returns affected rows.
    pub async fn execute(mut self, pool: &PgPool) -> AuthzResult<u64> {
        if self.values != self.columns {
            return Err(AuthzError::ScopeViolation(format!(
                "insert lists {} columns but binds {} values",
                self.columns, self.values
            )));
        }
        if let Some(scoped) = self.predicate.value().map(str::to_string) {
            if self.values > 0 {
                self.builder.push(", ");
            }
            self.builder.push_bind(scoped);
        }
        self.builder.push(")");

        tracing::debug!(operation = "insert", sql = self.builder.sql(), "Scoped statement");
        Ok(self.builder.build().execute(pool).await?.rows_affected())
    }
}

impl std::fmt::Debug for ScopedInsert<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedInsert")
            .field("sql", &self.sql())
            .field("predicate", &self.predicate)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUESTS: ScopedCollection =
        ScopedCollection::by_unit("benefit_requests", "unit_id").with_owner("applicant_id");

    fn unit_predicate() -> ScopePredicate {
        ScopePredicate::UnitEquals {
            column: "unit_id",
            unit_id: "unitA".into(),
        }
    }

    #[test]
    fn test_clauses_render_in_order_regardless_of_call_order() {
        let query = ScopedQuery::select(&REQUESTS, &[], unit_predicate())
            .order_by("id", false)
            .limit(5)
            .and_eq("status", "open");
        assert_eq!(
            query.sql(),
            "SELECT * FROM \"benefit_requests\" WHERE (\"unit_id\" = $1) AND \"status\" = $2 ORDER BY \"id\" ASC LIMIT $3"
        );
    }

    #[test]
    fn test_ordering_accumulates_and_limit_replaces() {
        let query = ScopedQuery::select(&REQUESTS, &["id"], ScopePredicate::Unrestricted)
            .limit(10)
            .order_by("created_at", true)
            .order_by("id", false)
            .limit(3);
        assert_eq!(
            query.sql(),
            "SELECT \"id\" FROM \"benefit_requests\" WHERE (TRUE) ORDER BY \"created_at\" DESC, \"id\" ASC LIMIT $1"
        );
    }

    #[test]
    fn test_insert_appends_scope_column() {
        let insert = ScopedInsert::new(&REQUESTS, &["id", "status"], unit_predicate())
            .unwrap()
            .value(7_i64)
            .value("open");
        assert_eq!(
            insert.sql(),
            "INSERT INTO \"benefit_requests\" (\"id\", \"status\", \"unit_id\") VALUES ($1, $2, $3)"
        );
        assert_eq!(insert.operation(), Operation::Insert);
    }

    #[test]
    fn test_insert_refuses_scope_column() {
        let refused = ScopedInsert::new(&REQUESTS, &["id", "unit_id"], unit_predicate());
        assert!(matches!(refused, Err(AuthzError::ScopeViolation(_))));

        let empty = ScopedInsert::new(&REQUESTS, &[], ScopePredicate::Unrestricted);
        assert!(matches!(empty, Err(AuthzError::ScopeViolation(_))));
    }
}
