//! Scope predicates conjoined with every gateway query.

use sqlx::{Postgres, QueryBuilder};

use super::collection::{quote_ident, ScopedCollection};
use crate::error::{AuthzError, AuthzResult};
use crate::scope::ScopeContext;

/// Row filter implied by a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopePredicate {
    /// GLOBAL scope or an audited bypass: no filter.
    Unrestricted,
    /// UNIT scope: the unit column equals the context unit.
    UnitEquals { column: &'static str, unit_id: String },
    /// SELF scope: the owner column equals the acting user.
    OwnerEquals { column: &'static str, user_id: String },
}

impl ScopePredicate {
    /// Predicate for `collection` under `ctx`.
    ///
    /// Anonymous operations have no data scope and are refused. A UNIT
    /// context on a collection without a unit column narrows to its owner
    /// column; a SELF context needs an owner column.
    pub fn for_context(ctx: &ScopeContext, collection: &ScopedCollection) -> AuthzResult<Self> {
        match ctx {
            ScopeContext::Anonymous => Err(AuthzError::ScopeViolation(format!(
                "anonymous operation cannot access {}",
                collection.table()
            ))),
            ScopeContext::Global { .. } => Ok(Self::Unrestricted),
            ScopeContext::Unit { user_id, unit_id } => {
                match (collection.unit_column(), collection.owner_column()) {
                    (Some(column), _) => Ok(Self::UnitEquals {
                        column,
                        unit_id: unit_id.clone(),
                    }),
                    (None, Some(column)) => Ok(Self::OwnerEquals {
                        column,
                        user_id: user_id.clone(),
                    }),
                    (None, None) => Err(unscopable(collection)),
                }
            }
            ScopeContext::SelfOnly { user_id } => collection
                .owner_column()
                .map(|column| Self::OwnerEquals {
                    column,
                    user_id: user_id.clone(),
                })
                .ok_or_else(|| unscopable(collection)),
        }
    }

    /// Column the predicate constrains, if any.
    #[must_use]
    pub const fn column(&self) -> Option<&'static str> {
        match self {
            Self::Unrestricted => None,
            Self::UnitEquals { column, .. } | Self::OwnerEquals { column, .. } => Some(column),
        }
    }

    /// Value the constrained column must hold, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Unrestricted => None,
            Self::UnitEquals { unit_id: value, .. } | Self::OwnerEquals { user_id: value, .. } => {
                Some(value)
            }
        }
    }

    /// Number of bind parameters [`Self::push_onto`] adds.
    pub(crate) const fn binds(&self) -> usize {
        match self {
            Self::Unrestricted => 0,
            Self::UnitEquals { .. } | Self::OwnerEquals { .. } => 1,
        }
    }

    /// Render as a parenthesized condition with a bound value.
    pub(crate) fn push_onto(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        match self {
            Self::Unrestricted => {
                builder.push("(TRUE)");
            }
            Self::UnitEquals { column, unit_id: value } | Self::OwnerEquals { column, user_id: value } => {
                builder
                    .push("(")
                    .push(quote_ident(column))
                    .push(" = ")
                    .push_bind(value.clone())
                    .push(")");
            }
        }
    }
}

fn unscopable(collection: &ScopedCollection) -> AuthzError {
    AuthzError::ScopeViolation(format!(
        "{} has no column for the current scope",
        collection.table()
    ))
}
