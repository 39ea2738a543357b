//! Descriptors of scope-carrying collections.

/// A table whose rows belong to an organizational unit, a user, or both.
///
/// Built only through [`ScopedCollection::by_unit`] or
/// [`ScopedCollection::by_owner`], so every descriptor names at least one
/// scoping column. Names are static and quoted when rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopedCollection {
    table: &'static str,
    unit_column: Option<&'static str>,
    owner_column: Option<&'static str>,
}

impl ScopedCollection {
    /// Rows owned by a unit.
    #[must_use]
    pub const fn by_unit(table: &'static str, unit_column: &'static str) -> Self {
        Self {
            table,
            unit_column: Some(unit_column),
            owner_column: None,
        }
    }

    /// Rows owned by a user.
    #[must_use]
    pub const fn by_owner(table: &'static str, owner_column: &'static str) -> Self {
        Self {
            table,
            unit_column: None,
            owner_column: Some(owner_column),
        }
    }

    /// Also record the owning user column.
    #[must_use]
    pub const fn with_owner(mut self, owner_column: &'static str) -> Self {
        self.owner_column = Some(owner_column);
        self
    }

    /// Also record the owning unit column.
    #[must_use]
    pub const fn with_unit(mut self, unit_column: &'static str) -> Self {
        self.unit_column = Some(unit_column);
        self
    }

    #[must_use]
    pub const fn table(&self) -> &'static str {
        self.table
    }

    #[must_use]
    pub const fn unit_column(&self) -> Option<&'static str> {
        self.unit_column
    }

    #[must_use]
    pub const fn owner_column(&self) -> Option<&'static str> {
        self.owner_column
    }
}

/// Quote an SQL identifier.
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
