//! Scope-enforcing data gateway.
//!
//! Reads and writes on collections that carry an owning unit or user are built
//! here and always include the predicate implied by the operation's scope.
//! Skipping it takes an explicit [`Bypass`], which is audited.

mod bypass;
mod collection;
mod data;
mod predicate;
mod query;

pub use bypass::Bypass;
pub use collection::ScopedCollection;
pub use data::DataGateway;
pub use predicate::ScopePredicate;
pub use query::{Operation, ScopedInsert, ScopedQuery, ScopedStatement, ScopedUpdate};
