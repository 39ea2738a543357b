//! Scopegate Server
//!
//! Authorization core of a multi-tenant administrative system: resolves
//! whether a principal holds a permission, and confines every data access
//! of an operation to the principal's scope.

pub mod api;
pub mod audit;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod guard;
pub mod permissions;
pub mod scope;
