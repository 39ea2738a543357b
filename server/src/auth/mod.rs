//! Principal Authentication Adapter
//!
//! Verifies bearer tokens issued elsewhere and turns their payload into a
//! [`crate::scope::Principal`]. Issuing credentials is not done here.

pub mod jwt;
mod middleware;

pub use middleware::authenticate;
