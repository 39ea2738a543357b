//! Shared wire types.

pub mod denial;
pub mod principal;
pub mod scope;

pub use denial::{describe_requirement, DenialResponse, PERMISSION_DENIED};
pub use principal::PrincipalClaims;
pub use scope::ScopeType;
