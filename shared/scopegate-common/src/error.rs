//! Common error types.

use thiserror::Error;

/// Errors raised while decoding shared wire types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Scope tag is not one of GLOBAL, UNIT or SELF.
    #[error("Unsupported scope type: {0}")]
    InvalidScopeType(String),
}

/// Result alias for common operations.
pub type Result<T> = std::result::Result<T, Error>;
