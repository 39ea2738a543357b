//! Principal Token Validation
//!
//! Tokens are issued by the authentication service and signed with EdDSA
//! (Ed25519). This side only holds the public key and verifies.

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use scopegate_common::PrincipalClaims;
use serde::{Deserialize, Serialize};

use crate::error::{AuthzError, AuthzResult};

/// Claims carried by a principal token.
#[derive(Debug, Serialize, Deserialize)]
pub struct PrincipalTokenClaims {
    /// Principal payload (`sub`/`id`, `roles`, `scope`, `unitId`).
    #[serde(flatten)]
    pub principal: PrincipalClaims,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// Build the decoding key once at startup.
///
/// A bad key is a configuration problem, not a client one.
pub fn decoding_key(public_key: &str) -> anyhow::Result<DecodingKey> {
    let key_bytes = STANDARD
        .decode(public_key)
        .context("JWT public key is not valid base64")?;
    DecodingKey::from_ed_pem(&key_bytes).context("JWT public key is not an Ed25519 PEM public key")
}

/// Validate a principal token and return its principal payload.
pub fn validate_principal_token(token: &str, key: &DecodingKey) -> AuthzResult<PrincipalClaims> {
    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.validate_exp = true;
    validation.leeway = 0;
    validation.required_spec_claims.clear();
    validation.required_spec_claims.insert("exp".to_string());

    let token_data = decode::<PrincipalTokenClaims>(token, key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "Rejected principal token");
        AuthzError::Unauthenticated
    })?;

    Ok(token_data.claims.principal)
}
