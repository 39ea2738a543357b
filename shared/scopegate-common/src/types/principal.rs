//! Principal Types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Principal payload as produced by the authentication collaborator.
///
/// Every field is optional on the wire. Identifiers may arrive as strings or
/// numbers; the server resolves this shape into a typed principal at the
/// boundary and never probes these fields downstream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrincipalClaims {
    /// Principal identifier (string or number).
    #[serde(default, alias = "sub")]
    pub id: Option<Value>,
    /// Role tags held by the principal.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Declared scope tag (GLOBAL, UNIT or SELF).
    #[serde(default)]
    pub scope: Option<String>,
    /// Owning organizational unit (string or number).
    #[serde(default, rename = "unitId", alias = "unit_id")]
    pub unit_id: Option<Value>,
}
