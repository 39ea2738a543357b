//! Declarative access requirements.

use std::fmt;
use std::str::FromStr;

use scopegate_common::ScopeType;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::inputs::OperationInputs;

/// Where a scope id expression reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    /// Matched route parameter.
    Path,
    /// Query string parameter.
    Query,
    /// JSON request body.
    Body,
    /// Record loaded by the handler before the check.
    Record,
}

impl InputSource {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Body => "body",
            Self::Record => "record",
        }
    }
}

/// Invalid scope id expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeIdExprError {
    #[error("scope id expression is empty")]
    Empty,
    #[error("unknown input source `{0}`, expected path, query, body or record")]
    UnknownSource(String),
    #[error("scope id expression `{0}` names no field")]
    MissingField(String),
    #[error("path and query expressions take a single field name: `{0}`")]
    NestedFlatField(String),
}

/// Expression locating a scope id in an operation's inputs.
///
/// Written as `<source>.<field>`, e.g. `path.unit_id` or `body.owner.id`.
/// Body and record expressions may walk nested objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeIdExpr {
    source: InputSource,
    field: Vec<String>,
}

impl ScopeIdExpr {
    #[must_use]
    pub fn path(name: &str) -> Self {
        Self {
            source: InputSource::Path,
            field: vec![name.to_string()],
        }
    }

    #[must_use]
    pub fn query(name: &str) -> Self {
        Self {
            source: InputSource::Query,
            field: vec![name.to_string()],
        }
    }

    /// Dotted field path into the JSON body.
    #[must_use]
    pub fn body(field: &str) -> Self {
        Self {
            source: InputSource::Body,
            field: field.split('.').map(str::to_string).collect(),
        }
    }

    /// Dotted field path into the loaded record.
    #[must_use]
    pub fn record(field: &str) -> Self {
        Self {
            source: InputSource::Record,
            field: field.split('.').map(str::to_string).collect(),
        }
    }

    #[must_use]
    pub const fn source(&self) -> InputSource {
        self.source
    }

    /// Evaluate against `inputs`. Missing or non-scalar values give `None`.
    #[must_use]
    pub fn evaluate(&self, inputs: &OperationInputs) -> Option<String> {
        match self.source {
            InputSource::Path => inputs.path_param(&self.field[0]).map(str::to_string),
            InputSource::Query => inputs.query_param(&self.field[0]).map(str::to_string),
            InputSource::Body => inputs.body().and_then(|v| lookup(v, &self.field)),
            InputSource::Record => inputs.record().and_then(|v| lookup(v, &self.field)),
        }
    }
}

fn lookup(value: &JsonValue, field: &[String]) -> Option<String> {
    let found = field
        .iter()
        .try_fold(value, |current, key| current.as_object()?.get(key))?;
    match found {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl FromStr for ScopeIdExpr {
    type Err = ScopeIdExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ScopeIdExprError::Empty);
        }
        let (source, field) = s
            .split_once('.')
            .ok_or_else(|| ScopeIdExprError::MissingField(s.to_string()))?;
        if field.is_empty() || field.split('.').any(str::is_empty) {
            return Err(ScopeIdExprError::MissingField(s.to_string()));
        }

        match source {
            "path" | "query" if field.contains('.') => {
                Err(ScopeIdExprError::NestedFlatField(s.to_string()))
            }
            "path" => Ok(Self::path(field)),
            "query" => Ok(Self::query(field)),
            "body" => Ok(Self::body(field)),
            "record" => Ok(Self::record(field)),
            other => Err(ScopeIdExprError::UnknownSource(other.to_string())),
        }
    }
}

impl fmt::Display for ScopeIdExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.source.as_str(), self.field.join("."))
    }
}

/// One access requirement of a protected operation.
///
/// Several may be attached to one operation; all must pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub permission: String,
    pub scope_type: Option<ScopeType>,
    pub scope_id: Option<ScopeIdExpr>,
}

impl Requirement {
    /// Require `permission` at the operation's own scope.
    #[must_use]
    pub fn new(permission: &str) -> Self {
        Self {
            permission: permission.to_string(),
            scope_type: None,
            scope_id: None,
        }
    }

    /// Require the permission at `scope_type`, with the id taken from the context.
    ///
    /// The operation's context must reach that scope:
    ///
    /// - `Global` passes only for a GLOBAL context. A caller confined to a
    ///   unit or to their own records is denied even when a role grants the
    ///   permission.
    /// - `Unit` targets the context's unit; a context without one is denied.
    /// - `SelfOnly` targets the acting principal.
    #[must_use]
    pub const fn scoped(mut self, scope_type: ScopeType) -> Self {
        self.scope_type = Some(scope_type);
        self
    }

    /// Require the permission at `scope_type` for the id located by `expr`.
    #[must_use]
    pub fn at(mut self, scope_type: ScopeType, expr: ScopeIdExpr) -> Self {
        self.scope_type = Some(scope_type);
        self.scope_id = Some(expr);
        self
    }

    /// Whether evaluating this requirement needs the request body.
    #[must_use]
    pub fn reads_body(&self) -> bool {
        self.scope_id
            .as_ref()
            .is_some_and(|e| e.source() == InputSource::Body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_expressions() {
        assert_eq!("path.unit_id".parse::<ScopeIdExpr>().unwrap(), ScopeIdExpr::path("unit_id"));
        assert_eq!("query.unit".parse::<ScopeIdExpr>().unwrap(), ScopeIdExpr::query("unit"));
        assert_eq!(
            "body.owner.id".parse::<ScopeIdExpr>().unwrap(),
            ScopeIdExpr::body("owner.id")
        );
        assert_eq!(
            "record.unit_id".parse::<ScopeIdExpr>().unwrap().to_string(),
            "record.unit_id"
        );
    }

    #[test]
    fn test_parse_rejects_bad_expressions() {
        assert_eq!("".parse::<ScopeIdExpr>(), Err(ScopeIdExprError::Empty));
        assert!(matches!("path".parse::<ScopeIdExpr>(), Err(ScopeIdExprError::MissingField(_))));
        assert!(matches!("body.a..b".parse::<ScopeIdExpr>(), Err(ScopeIdExprError::MissingField(_))));
        assert!(matches!(
            "header.x".parse::<ScopeIdExpr>(),
            Err(ScopeIdExprError::UnknownSource(_))
        ));
        assert!(matches!(
            "path.a.b".parse::<ScopeIdExpr>(),
            Err(ScopeIdExprError::NestedFlatField(_))
        ));
    }

    #[test]
    fn test_evaluate_sources() {
        let inputs = OperationInputs::new()
            .with_path([("unit_id", "unitA")])
            .with_query([("owner", "u1")])
            .with_body(json!({"owner": {"id": 42}, "flag": true}))
            .with_record(json!({"unit_id": "unitB"}));

        assert_eq!(ScopeIdExpr::path("unit_id").evaluate(&inputs).as_deref(), Some("unitA"));
        assert_eq!(ScopeIdExpr::query("owner").evaluate(&inputs).as_deref(), Some("u1"));
        assert_eq!(ScopeIdExpr::body("owner.id").evaluate(&inputs).as_deref(), Some("42"));
        assert_eq!(ScopeIdExpr::record("unit_id").evaluate(&inputs).as_deref(), Some("unitB"));

        assert_eq!(ScopeIdExpr::body("flag").evaluate(&inputs), None);
        assert_eq!(ScopeIdExpr::body("owner").evaluate(&inputs), None);
        assert_eq!(ScopeIdExpr::path("missing").evaluate(&inputs), None);
        assert_eq!(ScopeIdExpr::record("unit_id").evaluate(&OperationInputs::new()), None);
    }

    #[test]
    fn test_requirement_builders() {
        let req = Requirement::new("benefits.request.approve").at(ScopeType::Unit, ScopeIdExpr::body("unit_id"));
        assert_eq!(req.scope_type, Some(ScopeType::Unit));
        assert!(req.reads_body());

        let req = Requirement::new("audit.log.read").scoped(ScopeType::Global);
        assert_eq!(req.scope_id, None);
        assert!(!req.reads_body());
    }
}
