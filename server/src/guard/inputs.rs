//! Inputs a scope id expression can read.

use std::collections::HashMap;

use serde_json::Value as JsonValue;

/// Path parameters, query parameters, JSON body and loaded record of one
/// operation.
#[derive(Debug, Clone, Default)]
pub struct OperationInputs {
    path: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Option<JsonValue>,
    record: Option<JsonValue>,
}

impl OperationInputs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_path<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.path
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn with_query<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_record(mut self, record: JsonValue) -> Self {
        self.record = Some(record);
        self
    }

    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    #[must_use]
    pub const fn body(&self) -> Option<&JsonValue> {
        self.body.as_ref()
    }

    #[must_use]
    pub const fn record(&self) -> Option<&JsonValue> {
        self.record.as_ref()
    }
}
