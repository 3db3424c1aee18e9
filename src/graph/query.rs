//! Compiled query text plus bound parameters.

use serde_json::Value as JsonValue;

use crate::graph::row::Params;

/// Backend query text ready to send, with its bound parameters.
///
/// Produced by a [`QueryCompiler`](crate::graph::QueryCompiler) and consumed
/// by a [`QueryExecutor`](crate::graph::QueryExecutor). The text is opaque
/// to everything in between.
///
/// # Example
///
/// ```
/// use fundgraph::graph::CompiledQuery;
///
/// let query = CompiledQuery::new("MATCH (n:`model` {`id`: $value}) DETACH DELETE n")
///     .param("value", "P1");
/// assert_eq!(query.params().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    text: String,
    params: Params,
}

impl CompiledQuery {
    /// Creates a query without parameters.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Params::new(),
        }
    }

    /// Binds a parameter, referenced in the text as `$name`.
    pub fn param(mut self, name: &str, value: impl Into<JsonValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Consumes the query and returns text and parameters.
    pub fn into_parts(self) -> (String, Params) {
        (self.text, self.params)
    }
}

impl std::fmt::Display for CompiledQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
