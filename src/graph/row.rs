//! Row and streaming types for raw query results.

use crate::error::GraphError;
use futures::Stream;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::pin::Pin;

/// Bound parameters for a compiled query.
///
/// A map of parameter names to JSON values. Backends that inline literals
/// leave it empty.
pub type Params = HashMap<String, JsonValue>;

/// A stream of rows from a query result.
///
/// The stream owns the connection it reads from; dropping it releases the
/// connection even if not every row was consumed.
pub type RowStream<'a> = Pin<Box<dyn Stream<Item = Result<Row, GraphError>> + Send + 'a>>;

/// A single raw row as it came off the wire.
///
/// Column values are untyped JSON; the result transformer is the only
/// consumer that interprets them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    data: HashMap<String, JsonValue>,
}

impl Row {
    /// Creates a row with a single column.
    pub fn single(column: &str, value: JsonValue) -> Self {
        let mut data = HashMap::with_capacity(1);
        data.insert(column.to_string(), value);
        Self { data }
    }

    /// Returns the raw JSON value for a column, if it exists.
    pub fn get_raw(&self, key: &str) -> Option<&JsonValue> {
        self.data.get(key)
    }

    /// Consumes the row and returns the underlying data map.
    pub fn into_inner(self) -> HashMap<String, JsonValue> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_column() {
        let row = Row::single("result", json!({"type": "vertex"}));
        assert_eq!(row.get_raw("result"), Some(&json!({"type": "vertex"})));
        assert!(row.get_raw("missing").is_none());
        assert_eq!(row.into_inner().len(), 1);
    }

    #[test]
    fn test_empty_row() {
        assert!(Row::default().into_inner().is_empty());
    }
}
