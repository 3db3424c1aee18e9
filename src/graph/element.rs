//! Decoding of raw traversal output into graph elements.
//!
//! Both backends return untyped JSON in which vertices and edges are objects
//! tagged with `"type": "vertex"` or `"type": "edge"`. Gremlin wraps each
//! vertex property in a list of `{id, value}` objects; Cypher returns plain
//! values. Typed GraphSON (`{"@type", "@value"}`) is unwrapped first.

use serde_json::{Map, Value as JsonValue};

use crate::error::GraphError;
use crate::models::{PropertyBag, ID_PROPERTY};

/// A vertex or edge found anywhere in a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphElement {
    Vertex {
        id: String,
        label: String,
        properties: PropertyBag,
    },
    Edge {
        id: String,
        label: String,
        /// Id of the vertex the edge leaves (`outV`).
        source: String,
        /// Id of the vertex the edge enters (`inV`).
        target: String,
    },
}

impl GraphElement {
    pub fn id(&self) -> &str {
        match self {
            GraphElement::Vertex { id, .. } | GraphElement::Edge { id, .. } => id,
        }
    }

    /// Collects every tagged element reachable from `value`, in document
    /// order. Paths, lists and untagged maps are walked recursively.
    pub fn collect(value: &JsonValue, out: &mut Vec<GraphElement>) -> Result<(), GraphError> {
        match value {
            JsonValue::Object(map) if map.contains_key("@type") && map.contains_key("@value") => {
                Self::collect(&untype(value.clone()), out)
            }
            JsonValue::Object(map) => match map.get("type").and_then(JsonValue::as_str) {
                Some("vertex") => {
                    out.push(decode_vertex(map)?);
                    Ok(())
                }
                Some("edge") => {
                    out.push(decode_edge(map)?);
                    Ok(())
                }
                _ => map.values().try_for_each(|v| Self::collect(v, out)),
            },
            JsonValue::Array(items) => items.iter().try_for_each(|v| Self::collect(v, out)),
            _ => Ok(()),
        }
    }
}

fn decode_vertex(map: &Map<String, JsonValue>) -> Result<GraphElement, GraphError> {
    let mut properties: PropertyBag = match map.get("properties") {
        Some(JsonValue::Object(raw)) => raw
            .iter()
            .map(|(key, value)| (key.clone(), flatten_property(value)))
            .collect(),
        Some(JsonValue::Null) | None => PropertyBag::new(),
        Some(other) => {
            return Err(GraphError::MalformedElement(format!(
                "vertex properties must be a map, got {}",
                other
            )))
        }
    };

    let id = element_id(map, "id", "vertex")?;
    // Cosmos keeps the identifier only on the element itself.
    properties
        .entry(ID_PROPERTY)
        .or_insert_with(|| JsonValue::String(id.clone()));

    Ok(GraphElement::Vertex {
        id,
        label: label(map, "vertex")?,
        properties,
    })
}

fn decode_edge(map: &Map<String, JsonValue>) -> Result<GraphElement, GraphError> {
    Ok(GraphElement::Edge {
        id: element_id(map, "id", "edge")?,
        label: label(map, "edge")?,
        source: element_id(map, "outV", "edge")?,
        target: element_id(map, "inV", "edge")?,
    })
}

/// Reads an id-like field and normalises it to a string.
fn element_id(map: &Map<String, JsonValue>, key: &str, kind: &str) -> Result<String, GraphError> {
    match map.get(key) {
        Some(JsonValue::String(s)) => Ok(s.clone()),
        Some(JsonValue::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(GraphError::MalformedElement(format!(
            "{} '{}' is not a string or number: {}",
            kind, key, other
        ))),
        None => Err(GraphError::MalformedElement(format!(
            "{} without '{}'",
            kind, key
        ))),
    }
}

fn label(map: &Map<String, JsonValue>, kind: &str) -> Result<String, GraphError> {
    map.get("label")
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| GraphError::MalformedElement(format!("{} without a label", kind)))
}

/// `[{"id": .., "value": v}]` becomes `v`; several entries become a list of
/// values. Anything else is already plain.
fn flatten_property(value: &JsonValue) -> JsonValue {
    let JsonValue::Array(items) = value else {
        return value.clone();
    };
    let wrapped = !items.is_empty()
        && items
            .iter()
            .all(|item| item.as_object().is_some_and(|o| o.contains_key("value")));
    if !wrapped {
        return value.clone();
    }

    let mut values: Vec<JsonValue> = items
        .iter()
        .filter_map(|item| item.get("value").cloned())
        .collect();
    if values.len() == 1 {
        values.remove(0)
    } else {
        JsonValue::Array(values)
    }
}

/// Rewrites typed GraphSON (v2/v3) into the untyped shape.
fn untype(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(mut map) => {
            let tag = map.get("@type").and_then(JsonValue::as_str).map(str::to_string);
            match (tag, map.remove("@value")) {
                (Some(tag), Some(inner)) => untype_tagged(&tag, untype(inner)),
                (_, value) => {
                    if let Some(value) = value {
                        map.insert("@value".to_string(), value);
                    }
                    JsonValue::Object(map.into_iter().map(|(k, v)| (k, untype(v))).collect())
                }
            }
        }
        JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(untype).collect()),
        other => other,
    }
}

fn untype_tagged(tag: &str, inner: JsonValue) -> JsonValue {
    match tag {
        "g:Vertex" | "g:Edge" => {
            let mut map = match inner {
                JsonValue::Object(map) => map,
                other => return other,
            };
            let kind = if tag == "g:Vertex" { "vertex" } else { "edge" };
            map.insert("type".to_string(), JsonValue::from(kind));
            JsonValue::Object(map)
        }
        // g:Map is a flat [k1, v1, k2, v2, ...] list
        "g:Map" => match inner {
            JsonValue::Array(items) => {
                let mut map = Map::new();
                for pair in items.chunks(2) {
                    if let [key, value] = pair {
                        let key = match key {
                            JsonValue::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        map.insert(key, value.clone());
                    }
                }
                JsonValue::Object(map)
            }
            other => other,
        },
        _ => inner,
    }
}
