//! Gremlin traversal compiler.
//!
//! Values are inlined as Groovy literals rather than bound, so every value
//! must be a scalar that can be escaped safely. Labels and keys are rendered
//! as escaped string literals too.

use serde_json::Value as JsonValue;

use super::{DeleteTarget, NodeMatch, QueryCompiler};
use crate::error::GraphError;
use crate::graph::query::CompiledQuery;
use crate::models::PreparedNode;
use crate::naming;

/// Compiles graph operations into Gremlin traversal text.
#[derive(Debug, Clone, Copy, Default)]
pub struct GremlinCompiler;

impl GremlinCompiler {
    pub fn new() -> Self {
        Self
    }
}

/// Renders a string as a single-quoted Groovy literal.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Renders a JSON scalar as a Groovy literal.
fn literal(property: &str, value: &JsonValue) -> Result<String, GraphError> {
    let unsupported = |reason: &str| GraphError::UnsupportedLiteral {
        property: property.to_string(),
        reason: reason.to_string(),
    };

    match value {
        JsonValue::String(s) => Ok(quote(s)),
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::Bool(b) => Ok(b.to_string()),
        JsonValue::Null => Err(unsupported("null cannot be matched or written")),
        JsonValue::Array(_) | JsonValue::Object(_) => {
            Err(unsupported("only scalar values can be inlined"))
        }
    }
}

/// `g.V().hasLabel('label').has('key', value)`
fn find_vertex(target: &NodeMatch<'_>) -> Result<String, GraphError> {
    Ok(format!("g.V(){}", vertex_filter(target)?))
}

/// `.hasLabel('label').has('key', value)` without the traversal source.
fn vertex_filter(target: &NodeMatch<'_>) -> Result<String, GraphError> {
    let key = target.field.key();
    Ok(format!(
        ".hasLabel({}).has({}, {})",
        quote(target.label),
        quote(&key),
        literal(&key, &target.field.value)?
    ))
}

impl QueryCompiler for GremlinCompiler {
    fn upsert_node(&self, node: &PreparedNode) -> Result<CompiledQuery, GraphError> {
        let mut text = format!("g.V().hasLabel({})", quote(&node.label));
        for (key, value) in &node.index {
            text.push_str(&format!(".has({}, {})", quote(key), literal(key, value)?));
        }

        text.push_str(&format!(".fold().coalesce(unfold(), addV({})", quote(&node.label)));
        for (key, value) in &node.immutable {
            text.push_str(&format!(".property({}, {})", quote(key), literal(key, value)?));
        }
        text.push(')');

        for (key, value) in &node.mutable {
            if value.is_null() {
                text.push_str(&format!(".sideEffect(properties({}).drop())", quote(key)));
            } else {
                text.push_str(&format!(
                    ".property(single, {}, {})",
                    quote(key),
                    literal(key, value)?
                ));
            }
        }

        Ok(CompiledQuery::new(text))
    }

    fn upsert_relationship(
        &self,
        relationship_type: &str,
        from: &NodeMatch<'_>,
        to: &NodeMatch<'_>,
    ) -> Result<CompiledQuery, GraphError> {
        let edge = quote(&naming::edge_label_for(relationship_type));
        Ok(CompiledQuery::new(format!(
            "{}.as('a').V(){}.coalesce(__.inE({}).where(outV().as('a')), addE({}).from('a'))",
            find_vertex(from)?,
            vertex_filter(to)?,
            edge,
            edge
        )))
    }

    fn circular_dependencies(
        &self,
        relationship_type: &str,
        start: &NodeMatch<'_>,
    ) -> Result<CompiledQuery, GraphError> {
        let edge = quote(&naming::edge_label_for(relationship_type));
        Ok(CompiledQuery::new(format!(
            "{}.as('start').emit().repeat(outE({}).inV().simplePath())\
             .outE({}).inV().where(eq('start')).path().dedup().by(unfold().id().fold())",
            find_vertex(start)?,
            edge,
            edge
        )))
    }

    fn all_entities(
        &self,
        start: &NodeMatch<'_>,
        relationship_types: &[&str],
    ) -> Result<CompiledQuery, GraphError> {
        let root = find_vertex(start)?;
        if relationship_types.is_empty() {
            return Ok(CompiledQuery::new(format!("{}.path()", root)));
        }

        let edges = relationship_types
            .iter()
            .map(|t| quote(&naming::edge_label_for(t)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(CompiledQuery::new(format!(
            "{}.union(identity(), bothE({}).otherV()).path()",
            root, edges
        )))
    }

    fn delete(&self, target: &DeleteTarget<'_>) -> Result<CompiledQuery, GraphError> {
        let text = match target {
            DeleteTarget::Node(node) => format!("{}.drop()", find_vertex(node)?),
            DeleteTarget::NodeAndDescendants(node) => format!(
                "{}.emit().repeat(out().simplePath()).dedup().drop()",
                find_vertex(node)?
            ),
            DeleteTarget::Relationship {
                relationship_type,
                from,
                to,
            } => format!(
                "{}.outE({}).where(inV(){}).drop()",
                find_vertex(from)?,
                quote(&naming::edge_label_for(relationship_type)),
                vertex_filter(to)?
            ),
        };
        Ok(CompiledQuery::new(text))
    }
}
