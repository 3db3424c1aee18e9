//! Cypher pattern compiler.
//!
//! Every value is bound as a parameter; labels, keys and relationship types
//! are backtick-quoted identifiers. Read queries return a single column
//! `elements` holding tagged vertex and edge maps.

use super::{DeleteTarget, NodeMatch, QueryCompiler};
use crate::error::GraphError;
use crate::graph::query::CompiledQuery;
use crate::models::PreparedNode;
use crate::naming;

/// Column every read query returns.
pub(crate) const ELEMENTS_COLUMN: &str = "elements";

const VERTEX_PROJECTION: &str =
    "{type: 'vertex', id: elementId(x), label: head(labels(x)), properties: properties(x)}";

const EDGE_PROJECTION: &str = "{type: 'edge', id: elementId(x), label: type(x), \
     outV: elementId(startNode(x)), inV: elementId(endNode(x))}";

/// Compiles graph operations into parameterized Cypher.
#[derive(Debug, Clone, Copy, Default)]
pub struct CypherCompiler;

impl CypherCompiler {
    pub fn new() -> Self {
        Self
    }
}

/// Quotes an identifier, doubling embedded backticks.
fn ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// `(var:`label` {`key`: $param})`
fn node_pattern(var: &str, target: &NodeMatch<'_>, param: &str) -> String {
    format!(
        "({}:{} {{{}: ${}}})",
        var,
        ident(target.label),
        ident(&target.field.key()),
        param
    )
}

impl QueryCompiler for CypherCompiler {
    fn upsert_node(&self, node: &PreparedNode) -> Result<CompiledQuery, GraphError> {
        let mut matches = Vec::with_capacity(node.index.len());
        let mut params = Vec::with_capacity(node.index.len());
        for (i, (key, value)) in node.index.iter().enumerate() {
            let param = format!("index_{}", i);
            matches.push(format!("{}: ${}", ident(key), param));
            params.push((param, value.clone()));
        }

        let mut text = format!(
            "MERGE (n:{} {{{}}}) ON CREATE SET n += $immutable",
            ident(&node.label),
            matches.join(", ")
        );
        if !node.mutable.is_empty() {
            text.push_str(" SET n += $mutable");
        }

        let mut query = CompiledQuery::new(text).param("immutable", node.immutable.clone());
        if !node.mutable.is_empty() {
            query = query.param("mutable", node.mutable.clone());
        }
        for (name, value) in params {
            query = query.param(&name, value);
        }
        Ok(query)
    }

    fn upsert_relationship(
        &self,
        relationship_type: &str,
        from: &NodeMatch<'_>,
        to: &NodeMatch<'_>,
    ) -> Result<CompiledQuery, GraphError> {
        Ok(CompiledQuery::new(format!(
            "MATCH {} MATCH {} MERGE (a)-[:{}]->(b)",
            node_pattern("a", from, "from"),
            node_pattern("b", to, "to"),
            ident(&naming::edge_label_for(relationship_type))
        ))
        .param("from", from.field.value.clone())
        .param("to", to.field.value.clone()))
    }

    fn circular_dependencies(
        &self,
        relationship_type: &str,
        start: &NodeMatch<'_>,
    ) -> Result<CompiledQuery, GraphError> {
        // nodes(p) starts and ends with the start vertex; the interior must
        // be distinct and must not revisit the start.
        Ok(CompiledQuery::new(format!(
            "MATCH p = {}-[:{}*]->(n) \
             WITH p, [x IN nodes(p) | elementId(x)] AS ids \
             WHERE all(i IN range(1, size(ids) - 2) WHERE ids[i] <> ids[0] AND NOT ids[i] IN ids[i + 1..]) \
             WITH ids, head(collect(p)) AS p \
             RETURN [x IN nodes(p) | {}] + [x IN relationships(p) | {}] AS {}",
            node_pattern("n", start, "value"),
            ident(&naming::edge_label_for(relationship_type)),
            VERTEX_PROJECTION,
            EDGE_PROJECTION,
            ELEMENTS_COLUMN
        ))
        .param("value", start.field.value.clone()))
    }

    fn all_entities(
        &self,
        start: &NodeMatch<'_>,
        relationship_types: &[&str],
    ) -> Result<CompiledQuery, GraphError> {
        let root = format!("MATCH {}", node_pattern("n", start, "value"));
        let text = if relationship_types.is_empty() {
            format!(
                "{} RETURN [x IN [n] | {}] AS {}",
                root, VERTEX_PROJECTION, ELEMENTS_COLUMN
            )
        } else {
            let types = relationship_types
                .iter()
                .map(|t| ident(&naming::edge_label_for(t)))
                .collect::<Vec<_>>()
                .join("|");
            format!(
                "{} OPTIONAL MATCH (n)-[r:{}]-(m) \
                 RETURN [x IN [n, m] WHERE x IS NOT NULL | {}] + [x IN [r] WHERE x IS NOT NULL | {}] AS {}",
                root, types, VERTEX_PROJECTION, EDGE_PROJECTION, ELEMENTS_COLUMN
            )
        };
        Ok(CompiledQuery::new(text).param("value", start.field.value.clone()))
    }

    fn delete(&self, target: &DeleteTarget<'_>) -> Result<CompiledQuery, GraphError> {
        let query = match target {
            DeleteTarget::Node(node) => CompiledQuery::new(format!(
                "MATCH {} DETACH DELETE n",
                node_pattern("n", node, "value")
            ))
            .param("value", node.field.value.clone()),
            DeleteTarget::NodeAndDescendants(node) => CompiledQuery::new(format!(
                "MATCH {}-[*0..]->(c) WITH DISTINCT c DETACH DELETE c",
                node_pattern("n", node, "value")
            ))
            .param("value", node.field.value.clone()),
            DeleteTarget::Relationship {
                relationship_type,
                from,
                to,
            } => CompiledQuery::new(format!(
                "MATCH {}-[r:{}]->{} DELETE r",
                node_pattern("a", from, "from"),
                ident(&naming::edge_label_for(relationship_type)),
                node_pattern("b", to, "to")
            ))
            .param("from", from.field.value.clone())
            .param("to", to.field.value.clone()),
        };
        Ok(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Field, PropertyBag};
    use serde_json::{json, Value as JsonValue};

    fn bag(value: JsonValue) -> PropertyBag {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_ident_escapes_backticks() {
        assert_eq!(ident("model"), "`model`");
        assert_eq!(ident("we`ird"), "`we``ird`");
    }

    #[test]
    fn test_upsert_node() {
        let node = PreparedNode {
            label: "model".into(),
            index: bag(json!({"id": "P1"})),
            immutable: bag(json!({"id": "P1", "partitionkey": "default"})),
            mutable: bag(json!({"name": "Acme"})),
        };

        let query = CypherCompiler.upsert_node(&node).unwrap();
        assert_eq!(
            query.text(),
            "MERGE (n:`model` {`id`: $index_0}) ON CREATE SET n += $immutable SET n += $mutable"
        );
        assert_eq!(query.params().get("index_0"), Some(&json!("P1")));
        assert_eq!(
            query.params().get("immutable"),
            Some(&json!({"id": "P1", "partitionkey": "default"}))
        );
        assert_eq!(query.params().get("mutable"), Some(&json!({"name": "Acme"})));
    }

    #[test]
    fn test_upsert_node_multiple_indices_without_mutable() {
        let node = PreparedNode {
            label: "model".into(),
            index: bag(json!({"code": "C1", "id": "P1"})),
            immutable: bag(json!({"code": "C1", "id": "P1", "partitionkey": "default"})),
            mutable: PropertyBag::new(),
        };

        let query = CypherCompiler.upsert_node(&node).unwrap();
        assert_eq!(
            query.text(),
            "MERGE (n:`model` {`code`: $index_0, `id`: $index_1}) ON CREATE SET n += $immutable"
        );
        assert!(query.params().get("mutable").is_none());
        assert_eq!(query.params().get("index_1"), Some(&json!("P1")));
    }

    #[test]
    fn test_upsert_relationship_is_directed_merge() {
        let a = Field::new("Id", "P1");
        let b = Field::new("Id", "P2");
        let query = CypherCompiler
            .upsert_relationship(
                "dependsOn",
                &NodeMatch::new("calculation", &a),
                &NodeMatch::new("calculation", &b),
            )
            .unwrap();

        assert_eq!(
            query.text(),
            "MATCH (a:`calculation` {`id`: $from}) MATCH (b:`calculation` {`id`: $to}) \
             MERGE (a)-[:`dependson`]->(b)"
        );
        assert_eq!(query.params().get("from"), Some(&json!("P1")));
        assert_eq!(query.params().get("to"), Some(&json!("P2")));
    }

    #[test]
    fn test_circular_dependencies() {
        let field = Field::new("Id", "A");
        let query = CypherCompiler
            .circular_dependencies("dependsOn", &NodeMatch::new("calculation", &field))
            .unwrap();

        assert!(query
            .text()
            .starts_with("MATCH p = (n:`calculation` {`id`: $value})-[:`dependson`*]->(n) "));
        assert!(query.text().contains("WITH ids, head(collect(p)) AS p"));
        assert!(query.text().ends_with(" AS elements"));
        assert_eq!(query.params().get("value"), Some(&json!("A")));
    }

    #[test]
    fn test_all_entities_without_relationships() {
        let field = Field::new("Id", "P1");
        let query = CypherCompiler
            .all_entities(&NodeMatch::new("model", &field), &[])
            .unwrap();

        assert_eq!(
            query.text(),
            format!(
                "MATCH (n:`model` {{`id`: $value}}) RETURN [x IN [n] | {}] AS elements",
                VERTEX_PROJECTION
            )
        );
    }

    #[test]
    fn test_all_entities_with_relationships() {
        let field = Field::new("Id", "P1");
        let query = CypherCompiler
            .all_entities(&NodeMatch::new("model", &field), &["Contains", "dependsOn"])
            .unwrap();

        assert!(query
            .text()
            .contains("OPTIONAL MATCH (n)-[r:`contains`|`dependson`]-(m)"));
        assert!(query.text().contains("[x IN [r] WHERE x IS NOT NULL |"));
    }

    #[test]
    fn test_delete_variants() {
        let a = Field::new("Id", "P1");
        let b = Field::new("Id", "P2");
        let node = NodeMatch::new("model", &a);

        assert_eq!(
            CypherCompiler.delete(&DeleteTarget::Node(node)).unwrap().text(),
            "MATCH (n:`model` {`id`: $value}) DETACH DELETE n"
        );
        assert_eq!(
            CypherCompiler
                .delete(&DeleteTarget::NodeAndDescendants(node))
                .unwrap()
                .text(),
            "MATCH (n:`model` {`id`: $value})-[*0..]->(c) WITH DISTINCT c DETACH DELETE c"
        );

        let query = CypherCompiler
            .delete(&DeleteTarget::Relationship {
                relationship_type: "dependsOn",
                from: node,
                to: NodeMatch::new("model", &b),
            })
            .unwrap();
        assert_eq!(
            query.text(),
            "MATCH (a:`model` {`id`: $from})-[r:`dependson`]->(b:`model` {`id`: $to}) DELETE r"
        );
        assert_eq!(query.params().len(), 2);
    }
}
