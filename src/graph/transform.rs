//! Rebuilds typed entity graphs from raw traversal rows.

use std::collections::{HashMap, HashSet};

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::GraphError;
use crate::graph::element::GraphElement;
use crate::graph::row::Row;
use crate::models::{Entity, Field, PropertyBag, Relationship};

/// Which vertices of a result become entities.
#[derive(Debug, Clone, Copy)]
pub enum Selection<'a> {
    /// Only vertices with this label whose field matches.
    MatchesOnly { label: &'a str, field: &'a Field },
    /// Every vertex the traversal visited.
    AllVisited,
}

impl Selection<'_> {
    fn keeps(&self, label: &str, properties: &PropertyBag) -> bool {
        match self {
            Selection::MatchesOnly {
                label: wanted,
                field,
            } => *wanted == label && field.matches(properties),
            Selection::AllVisited => true,
        }
    }
}

struct SeenEdge {
    id: String,
    label: String,
    source: String,
    target: String,
}

/// Turns rows into one [`Entity`] per selected vertex, in first-seen order.
///
/// Every edge found is resolved against the vertices of the same result and
/// attached to each selected endpoint. An edge pointing at a vertex the
/// result never contained fails with [`GraphError::PartialResult`].
pub fn transform<T>(rows: Vec<Row>, selection: Selection<'_>) -> Result<Vec<Entity<T>>, GraphError>
where
    T: DeserializeOwned,
{
    let mut vertices: HashMap<String, PropertyBag> = HashMap::new();
    let mut kept: Vec<String> = Vec::new();
    let mut edges: Vec<SeenEdge> = Vec::new();
    let mut edge_ids: HashSet<String> = HashSet::new();

    let mut elements = Vec::new();
    for row in rows {
        let mut columns: Vec<(String, JsonValue)> = row.into_inner().into_iter().collect();
        columns.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, value) in &columns {
            GraphElement::collect(value, &mut elements)?;
        }
    }

    for element in elements {
        match element {
            GraphElement::Vertex {
                id,
                label,
                properties,
            } => {
                if vertices.contains_key(&id) {
                    continue;
                }
                if selection.keeps(&label, &properties) {
                    kept.push(id.clone());
                }
                vertices.insert(id, properties);
            }
            GraphElement::Edge {
                id,
                label,
                source,
                target,
            } => {
                if edge_ids.insert(id.clone()) {
                    edges.push(SeenEdge {
                        id,
                        label,
                        source,
                        target,
                    });
                }
            }
        }
    }

    let mut entities = Vec::with_capacity(kept.len());
    let mut position: HashMap<&str, usize> = HashMap::with_capacity(kept.len());
    for id in &kept {
        let node: T = serde_json::from_value(JsonValue::Object(vertices[id].clone()))?;
        position.insert(id.as_str(), entities.len());
        entities.push(Entity::new(node));
    }

    for edge in &edges {
        let one = endpoint(&vertices, edge, &edge.source)?;
        let two = endpoint(&vertices, edge, &edge.target)?;
        let relationship = Relationship {
            relationship_type: edge.label.clone(),
            one: one.clone(),
            two: two.clone(),
        };

        let source = position.get(edge.source.as_str()).copied();
        let target = position
            .get(edge.target.as_str())
            .copied()
            .filter(|_| edge.target != edge.source);
        match (source, target) {
            (Some(s), Some(t)) => {
                entities[s].relationships.push(relationship.clone());
                entities[t].relationships.push(relationship);
            }
            (Some(i), None) | (None, Some(i)) => entities[i].relationships.push(relationship),
            (None, None) => {}
        }
    }

    Ok(entities)
}

fn endpoint<'v>(
    vertices: &'v HashMap<String, PropertyBag>,
    edge: &SeenEdge,
    vertex_id: &str,
) -> Result<&'v PropertyBag, GraphError> {
    vertices
        .get(vertex_id)
        .ok_or_else(|| GraphError::PartialResult {
            edge_id: edge.id.clone(),
            vertex_id: vertex_id.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Calculation {
        id: String,
        name: Option<String>,
    }

    fn vertex(id: &str, name: &str) -> JsonValue {
        json!({
            "id": id,
            "label": "calculation",
            "type": "vertex",
            "properties": {
                "id": [{"id": format!("{}-id", id), "value": id}],
                "partitionkey": [{"id": format!("{}-pk", id), "value": "default"}],
                "name": [{"id": format!("{}-name", id), "value": name}]
            }
        })
    }

    fn edge(id: &str, from: &str, to: &str) -> JsonValue {
        json!({"id": id, "label": "dependson", "type": "edge", "outV": from, "inV": to})
    }

    fn path(objects: Vec<JsonValue>) -> Row {
        Row::single("result", json!({"labels": [], "objects": objects}))
    }

    #[test]
    fn test_cycle_attaches_both_edges_to_start() {
        let rows = vec![path(vec![
            vertex("A", "a"),
            edge("e1", "A", "B"),
            vertex("B", "b"),
            edge("e2", "B", "C"),
            vertex("C", "c"),
            edge("e3", "C", "A"),
            vertex("A", "a"),
        ])];

        let entities: Vec<Entity<Calculation>> = transform(rows, Selection::AllVisited).unwrap();

        let ids: Vec<_> = entities.iter().map(|e| e.node.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);

        let a = &entities[0];
        assert_eq!(a.relationships.len(), 2);
        assert_eq!(a.relationships[0].one.get("id"), Some(&json!("A")));
        assert_eq!(a.relationships[0].two.get("id"), Some(&json!("B")));
        assert_eq!(a.relationships[1].one.get("id"), Some(&json!("C")));
        assert_eq!(a.relationships[1].two.get("id"), Some(&json!("A")));
        assert_eq!(a.relationships[0].relationship_type, "dependson");
    }

    #[test]
    fn test_matches_only_keeps_start_vertex() {
        let field = Field::new("Id", "A");
        let rows = vec![
            path(vec![vertex("A", "a")]),
            path(vec![vertex("A", "a"), edge("e1", "A", "B"), vertex("B", "b")]),
        ];

        let entities: Vec<Entity<Calculation>> = transform(
            rows,
            Selection::MatchesOnly {
                label: "calculation",
                field: &field,
            },
        )
        .unwrap();

        assert_eq!(entities.len(), 1);
        assert_eq!(
            entities[0].node,
            Calculation {
                id: "A".into(),
                name: Some("a".into())
            }
        );
        assert_eq!(entities[0].relationships.len(), 1);
        assert_eq!(entities[0].relationships[0].two.get("name"), Some(&json!("b")));
    }

    #[test]
    fn test_self_loop_attached_once() {
        let rows = vec![path(vec![vertex("A", "a"), edge("e1", "A", "A"), vertex("A", "a")])];
        let entities: Vec<Entity<Calculation>> = transform(rows, Selection::AllVisited).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].relationships.len(), 1);
    }

    #[test]
    fn test_duplicate_edges_recorded_once() {
        let rows = vec![
            path(vec![vertex("A", "a"), edge("e1", "A", "B"), vertex("B", "b")]),
            path(vec![vertex("B", "b"), edge("e1", "A", "B"), vertex("A", "a")]),
        ];
        let entities: Vec<Entity<Calculation>> = transform(rows, Selection::AllVisited).unwrap();
        assert_eq!(entities[0].relationships.len(), 1);
        assert_eq!(entities[1].relationships.len(), 1);
    }

    #[test]
    fn test_dangling_edge_is_partial_result() {
        let rows = vec![path(vec![vertex("A", "a"), edge("e1", "A", "Z")])];
        let err = transform::<Calculation>(rows, Selection::AllVisited).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PartialResult);
        match err {
            GraphError::PartialResult { edge_id, vertex_id } => {
                assert_eq!(edge_id, "e1");
                assert_eq!(vertex_id, "Z");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_no_rows_is_empty() {
        let entities: Vec<Entity<Calculation>> =
            transform(Vec::new(), Selection::AllVisited).unwrap();
        assert!(entities.is_empty());
    }

    #[test]
    fn test_undecodable_node_is_serialization_error() {
        let rows = vec![Row::single(
            "result",
            json!({
                "id": "A",
                "label": "calculation",
                "type": "vertex",
                "properties": {"id": [{"id": "A-id", "value": 5}]}
            }),
        )];
        let err = transform::<Calculation>(rows, Selection::AllVisited).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }
}
