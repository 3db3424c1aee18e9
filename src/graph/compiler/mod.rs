//! Query compilers: the five logical graph operations rendered as backend
//! query text.
//!
//! | operation | Gremlin | Cypher |
//! |-----------|---------|--------|
//! | upsert node | `fold().coalesce(unfold(), addV())` | `MERGE ... ON CREATE SET` |
//! | upsert relationship | `coalesce(inE().where(outV()), addE())` | `MERGE (a)-[:t]->(b)` |
//! | circular dependencies | `repeat(outE().inV().simplePath())` | `MATCH p = (n)-[:t*]->(n)` |
//! | all entities | `union(identity(), bothE().otherV())` | `OPTIONAL MATCH (n)-[r]-(m)` |
//! | delete | `drop()` | `DETACH DELETE` / `DELETE r` |
//!
//! Traversal results are returned as elements tagged `type: "vertex"` or
//! `type: "edge"` so the result transformer can decode both backends alike.

mod cypher;
mod gremlin;

pub use cypher::CypherCompiler;
pub(crate) use cypher::ELEMENTS_COLUMN;
pub use gremlin::GremlinCompiler;

use crate::error::GraphError;
use crate::graph::query::CompiledQuery;
use crate::models::{Field, PreparedNode};

/// Locates vertices by label and one field.
#[derive(Debug, Clone, Copy)]
pub struct NodeMatch<'a> {
    /// Label, already passed through the naming policy.
    pub label: &'a str,
    pub field: &'a Field,
}

impl<'a> NodeMatch<'a> {
    pub fn new(label: &'a str, field: &'a Field) -> Self {
        Self { label, field }
    }
}

/// What a delete operation removes.
#[derive(Debug, Clone, Copy)]
pub enum DeleteTarget<'a> {
    /// The matched vertices and their edges.
    Node(NodeMatch<'a>),
    /// The matched vertices plus everything reachable over outgoing edges.
    NodeAndDescendants(NodeMatch<'a>),
    /// Edges of one type from `from` to `to`; endpoints stay.
    Relationship {
        relationship_type: &'a str,
        from: NodeMatch<'a>,
        to: NodeMatch<'a>,
    },
}

/// Compiles the logical graph operations into one backend's query text.
///
/// Relationship type names are passed as given by the caller; compilers
/// apply the naming policy themselves.
pub trait QueryCompiler: Send + Sync {
    /// Find by index properties or create with immutable properties, then
    /// apply mutable properties.
    fn upsert_node(&self, node: &PreparedNode) -> Result<CompiledQuery, GraphError>;

    /// Create a `from → to` edge unless one of the same type already exists.
    fn upsert_relationship(
        &self,
        relationship_type: &str,
        from: &NodeMatch<'_>,
        to: &NodeMatch<'_>,
    ) -> Result<CompiledQuery, GraphError>;

    /// Every simple cycle over `relationship_type` through the start vertex.
    fn circular_dependencies(
        &self,
        relationship_type: &str,
        start: &NodeMatch<'_>,
    ) -> Result<CompiledQuery, GraphError>;

    /// The start vertex with its direct neighbours over any of the given
    /// relationship types, in either direction.
    fn all_entities(
        &self,
        start: &NodeMatch<'_>,
        relationship_types: &[&str],
    ) -> Result<CompiledQuery, GraphError>;

    /// Match-then-drop for vertices, vertex trees or edges.
    fn delete(&self, target: &DeleteTarget<'_>) -> Result<CompiledQuery, GraphError>;
}
