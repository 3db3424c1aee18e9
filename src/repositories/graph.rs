//! Graph repository: typed node and relationship persistence.

use tracing::debug;

use crate::config::Config;
use crate::error::GraphError;
use crate::graph::{
    transform, Backend, CompiledQuery, DeleteTarget, GraphBackend, NodeMatch, Selection,
};
use crate::models::{Entity, Field, GraphNode, NodeDescriptor, RelationshipSpec};
use crate::naming;

/// Persists [`GraphNode`] types and the relationships between them.
///
/// Every operation compiles its query with the backend's compiler and runs
/// it on a connection acquired for that call alone. Batch operations run
/// strictly in order; items before a failure stay committed.
///
/// # Example
///
/// ```ignore
/// use fundgraph::{Config, Field, GraphRepository};
///
/// let repository = GraphRepository::connect(&Config::load()?).await?;
/// repository.upsert_nodes(&[calculation]).await?;
/// let cycles = repository
///     .get_circular_dependencies::<Calculation>("dependsOn", &Field::new("id", "A"))
///     .await?;
/// ```
#[derive(Clone)]
pub struct GraphRepository<B: GraphBackend = Backend> {
    backend: B,
}

impl GraphRepository<Backend> {
    /// Validates `config` and connects the backend it selects.
    pub async fn connect(config: &Config) -> Result<Self, GraphError> {
        Ok(Self::new(Backend::connect(config).await?))
    }
}

impl<B: GraphBackend> GraphRepository<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Creates each node unless one with the same index properties exists,
    /// then applies its mutable properties.
    ///
    /// Every node is validated and compiled before the first query is sent,
    /// so a node missing an index property fails the whole batch untouched.
    pub async fn upsert_nodes<T: GraphNode>(&self, nodes: &[T]) -> Result<(), GraphError> {
        self.upsert_with(&NodeDescriptor::of::<T>(), nodes).await
    }

    /// Like [`upsert_nodes`](Self::upsert_nodes), matching on `indices`
    /// instead of the type's declared index properties.
    pub async fn upsert_nodes_with_indices<T: GraphNode>(
        &self,
        nodes: &[T],
        indices: &[&str],
    ) -> Result<(), GraphError> {
        let descriptor = NodeDescriptor::of::<T>().with_index_properties(indices);
        self.upsert_with(&descriptor, nodes).await
    }

    async fn upsert_with<T: GraphNode>(
        &self,
        descriptor: &NodeDescriptor,
        nodes: &[T],
    ) -> Result<(), GraphError> {
        let compiler = self.backend.compiler();
        let queries = nodes
            .iter()
            .map(|node| compiler.upsert_node(&descriptor.prepare(node)?))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            backend = self.backend.name(),
            label = descriptor.label(),
            count = queries.len(),
            "Upserting nodes"
        );
        self.run_all(queries).await
    }

    /// Deletes the nodes matching `field` together with their edges.
    pub async fn delete_node<T: GraphNode>(&self, field: &Field) -> Result<(), GraphError> {
        let label = naming::label_for(T::TYPE_NAME);
        debug!(label = %label, field = %field.name, "Deleting node");

        let query = self
            .backend
            .compiler()
            .delete(&DeleteTarget::Node(NodeMatch::new(&label, field)))?;
        self.backend.run(query).await
    }

    /// Deletes the nodes matching each field, in order.
    pub async fn delete_nodes<T: GraphNode>(&self, fields: &[Field]) -> Result<(), GraphError> {
        for field in fields {
            self.delete_node::<T>(field).await?;
        }
        Ok(())
    }

    /// Deletes the matching nodes and everything reachable from them over
    /// outgoing relationships.
    pub async fn delete_node_and_child_nodes<T: GraphNode>(
        &self,
        field: &Field,
    ) -> Result<(), GraphError> {
        let label = naming::label_for(T::TYPE_NAME);
        debug!(label = %label, field = %field.name, "Deleting node and descendants");

        let query = self
            .backend
            .compiler()
            .delete(&DeleteTarget::NodeAndDescendants(NodeMatch::new(
                &label, field,
            )))?;
        self.backend.run(query).await
    }

    /// Adds a `left → right` relationship unless one of that type exists.
    pub async fn upsert_relationship<L: GraphNode, R: GraphNode>(
        &self,
        relationship_type: &str,
        left: &Field,
        right: &Field,
    ) -> Result<(), GraphError> {
        let query = self.compile_relationship::<L, R>(relationship_type, left, right, false)?;
        self.backend.run(query).await
    }

    /// Upserts each relationship in order.
    pub async fn upsert_relationships<L: GraphNode, R: GraphNode>(
        &self,
        relationships: &[RelationshipSpec],
    ) -> Result<(), GraphError> {
        for spec in relationships {
            self.upsert_relationship::<L, R>(&spec.relationship_type, &spec.left, &spec.right)
                .await?;
        }
        Ok(())
    }

    /// Removes `left → right` relationships of the type; both nodes stay.
    pub async fn delete_relationship<L: GraphNode, R: GraphNode>(
        &self,
        relationship_type: &str,
        left: &Field,
        right: &Field,
    ) -> Result<(), GraphError> {
        let query = self.compile_relationship::<L, R>(relationship_type, left, right, true)?;
        self.backend.run(query).await
    }

    /// Deletes each relationship in order.
    pub async fn delete_relationships<L: GraphNode, R: GraphNode>(
        &self,
        relationships: &[RelationshipSpec],
    ) -> Result<(), GraphError> {
        for spec in relationships {
            self.delete_relationship::<L, R>(&spec.relationship_type, &spec.left, &spec.right)
                .await?;
        }
        Ok(())
    }

    fn compile_relationship<L: GraphNode, R: GraphNode>(
        &self,
        relationship_type: &str,
        left: &Field,
        right: &Field,
        delete: bool,
    ) -> Result<CompiledQuery, GraphError> {
        let left_label = naming::label_for(L::TYPE_NAME);
        let right_label = naming::label_for(R::TYPE_NAME);
        let from = NodeMatch::new(&left_label, left);
        let to = NodeMatch::new(&right_label, right);
        debug!(
            relationship = relationship_type,
            from = %left_label,
            to = %right_label,
            delete,
            "Compiling relationship"
        );

        let compiler = self.backend.compiler();
        if delete {
            compiler.delete(&DeleteTarget::Relationship {
                relationship_type,
                from,
                to,
            })
        } else {
            compiler.upsert_relationship(relationship_type, &from, &to)
        }
    }

    /// Returns the nodes matching `field`, each with the relationships of
    /// the given types that touch it directly. With no types the entities
    /// carry no relationships.
    pub async fn get_all_entities<T: GraphNode>(
        &self,
        field: &Field,
        relationship_types: &[&str],
    ) -> Result<Vec<Entity<T>>, GraphError> {
        let label = naming::label_for(T::TYPE_NAME);
        let query = self
            .backend
            .compiler()
            .all_entities(&NodeMatch::new(&label, field), relationship_types)?;

        let rows = self.backend.fetch_all(query).await?;
        let entities = transform(
            rows,
            Selection::MatchesOnly {
                label: &label,
                field,
            },
        )?;
        debug!(label = %label, found = entities.len(), "Fetched entities");
        Ok(entities)
    }

    /// [`get_all_entities`](Self::get_all_entities) for each field, results
    /// concatenated in field order.
    pub async fn get_all_entities_for_all<T: GraphNode>(
        &self,
        fields: &[Field],
        relationship_types: &[&str],
    ) -> Result<Vec<Entity<T>>, GraphError> {
        let mut entities = Vec::new();
        for field in fields {
            entities.extend(self.get_all_entities::<T>(field, relationship_types).await?);
        }
        Ok(entities)
    }

    /// Returns every node on a cycle of `relationship_type` through the
    /// nodes matching `field`, each carrying the cycle edges that touch it.
    pub async fn get_circular_dependencies<T: GraphNode>(
        &self,
        relationship_type: &str,
        field: &Field,
    ) -> Result<Vec<Entity<T>>, GraphError> {
        let label = naming::label_for(T::TYPE_NAME);
        let query = self
            .backend
            .compiler()
            .circular_dependencies(relationship_type, &NodeMatch::new(&label, field))?;

        let rows = self.backend.fetch_all(query).await?;
        let entities = transform(rows, Selection::AllVisited)?;
        debug!(
            label = %label,
            relationship = relationship_type,
            found = entities.len(),
            "Fetched circular dependencies"
        );
        Ok(entities)
    }

    async fn run_all(&self, queries: Vec<CompiledQuery>) -> Result<(), GraphError> {
        for query in queries {
            self.backend.run(query).await?;
        }
        Ok(())
    }
}
