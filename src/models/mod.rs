//! Domain-facing data model exchanged with callers.

mod entity;
mod field;
mod node;

pub use entity::{Entity, Relationship, RelationshipSpec};
pub use field::Field;
pub use node::{
    generate_ulid, GraphNode, NodeDescriptor, PreparedNode, FALLBACK_PARTITION_KEY, ID_PROPERTY,
    PARTITION_KEY_PROPERTY,
};

/// Flat property map of one vertex.
pub type PropertyBag = serde_json::Map<String, serde_json::Value>;
