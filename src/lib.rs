//! fundgraph - Graph persistence engine
//!
//! Stores typed domain nodes and the relationships between them in a graph
//! database reached through either Gremlin or Cypher, behind one generic
//! repository.

pub mod config;
pub mod error;
pub mod graph;
pub mod models;
pub mod naming;
pub mod repositories;

pub use config::{BackendKind, Config};
pub use error::{ErrorKind, GraphError};
pub use models::{Entity, Field, GraphNode, Relationship, RelationshipSpec};
pub use repositories::GraphRepository;
