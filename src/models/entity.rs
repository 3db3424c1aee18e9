//! Entity model: a typed node together with the relationships touching it.

use serde::{Deserialize, Serialize};

use crate::models::{Field, PropertyBag};

/// A typed, directed connection resolved from a traversal.
///
/// `one` is the source vertex's property bag and `two` the target's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Edge label (relationship type after the naming policy).
    #[serde(rename = "type")]
    pub relationship_type: String,
    pub one: PropertyBag,
    pub two: PropertyBag,
}

/// A decoded node plus every relationship the query found touching it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity<T> {
    pub node: T,
    pub relationships: Vec<Relationship>,
}

impl<T> Entity<T> {
    pub fn new(node: T) -> Self {
        Self {
            node,
            relationships: Vec::new(),
        }
    }

    /// Relationships of the given type, in discovery order.
    pub fn relationships_of<'a>(
        &'a self,
        relationship_type: &'a str,
    ) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.relationships
            .iter()
            .filter(move |r| r.relationship_type == relationship_type)
    }
}

/// One relationship request in a batch upsert or delete.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipSpec {
    pub relationship_type: String,
    pub left: Field,
    pub right: Field,
}

impl RelationshipSpec {
    pub fn new(relationship_type: impl Into<String>, left: Field, right: Field) -> Self {
        Self {
            relationship_type: relationship_type.into(),
            left,
            right,
        }
    }
}
