//! Naming policy for labels, property keys and edge labels.
//!
//! Every name that reaches a graph store goes through the same mapping: the
//! invariant lowercase of the source name, with no other transformation.
//! Two domain types whose names differ only by case map to the same label;
//! that is a modelling error and is not resolved here.

/// Label for a domain type name (`ModelWithImmutableProperties` →
/// `modelwithimmutableproperties`).
pub fn label_for(type_name: &str) -> String {
    type_name.to_lowercase()
}

/// Store key for a property or field name.
pub fn key_for(property: &str) -> String {
    property.to_lowercase()
}

/// Edge label for a relationship type name.
pub fn edge_label_for(relationship_type: &str) -> String {
    relationship_type.to_lowercase()
}
