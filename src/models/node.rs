//! Per-type node descriptors and upsert preparation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use ulid::Ulid;

use crate::error::GraphError;
use crate::models::PropertyBag;
use crate::naming;

/// Identifier property, always immutable.
pub const ID_PROPERTY: &str = "id";

/// Partition key property, always immutable.
pub const PARTITION_KEY_PROPERTY: &str = "partitionkey";

/// Partition key assigned when an instance does not carry one.
pub const FALLBACK_PARTITION_KEY: &str = "default";

/// A domain type that can be stored as a graph vertex.
///
/// The descriptor is declared at compile time; property values come from the
/// type's `Serialize` implementation and are read back with `Deserialize`.
/// Property names are lowercased on the way in, so field names should
/// already be lowercase (the default for snake_case Rust fields).
///
/// # Example
///
/// ```
/// use fundgraph::models::GraphNode;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Calculation {
///     id: String,
///     name: String,
/// }
///
/// impl GraphNode for Calculation {
///     const TYPE_NAME: &'static str = "Calculation";
///     const INDEX_PROPERTIES: &'static [&'static str] = &["id"];
/// }
/// ```
pub trait GraphNode: Serialize + DeserializeOwned + Send + Sync {
    /// Type name the label is derived from.
    const TYPE_NAME: &'static str;

    /// Properties used to find an existing vertex before creating one.
    const INDEX_PROPERTIES: &'static [&'static str];

    /// Extra properties set only at creation, on top of the identifier and
    /// partition key.
    const IMMUTABLE_PROPERTIES: &'static [&'static str] = &[];
}

/// Label and property roles of a node type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    label: String,
    index_properties: Vec<String>,
    immutable_properties: Vec<String>,
}

impl NodeDescriptor {
    /// Builds the descriptor declared by `T`.
    pub fn of<T: GraphNode>() -> Self {
        let mut immutable_properties = vec![
            ID_PROPERTY.to_string(),
            PARTITION_KEY_PROPERTY.to_string(),
        ];
        for property in T::IMMUTABLE_PROPERTIES {
            let key = naming::key_for(property);
            if !immutable_properties.contains(&key) {
                immutable_properties.push(key);
            }
        }

        Self {
            label: naming::label_for(T::TYPE_NAME),
            index_properties: T::INDEX_PROPERTIES
                .iter()
                .map(|p| naming::key_for(p))
                .collect(),
            immutable_properties,
        }
    }

    /// Replaces the declared index properties. An empty slice keeps them.
    pub fn with_index_properties(mut self, indices: &[&str]) -> Self {
        if !indices.is_empty() {
            self.index_properties = indices.iter().map(|p| naming::key_for(p)).collect();
        }
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn index_properties(&self) -> &[String] {
        &self.index_properties
    }

    pub fn immutable_properties(&self) -> &[String] {
        &self.immutable_properties
    }

    pub fn is_immutable(&self, key: &str) -> bool {
        self.immutable_properties.iter().any(|p| p == key)
    }

    /// Splits one instance into index, immutable and mutable property bags.
    ///
    /// Fails with [`GraphError::NoIndexProperties`] when the descriptor has no
    /// index properties, since the upsert would then match every vertex of the
    /// label. Fails with [`GraphError::MissingIndexProperty`] when an index
    /// property is absent or null. Assigns a fresh ULID when the identifier is missing
    /// and [`FALLBACK_PARTITION_KEY`] when the partition key is missing.
    pub fn prepare<T: Serialize>(&self, node: &T) -> Result<PreparedNode, GraphError> {
        if self.index_properties.is_empty() {
            return Err(GraphError::NoIndexProperties {
                label: self.label.clone(),
            });
        }

        let mut properties = match serde_json::to_value(node)? {
            JsonValue::Object(map) => map
                .into_iter()
                .map(|(key, value)| (naming::key_for(&key), value))
                .collect::<PropertyBag>(),
            other => {
                return Err(GraphError::Serialization(serde::ser::Error::custom(
                    format!(
                        "node '{}' must serialize to an object, got {}",
                        self.label, other
                    ),
                )))
            }
        };

        let mut index = PropertyBag::new();
        for property in &self.index_properties {
            match properties.get(property) {
                Some(value) if !value.is_null() => {
                    index.insert(property.clone(), value.clone());
                }
                _ => {
                    return Err(GraphError::MissingIndexProperty {
                        label: self.label.clone(),
                        property: property.clone(),
                    })
                }
            }
        }

        if properties.get(ID_PROPERTY).map_or(true, JsonValue::is_null) {
            properties.insert(ID_PROPERTY.to_string(), generate_ulid().into());
        }
        if properties
            .get(PARTITION_KEY_PROPERTY)
            .map_or(true, JsonValue::is_null)
        {
            properties.insert(
                PARTITION_KEY_PROPERTY.to_string(),
                FALLBACK_PARTITION_KEY.into(),
            );
        }

        let mut immutable = PropertyBag::new();
        let mut mutable = PropertyBag::new();
        for (key, value) in properties {
            if self.is_immutable(&key) {
                // Absent optional immutables are simply not set at creation.
                if !value.is_null() {
                    immutable.insert(key, value);
                }
            } else {
                mutable.insert(key, value);
            }
        }

        Ok(PreparedNode {
            label: self.label.clone(),
            index,
            immutable,
            mutable,
        })
    }
}

/// One validated instance, ready for the query compiler.
///
/// Index properties also appear in whichever of `immutable` or `mutable`
/// they belong to. A null in `mutable` removes the property.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedNode {
    pub label: String,
    pub index: PropertyBag,
    pub immutable: PropertyBag,
    pub mutable: PropertyBag,
}

/// Generates a new ULID string.
pub fn generate_ulid() -> String {
    Ulid::new().to_string()
}
