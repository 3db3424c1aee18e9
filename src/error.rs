//! Error types for the graph persistence layer.

use std::error::Error as StdError;

use thiserror::Error;

/// Boxed source error carried by [`GraphError::QueryExecution`].
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Errors surfaced by the graph repository, whichever backend is active.
#[derive(Error, Debug)]
pub enum GraphError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Missing required setting: {setting}")]
    MissingSetting { setting: String },

    // Validation errors
    #[error("Node '{label}' declares no index properties")]
    NoIndexProperties { label: String },

    #[error("Node '{label}' is missing index property '{property}'")]
    MissingIndexProperty { label: String, property: String },

    #[error("Value for '{property}' cannot be written as a query literal: {reason}")]
    UnsupportedLiteral { property: String, reason: String },

    // Backend errors
    #[error("Graph query failed: {message}")]
    QueryExecution {
        message: String,
        query: String,
        #[source]
        source: Option<BoxError>,
    },

    // Result contract violations
    #[error("Edge '{edge_id}' references vertex '{vertex_id}' missing from the result")]
    PartialResult { edge_id: String, vertex_id: String },

    #[error("Malformed graph element: {0}")]
    MalformedElement(String),

    // Node encoding
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of [`GraphError`] so callers never match on
/// backend-specific detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
    QueryExecution,
    PartialResult,
    Serialization,
}

impl GraphError {
    /// Builds a [`GraphError::QueryExecution`] from a backend failure.
    pub fn query<E>(message: impl Into<String>, query: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        GraphError::QueryExecution {
            message: message.into(),
            query: query.into(),
            source: Some(source.into()),
        }
    }

    /// Builds a [`GraphError::QueryExecution`] reported by the server itself.
    pub fn rejected(message: impl Into<String>, query: impl Into<String>) -> Self {
        GraphError::QueryExecution {
            message: message.into(),
            query: query.into(),
            source: None,
        }
    }

    pub fn missing_setting(setting: impl Into<String>) -> Self {
        GraphError::MissingSetting {
            setting: setting.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::Config(_) | GraphError::MissingSetting { .. } => ErrorKind::Configuration,
            GraphError::NoIndexProperties { .. }
            | GraphError::MissingIndexProperty { .. }
            | GraphError::UnsupportedLiteral { .. } => ErrorKind::Validation,
            GraphError::QueryExecution { .. } => ErrorKind::QueryExecution,
            GraphError::PartialResult { .. } | GraphError::MalformedElement(_) => {
                ErrorKind::PartialResult
            }
            GraphError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// The query text that failed, when the error came from a backend.
    pub fn query_text(&self) -> Option<&str> {
        match self {
            GraphError::QueryExecution { query, .. } => Some(query),
            _ => None,
        }
    }
}
