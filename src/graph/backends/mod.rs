//! Graph store backends.
//!
//! Each backend implements [`QueryExecutor`] and [`GraphBackend`], pairing
//! its transport with the compiler for its query language.
//!
//! | Backend | Module | Protocol | Query language |
//! |---------|--------|----------|----------------|
//! | Gremlin Server / Cosmos DB | [`gremlin`] | WebSocket | Gremlin traversal |
//! | Neo4j | [`neo4j`] | Bolt | Cypher |
//!
//! [`Backend`] selects one of them from configuration, once, at startup.

pub mod gremlin;
pub mod neo4j;

use async_trait::async_trait;
use tracing::info;

use crate::config::{BackendKind, Config};
use crate::error::GraphError;
use crate::graph::compiler::QueryCompiler;
use crate::graph::query::CompiledQuery;
use crate::graph::row::RowStream;
use crate::graph::traits::{GraphBackend, QueryExecutor};

pub use gremlin::GremlinBackend;
pub use neo4j::CypherBackend;

/// The configured backend.
#[derive(Clone)]
pub enum Backend {
    Gremlin(GremlinBackend),
    Cypher(CypherBackend),
}

impl Backend {
    /// Validates `config` and builds the backend it selects.
    pub async fn connect(config: &Config) -> Result<Self, GraphError> {
        config.validate()?;
        info!(backend = ?config.backend, "Connecting graph backend");

        match config.backend {
            BackendKind::Gremlin => {
                let gremlin = config
                    .gremlin
                    .as_ref()
                    .ok_or_else(|| GraphError::missing_setting("gremlin"))?;
                Ok(Backend::Gremlin(GremlinBackend::connect(gremlin)?))
            }
            BackendKind::Cypher => {
                let cypher = config
                    .cypher
                    .as_ref()
                    .ok_or_else(|| GraphError::missing_setting("cypher"))?;
                Ok(Backend::Cypher(CypherBackend::connect(cypher).await?))
            }
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Gremlin(_) => BackendKind::Gremlin,
            Backend::Cypher(_) => BackendKind::Cypher,
        }
    }
}

#[async_trait]
impl QueryExecutor for Backend {
    async fn execute(&self, query: CompiledQuery) -> Result<RowStream<'_>, GraphError> {
        match self {
            Backend::Gremlin(b) => b.execute(query).await,
            Backend::Cypher(b) => b.execute(query).await,
        }
    }

    async fn run(&self, query: CompiledQuery) -> Result<(), GraphError> {
        match self {
            Backend::Gremlin(b) => b.run(query).await,
            Backend::Cypher(b) => b.run(query).await,
        }
    }
}

impl GraphBackend for Backend {
    fn compiler(&self) -> &dyn QueryCompiler {
        match self {
            Backend::Gremlin(b) => b.compiler(),
            Backend::Cypher(b) => b.compiler(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Backend::Gremlin(b) => b.name(),
            Backend::Cypher(b) => b.name(),
        }
    }
}
