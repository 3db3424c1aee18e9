//! Core traits for backend-agnostic graph access.
//!
//! - [`QueryExecutor`] - Send compiled queries, stream raw rows back
//! - [`GraphBackend`] - An executor paired with the compiler for its language
//!
//! The compiler side lives in [`crate::graph::compiler`].

use async_trait::async_trait;
use futures::TryStreamExt;

use crate::error::GraphError;
use crate::graph::compiler::QueryCompiler;
use crate::graph::query::CompiledQuery;
use crate::graph::row::{Row, RowStream};

/// Executes compiled queries against a graph store.
///
/// Each call acquires its own connection (or session) immediately before
/// sending and releases it when the call, or the returned stream, is done.
/// Every backend failure is reported as [`GraphError::QueryExecution`].
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Executes a read query and returns a stream of raw rows.
    ///
    /// The stream owns the connection; dropping it early releases it.
    async fn execute(&self, query: CompiledQuery) -> Result<RowStream<'_>, GraphError>;

    /// Executes a write query, discarding any rows.
    async fn run(&self, query: CompiledQuery) -> Result<(), GraphError>;

    /// Executes a read query and collects every row.
    async fn fetch_all(&self, query: CompiledQuery) -> Result<Vec<Row>, GraphError> {
        self.execute(query).await?.try_collect().await
    }
}

/// A graph store reachable through one query language.
///
/// Pairs a [`QueryExecutor`] with the [`QueryCompiler`] producing text it
/// understands, so the two can never be mixed up.
pub trait GraphBackend: QueryExecutor {
    fn compiler(&self) -> &dyn QueryCompiler;

    /// Short backend name used in logs.
    fn name(&self) -> &'static str;
}
