//! Gremlin Server backend (TinkerPop WebSocket protocol).
//!
//! Traversal text from [`GremlinCompiler`] is sent as an `eval` request on a
//! pooled connection. Results arrive as one or more response messages:
//!
//! | status | meaning |
//! |--------|---------|
//! | 206 | partial content, more messages follow |
//! | 200 | final message with data |
//! | 204 | no content |
//! | 407 | authentication challenge, answered with SASL PLAIN |
//!
//! Anything else fails the call with the server's message.

mod connection;
mod protocol;

pub use connection::{GremlinConnection, GremlinManager, GremlinPool};

use std::sync::Arc;

use async_stream::try_stream;
use async_trait::async_trait;
use deadpool::managed::{Object, PoolError};
use futures::StreamExt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::GremlinConfig;
use crate::error::GraphError;
use crate::graph::compiler::{GremlinCompiler, QueryCompiler};
use crate::graph::query::CompiledQuery;
use crate::graph::row::RowStream;
use crate::graph::traits::{GraphBackend, QueryExecutor};

/// Credentials and serializer announced on every request.
struct RequestSettings {
    mime_type: String,
    username: String,
    password: String,
}

/// Gremlin graph backend.
///
/// Cheap to clone; the pool and settings are shared.
#[derive(Clone)]
pub struct GremlinBackend {
    pool: GremlinPool,
    settings: Arc<RequestSettings>,
    compiler: GremlinCompiler,
}

impl GremlinBackend {
    /// Builds the connection pool. Connections are opened lazily on first
    /// use, so this never touches the network.
    pub fn connect(config: &GremlinConfig) -> Result<Self, GraphError> {
        let pool = GremlinPool::builder(GremlinManager::new(config))
            .max_size(config.pool_size)
            .build()
            .map_err(|e| GraphError::query("failed to create Gremlin connection pool", "", e))?;

        info!(
            endpoint = %config.endpoint(),
            pool_size = config.pool_size,
            max_in_process = config.max_in_process_per_connection,
            "Gremlin backend ready"
        );

        Ok(Self {
            pool,
            settings: Arc::new(RequestSettings {
                mime_type: config.mime_type.clone(),
                username: config.container_path.clone(),
                password: config.key.clone(),
            }),
            compiler: GremlinCompiler::new(),
        })
    }

    async fn get_connection(&self, query: &str) -> Result<Object<GremlinManager>, GraphError> {
        self.pool.get().await.map_err(|e| match e {
            PoolError::Backend(e) => with_query(e, query),
            other => GraphError::rejected(
                format!("failed to get connection from pool: {}", other),
                query,
            ),
        })
    }
}

#[async_trait]
impl QueryExecutor for GremlinBackend {
    async fn execute(&self, query: CompiledQuery) -> Result<RowStream<'_>, GraphError> {
        let (text, _) = query.into_parts();
        debug!(query = %text, "Executing Gremlin traversal");

        let conn = self.get_connection(&text).await?;
        Ok(submit(conn, self.settings.clone(), text))
    }

    async fn run(&self, query: CompiledQuery) -> Result<(), GraphError> {
        let mut stream = self.execute(query).await?;
        while let Some(row) = stream.next().await {
            row?;
        }
        Ok(())
    }
}

impl GraphBackend for GremlinBackend {
    fn compiler(&self) -> &dyn QueryCompiler {
        &self.compiler
    }

    fn name(&self) -> &'static str {
        "gremlin"
    }
}

/// Sends one traversal and streams its result rows.
///
/// The stream owns the pooled connection. It is marked busy until the final
/// status arrives, so dropping the stream early retires the connection.
fn submit(
    conn: Object<GremlinManager>,
    settings: Arc<RequestSettings>,
    text: String,
) -> RowStream<'static> {
    Box::pin(try_stream! {
        let mut conn = conn;
        let request_id = Uuid::new_v4();
        let frame = protocol::eval_frame(&settings.mime_type, request_id, &text)?;

        conn.busy = true;
        conn.send(frame)
            .await
            .map_err(|e| GraphError::query("failed to send Gremlin request", text.as_str(), e))?;

        loop {
            let response = conn.receive().await.map_err(|e| with_query(e, &text))?;
            // a stray message leaves the connection busy so it is retired
            if let Some(id) = response.request_id.filter(|id| *id != request_id) {
                Err(GraphError::rejected(
                    format!("response for request {} while waiting for {}", id, request_id),
                    text.as_str(),
                ))?;
            }
            match response.status.code {
                protocol::AUTHENTICATE => {
                    debug!(%request_id, "Answering SASL challenge");
                    let frame = protocol::auth_frame(
                        &settings.mime_type,
                        request_id,
                        &settings.username,
                        &settings.password,
                    )?;
                    conn.send(frame).await.map_err(|e| {
                        GraphError::query("failed to send Gremlin credentials", text.as_str(), e)
                    })?;
                }
                protocol::PARTIAL_CONTENT => {
                    for row in response.into_rows() {
                        yield row;
                    }
                }
                protocol::SUCCESS => {
                    conn.busy = false;
                    for row in response.into_rows() {
                        yield row;
                    }
                    break;
                }
                protocol::NO_CONTENT => {
                    conn.busy = false;
                    break;
                }
                _ => {
                    // The server has finished with this request; the
                    // connection stays usable.
                    conn.busy = false;
                    Err(GraphError::rejected(response.describe(), text.as_str()))?;
                }
            }
        }
    })
}

/// Attaches the traversal text to connection-level errors.
fn with_query(err: GraphError, text: &str) -> GraphError {
    match err {
        GraphError::QueryExecution {
            message,
            query,
            source,
        } if query.is_empty() => GraphError::QueryExecution {
            message,
            query: text.to_string(),
            source,
        },
        other => other,
    }
}
