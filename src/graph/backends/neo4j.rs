//! Neo4j backend over Bolt (neo4rs).
//!
//! Reads run on auto-commit sessions and stream rows through the driver's
//! fetch-size batching. Writes run inside an explicit transaction that is
//! committed once the statement succeeds; dropping it uncommitted rolls
//! back. Bolt values are converted to and from JSON at this boundary.

use std::collections::HashMap;

use async_stream::try_stream;
use async_trait::async_trait;
use neo4rs::{
    BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNull, BoltString, BoltType,
    ConfigBuilder, Graph, Query,
};
use serde_json::{Map, Number, Value as JsonValue};
use tracing::{debug, info};

use crate::config::CypherConfig;
use crate::error::GraphError;
use crate::graph::compiler::{CypherCompiler, QueryCompiler, ELEMENTS_COLUMN};
use crate::graph::query::CompiledQuery;
use crate::graph::row::{Params, Row, RowStream};
use crate::graph::traits::{GraphBackend, QueryExecutor};

/// Cypher graph backend.
///
/// This type is cheap to clone; the driver's connection pool is shared.
#[derive(Clone)]
pub struct CypherBackend {
    graph: Graph,
    compiler: CypherCompiler,
}

impl CypherBackend {
    /// Connects the driver. neo4rs verifies connectivity while building the
    /// pool, so an unreachable server fails here.
    pub async fn connect(config: &CypherConfig) -> Result<Self, GraphError> {
        let mut builder = ConfigBuilder::default()
            .uri(config.url.as_str())
            .user(config.username.as_str())
            .password(config.password.as_str())
            .fetch_size(config.fetch_size)
            .max_connections(config.max_connections);
        if let Some(database) = &config.database {
            builder = builder.db(database.as_str());
        }

        let neo_config = builder
            .build()
            .map_err(|e| GraphError::query("invalid Neo4j configuration", "", e))?;
        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::query(format!("failed to connect to {}", config.url), "", e))?;

        info!(
            url = %config.url,
            database = config.database.as_deref().unwrap_or("<default>"),
            max_connections = config.max_connections,
            "Connected to Neo4j"
        );
        Ok(Self {
            graph,
            compiler: CypherCompiler::new(),
        })
    }

    /// Wraps an already connected driver.
    pub fn from_graph(graph: Graph) -> Self {
        Self {
            graph,
            compiler: CypherCompiler::new(),
        }
    }
}

#[async_trait]
impl QueryExecutor for CypherBackend {
    async fn execute(&self, query: CompiledQuery) -> Result<RowStream<'_>, GraphError> {
        let (text, params) = query.into_parts();
        debug!(query = %text, params = params.len(), "Executing Cypher query");

        let mut rows = self
            .graph
            .execute(to_bolt_query(&text, params))
            .await
            .map_err(|e| GraphError::query("Cypher query failed", text.as_str(), e))?;

        Ok(Box::pin(try_stream! {
            while let Some(row) = rows
                .next()
                .await
                .map_err(|e| GraphError::query("failed to fetch row", text.as_str(), e))?
            {
                yield convert_row(&row, &text)?;
            }
        }))
    }

    async fn run(&self, query: CompiledQuery) -> Result<(), GraphError> {
        let (text, params) = query.into_parts();
        debug!(query = %text, params = params.len(), "Running Cypher statement");

        let mut txn = self
            .graph
            .start_txn()
            .await
            .map_err(|e| GraphError::query("failed to begin transaction", text.as_str(), e))?;
        txn.run(to_bolt_query(&text, params))
            .await
            .map_err(|e| GraphError::query("Cypher statement failed", text.as_str(), e))?;
        txn.commit()
            .await
            .map_err(|e| GraphError::query("failed to commit transaction", text.as_str(), e))
    }
}

impl GraphBackend for CypherBackend {
    fn compiler(&self) -> &dyn QueryCompiler {
        &self.compiler
    }

    fn name(&self) -> &'static str {
        "cypher"
    }
}

fn to_bolt_query(text: &str, params: Params) -> Query {
    params
        .into_iter()
        .fold(Query::new(text.to_string()), |query, (name, value)| {
            query.param(&name, json_to_bolt(value))
        })
}

/// Reads the `elements` column as a JSON list of tagged maps.
fn convert_row(row: &neo4rs::Row, text: &str) -> Result<Row, GraphError> {
    let elements: Vec<BoltMap> = row
        .get(ELEMENTS_COLUMN)
        .map_err(|e| GraphError::query("failed to decode result row", text, e))?;
    let elements = elements
        .into_iter()
        .map(|map| bolt_to_json(BoltType::Map(map)))
        .collect();
    Ok(Row::single(ELEMENTS_COLUMN, JsonValue::Array(elements)))
}

fn json_to_bolt(value: JsonValue) -> BoltType {
    match value {
        JsonValue::Null => BoltType::Null(BoltNull),
        JsonValue::Bool(b) => BoltType::Boolean(BoltBoolean::new(b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => BoltType::Integer(BoltInteger::new(i)),
            None => BoltType::Float(BoltFloat::new(n.as_f64().unwrap_or(f64::NAN))),
        },
        JsonValue::String(s) => BoltType::String(BoltString::from(s)),
        JsonValue::Array(items) => BoltType::List(BoltList {
            value: items.into_iter().map(json_to_bolt).collect(),
        }),
        JsonValue::Object(map) => BoltType::Map(BoltMap {
            value: map
                .into_iter()
                .map(|(k, v)| (BoltString::from(k), json_to_bolt(v)))
                .collect::<HashMap<_, _>>(),
        }),
    }
}

/// Converts the value shapes the projections produce. Temporal, spatial and
/// structural values never appear there and become `null`.
fn bolt_to_json(value: BoltType) -> JsonValue {
    match value {
        BoltType::Null(_) => JsonValue::Null,
        BoltType::Boolean(b) => JsonValue::Bool(b.value),
        BoltType::Integer(i) => JsonValue::from(i.value),
        BoltType::Float(f) => Number::from_f64(f.value)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        BoltType::String(s) => JsonValue::String(s.value),
        BoltType::List(list) => JsonValue::Array(list.value.into_iter().map(bolt_to_json).collect()),
        BoltType::Map(map) => JsonValue::Object(
            map.value
                .into_iter()
                .map(|(k, v)| (k.value, bolt_to_json(v)))
                .collect::<Map<_, _>>(),
        ),
        _ => JsonValue::Null,
    }
}
