//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. Service config: `fundgraph.toml` in the working directory
//! 2. Environment variables: `FUNDGRAPH_*`, `__` separating nested keys
//!    (e.g. `FUNDGRAPH_GREMLIN__KEY`)
//!
//! # Example
//!
//! ```toml
//! backend = "gremlin"
//!
//! [gremlin]
//! host = "funding.gremlin.cosmos.azure.com"
//! container_path = "/dbs/funding/colls/graph"
//! key = "..."
//!
//! [cypher]
//! url = "bolt://localhost:7687"
//! username = "neo4j"
//! password = "..."
//! ```
//!
//! Only the section of the selected backend is required. Blank values are
//! rejected by [`Config::validate`] before any connection is attempted.

use std::ops::Deref;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Which graph store family the repository talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Gremlin Server protocol over WebSocket (traversal text).
    Gremlin,
    /// Bolt protocol (Cypher pattern text).
    Cypher,
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendKind,
    #[serde(default)]
    pub gremlin: Option<GremlinConfig>,
    #[serde(default)]
    pub cypher: Option<CypherConfig>,
}

/// Gremlin endpoint and connection-pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GremlinConfig {
    /// Endpoint host name, without scheme.
    pub host: String,
    #[serde(default = "default_gremlin_port")]
    pub port: u16,
    /// Container path (e.g. `/dbs/<database>/colls/<graph>`), sent as the
    /// SASL user name.
    pub container_path: String,
    /// Access key, sent as the SASL password.
    pub key: String,
    #[serde(default = "default_true")]
    pub enable_ssl: bool,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_max_in_process")]
    pub max_in_process_per_connection: usize,
    #[serde(default = "default_reconnection_attempts")]
    pub reconnection_attempts: u32,
    #[serde(default = "default_reconnection_base_delay_ms")]
    pub reconnection_base_delay_ms: u64,
    #[serde(default = "default_keep_alive_interval_secs")]
    pub keep_alive_interval_secs: u64,
    /// Serializer mime type announced in every request frame.
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

/// Bolt endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CypherConfig {
    /// Bolt URL, e.g. `bolt://localhost:7687` or `neo4j+s://...`.
    pub url: String,
    pub username: String,
    pub password: String,
    /// Database name; the server default is used when absent.
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

fn default_gremlin_port() -> u16 {
    443
}

fn default_true() -> bool {
    true
}

fn default_pool_size() -> usize {
    4
}

fn default_max_in_process() -> usize {
    32
}

fn default_reconnection_attempts() -> u32 {
    3
}

fn default_reconnection_base_delay_ms() -> u64 {
    500
}

fn default_keep_alive_interval_secs() -> u64 {
    10
}

fn default_mime_type() -> String {
    "application/vnd.gremlin-v2.0+json".to_string()
}

fn default_max_connections() -> usize {
    16
}

fn default_fetch_size() -> usize {
    500
}

impl GremlinConfig {
    /// WebSocket URL of the Gremlin endpoint.
    pub fn endpoint(&self) -> String {
        let scheme = if self.enable_ssl { "wss" } else { "ws" };
        format!("{}://{}:{}/gremlin", scheme, self.host, self.port)
    }

    pub fn reconnection_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnection_base_delay_ms)
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_interval_secs)
    }

    fn validate(&self) -> Result<(), GraphError> {
        require("gremlin.host", &self.host)?;
        require("gremlin.container_path", &self.container_path)?;
        require("gremlin.key", &self.key)?;
        require("gremlin.mime_type", &self.mime_type)?;
        if self.pool_size == 0 {
            return Err(GraphError::missing_setting("gremlin.pool_size"));
        }
        if self.max_in_process_per_connection == 0 {
            return Err(GraphError::missing_setting(
                "gremlin.max_in_process_per_connection",
            ));
        }
        // the request frame stores its length in one byte
        if self.mime_type.len() > u8::MAX as usize {
            return Err(GraphError::missing_setting("gremlin.mime_type"));
        }
        Ok(())
    }
}

impl CypherConfig {
    fn validate(&self) -> Result<(), GraphError> {
        require("cypher.url", &self.url)?;
        require("cypher.username", &self.username)?;
        require("cypher.password", &self.password)?;
        if self.max_connections == 0 {
            return Err(GraphError::missing_setting("cypher.max_connections"));
        }
        Ok(())
    }
}

fn require(setting: &str, value: &str) -> Result<(), GraphError> {
    if value.trim().is_empty() {
        Err(GraphError::missing_setting(setting))
    } else {
        Ok(())
    }
}

impl Config {
    /// Load config with layered resolution (file → env) and validate it.
    pub fn load() -> Result<Self, GraphError> {
        Self::from_figment(Self::figment())
    }

    /// The default provider stack used by [`Config::load`].
    pub fn figment() -> Figment {
        Figment::new()
            // Layer 1: service config file (lowest priority)
            .merge(Toml::file("fundgraph.toml"))
            // Layer 2: environment variables (highest priority)
            .merge(Env::prefixed("FUNDGRAPH_").split("__"))
    }

    /// Extracts and validates a config from any figment.
    pub fn from_figment(figment: Figment) -> Result<Self, GraphError> {
        let config: Config = figment.extract().map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every setting the selected backend needs is present.
    pub fn validate(&self) -> Result<(), GraphError> {
        match self.backend {
            BackendKind::Gremlin => self
                .gremlin
                .as_ref()
                .ok_or_else(|| GraphError::missing_setting("gremlin"))?
                .validate(),
            BackendKind::Cypher => self
                .cypher
                .as_ref()
                .ok_or_else(|| GraphError::missing_setting("cypher"))?
                .validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn parse(toml: &str) -> Result<Config, GraphError> {
        Config::from_figment(Figment::new().merge(Toml::string(toml)))
    }

    #[test]
    fn test_gremlin_defaults() {
        let config = parse(
            r#"
            backend = "gremlin"
            [gremlin]
            host = "localhost"
            container_path = "/dbs/funding/colls/graph"
            key = "secret"
            "#,
        )
        .unwrap();

        let gremlin = config.gremlin.unwrap();
        assert_eq!(config.backend, BackendKind::Gremlin);
        assert_eq!(gremlin.port, 443);
        assert_eq!(gremlin.pool_size, 4);
        assert_eq!(gremlin.max_in_process_per_connection, 32);
        assert_eq!(gremlin.reconnection_attempts, 3);
        assert_eq!(gremlin.keep_alive_interval(), Duration::from_secs(10));
        assert_eq!(gremlin.endpoint(), "wss://localhost:443/gremlin");
    }

    #[test]
    fn test_gremlin_plain_endpoint() {
        let config = parse(
            r#"
            backend = "gremlin"
            [gremlin]
            host = "localhost"
            port = 8182
            enable_ssl = false
            container_path = "/dbs/funding/colls/graph"
            key = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.gremlin.unwrap().endpoint(),
            "ws://localhost:8182/gremlin"
        );
    }

    #[test]
    fn test_blank_key_is_rejected() {
        let err = parse(
            r#"
            backend = "gremlin"
            [gremlin]
            host = "localhost"
            container_path = "/dbs/funding/colls/graph"
            key = "  "
            "#,
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.to_string(), "Missing required setting: gremlin.key");
    }

    #[test]
    fn test_missing_section_for_selected_backend() {
        let err = parse(
            r#"
            backend = "cypher"
            [gremlin]
            host = "localhost"
            container_path = "/dbs/funding/colls/graph"
            key = "secret"
            "#,
        )
        .unwrap_err();

        assert!(matches!(err, GraphError::MissingSetting { ref setting } if setting == "cypher"));
    }

    #[test]
    fn test_cypher_requires_password() {
        let err = parse(
            r#"
            backend = "cypher"
            [cypher]
            url = "bolt://localhost:7687"
            username = "neo4j"
            password = ""
            "#,
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "Missing required setting: cypher.password");
    }

    #[test]
    fn test_cypher_defaults() {
        let config = parse(
            r#"
            backend = "cypher"
            [cypher]
            url = "bolt://localhost:7687"
            username = "neo4j"
            password = "password"
            "#,
        )
        .unwrap();

        let cypher = config.cypher.unwrap();
        assert_eq!(cypher.max_connections, 16);
        assert_eq!(cypher.fetch_size, 500);
        assert!(cypher.database.is_none());
    }

    #[test]
    fn test_unknown_backend_is_config_error() {
        let err = parse(r#"backend = "sparql""#).unwrap_err();
        assert!(matches!(err, GraphError::Config(_)));
    }
}
