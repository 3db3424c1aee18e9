//! Graph abstraction layer for backend-agnostic persistence.
//!
//! The same repository code runs against a Gremlin store or a Cypher store.
//! Work flows through three seams:
//!
//! - [`QueryCompiler`] - Renders a logical operation as backend query text
//! - [`QueryExecutor`] - Sends a [`CompiledQuery`] and streams raw [`Row`]s
//! - [`transform`] - Rebuilds typed entities from the rows
//!
//! [`GraphBackend`] ties an executor to the compiler for its language, and
//! [`Backend`] picks one from configuration.
//!
//! # Usage
//!
//! ```ignore
//! use fundgraph::graph::{Backend, GraphBackend, NodeMatch, QueryExecutor};
//! use fundgraph::models::Field;
//!
//! let backend = Backend::connect(&config).await?;
//! let field = Field::new("id", "P1");
//! let query = backend
//!     .compiler()
//!     .all_entities(&NodeMatch::new("model", &field), &[])?;
//! let rows = backend.fetch_all(query).await?;
//! ```

mod element;
mod query;
mod row;
mod traits;

pub mod backends;
pub mod compiler;
pub mod transform;

pub use backends::{Backend, CypherBackend, GremlinBackend};
pub use compiler::{CypherCompiler, DeleteTarget, GremlinCompiler, NodeMatch, QueryCompiler};
pub use element::GraphElement;
pub use query::CompiledQuery;
pub use row::{Params, Row, RowStream};
pub use traits::{GraphBackend, QueryExecutor};
pub use transform::{transform, Selection};
