//! Data access layer over the graph backends.
//!
//! [`GraphRepository`] is the public persistence contract: it turns typed
//! calls into compiled queries and rebuilds typed results.

mod graph;

pub use graph::GraphRepository;
