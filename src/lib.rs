//! relgraph - GraphQL traversal layer over columnar relations
//!
//! Tabular relations (files or ClickHouse tables) are exposed as a graph-queryable API:
//! - Types derived from relation columns, with filter and distinct-count shapes
//! - Named edges between types with explicit or inferred join keys
//! - Per-edge query compilation with projection pushdown and `COUNT(DISTINCT)`
//! - A dynamic GraphQL schema served over HTTP

pub mod config;
pub mod graph_schema;
pub mod query_compiler;
pub mod relation_catalog;
pub mod schema_graph;
pub mod server;
