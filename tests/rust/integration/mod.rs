//! Integration tests - full registration, GraphQL execution and HTTP routes
//!
//! Relations are JSONEachRow files in a temporary directory, served by the embedded
//! DataFusion engine, so no ClickHouse instance is required.

mod fixtures;
mod graphql_traversal_tests;
mod server_tests;
