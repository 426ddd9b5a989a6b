//! # Relation Loader Error Types
//!
//! - **Catalog errors**: a logical relation name that the catalog does not know, or a
//!   catalog file that cannot be read. These are configuration errors and are fatal at
//!   registration time.
//! - **Engine errors**: anything that goes wrong once a query reaches the engine
//!   (connection, bad SQL, undecodable rows, unreadable source files).

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("No relation named `{name}` in the catalog")]
    UnknownRelation { name: String },
    #[error("Failed to load relation `{name}`: {source}")]
    Load {
        name: String,
        #[source]
        source: EngineError,
    },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Query failed: {message}\n  SQL: {sql}")]
    Query { sql: String, message: String },
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to decode engine response: {message}")]
    Decode { message: String },
    #[error("Unknown table `{table}`")]
    UnknownTable { table: String },
    #[error("Unknown column `{column}` in relation `{relation}`")]
    UnknownColumn { relation: String, column: String },
    #[error("Unsupported by the {engine} engine: {message}")]
    Unsupported { engine: &'static str, message: String },
}

impl CatalogError {
    pub fn load(name: impl Into<String>, source: EngineError) -> Self {
        CatalogError::Load {
            name: name.into(),
            source,
        }
    }
}
