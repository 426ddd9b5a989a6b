//! Relation loading.
//!
//! Given a logical name, the loader looks the relation up in the catalog, asks the
//! engine for its columns and hands back a [`Relation`] handle. Queries built from that
//! handle are executed by the same engine. Each call to [`RelationLoader::load`]
//! produces a fresh handle. Engines may keep their own registration of a source
//! between calls, never rows.

use std::sync::Arc;

use async_trait::async_trait;

use crate::query_compiler::relation_query::RelationQuery;

pub mod catalog;
pub mod clickhouse_engine;
pub mod column_info;
pub mod connection_pool;
pub mod datafusion_engine;
pub mod errors;

pub use catalog::{clean_column_name, RelationCatalog, RelationSource};
pub use clickhouse_engine::ClickHouseEngine;
pub use column_info::ColumnInfo;
pub use datafusion_engine::DataFusionEngine;
pub use errors::{CatalogError, EngineError};

/// One materialized row, keyed by column name in column order.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// An analytical engine able to describe and read relations.
///
/// Implementations must allow concurrent calls from independent traversals.
#[async_trait]
pub trait RelationEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Ordered (name, storage type) pairs of a relation.
    async fn describe(&self, source: &RelationSource) -> Result<Vec<ColumnInfo>, EngineError>;

    /// Execute a plan and materialize every resulting row.
    async fn fetch(&self, query: &RelationQuery) -> Result<Vec<Record>, EngineError>;
}

/// Read-only handle on a described relation.
#[derive(Debug, Clone)]
pub struct Relation {
    name: String,
    source: RelationSource,
    columns: Vec<ColumnInfo>,
}

impl Relation {
    pub fn new(name: impl Into<String>, source: RelationSource, columns: Vec<ColumnInfo>) -> Self {
        Self {
            name: name.into(),
            source,
            columns,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &RelationSource {
        &self.source
    }

    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Start a plan over this relation: all rows, nothing projected yet.
    pub fn query(&self) -> RelationQuery {
        RelationQuery::new(self.name.clone(), self.source.clone())
    }
}

/// Catalog + engine pair shared by registration and every traversal.
#[derive(Clone)]
pub struct RelationLoader {
    catalog: Arc<RelationCatalog>,
    engine: Arc<dyn RelationEngine>,
}

impl RelationLoader {
    pub fn new(catalog: RelationCatalog, engine: Arc<dyn RelationEngine>) -> Self {
        Self {
            catalog: Arc::new(catalog),
            engine,
        }
    }

    pub fn catalog(&self) -> &RelationCatalog {
        &self.catalog
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub async fn load(&self, logical_name: &str) -> Result<Relation, CatalogError> {
        let source = self.catalog.get(logical_name)?;
        let columns = self
            .engine
            .describe(source)
            .await
            .map_err(|e| CatalogError::load(logical_name, e))?;
        log::debug!(
            "Loaded relation {} from {} with {} columns",
            logical_name,
            source.describe(),
            columns.len()
        );
        Ok(Relation::new(logical_name, source.clone(), columns))
    }

    pub async fn fetch(&self, query: &RelationQuery) -> Result<Vec<Record>, EngineError> {
        self.engine.fetch(query).await
    }
}

impl std::fmt::Debug for RelationLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationLoader")
            .field("catalog", &self.catalog)
            .field("engine", &self.engine.name())
            .finish()
    }
}
