//! ClickHouse-backed relation engine.
//!
//! Relations are read either from files through the `file()` table function or from
//! existing tables. Rows come back as `JSONEachRow` and are decoded into [`Record`]s.

use async_trait::async_trait;
use clickhouse::query::Query;
use tokio::io::AsyncBufReadExt;

use super::column_info::{parse_describe_row, ColumnInfo};
use super::connection_pool::ConnectionPool;
use super::errors::EngineError;
use super::{Record, RelationEngine, RelationSource};
use crate::query_compiler::relation_query::RelationQuery;
use crate::query_compiler::to_sql::{self, SqlParam, SqlQuery};

const ENGINE_NAME: &str = "clickhouse";

pub struct ClickHouseEngine {
    pool: ConnectionPool,
}

impl ClickHouseEngine {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub fn from_env() -> Result<Self, EngineError> {
        Ok(Self::new(ConnectionPool::from_env()?))
    }

    fn check_source(source: &RelationSource) -> Result<(), EngineError> {
        match source {
            RelationSource::File {
                normalize_columns: true,
                path,
                ..
            } => Err(EngineError::Unsupported {
                engine: ENGINE_NAME,
                message: format!(
                    "normalize_columns on '{}'; rename the columns at ingest instead",
                    path.display()
                ),
            }),
            _ => Ok(()),
        }
    }

    /// Statement with every parameter bound, on the next pooled client.
    fn prepare(&self, query: &SqlQuery) -> Query {
        bind_params(self.pool.get_client().query(&query.sql), &query.params)
    }

    /// Run a statement and return its `JSONEachRow` output line by line.
    async fn fetch_lines(&self, query: &SqlQuery) -> Result<Vec<String>, EngineError> {
        log::debug!("Executing SQL:\n{}", query.display_inline());

        let mut lines = self
            .prepare(query)
            .fetch_bytes("JSONEachRow")
            .map_err(|e| {
                // Log full SQL on error for debugging
                log::error!(
                    "ClickHouse query failed. SQL was:\n{}\nError: {}",
                    query.display_inline(),
                    e
                );
                EngineError::Query {
                    sql: query.display_inline(),
                    message: e.to_string(),
                }
            })?
            .lines();

        let mut rows = Vec::new();
        while let Some(line) = lines.next_line().await.map_err(|e| EngineError::Query {
            sql: query.display_inline(),
            message: e.to_string(),
        })? {
            if !line.trim().is_empty() {
                rows.push(line);
            }
        }
        Ok(rows)
    }
}

fn bind_params(mut query: Query, params: &[SqlParam]) -> Query {
    for param in params {
        query = match param {
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::UInt(v) => query.bind(*v),
            SqlParam::Float(v) => query.bind(*v),
            SqlParam::Bool(v) => query.bind(*v),
            SqlParam::Str(v) => query.bind(v.as_str()),
        };
    }
    query
}

#[async_trait]
impl RelationEngine for ClickHouseEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    async fn describe(&self, source: &RelationSource) -> Result<Vec<ColumnInfo>, EngineError> {
        Self::check_source(source)?;
        self.fetch_lines(&to_sql::describe_sql(source))
            .await?
            .iter()
            .map(|line| parse_describe_row(line))
            .collect()
    }

    async fn fetch(&self, query: &RelationQuery) -> Result<Vec<Record>, EngineError> {
        Self::check_source(&query.source)?;
        let sql = to_sql::render(query);
        let lines = self.fetch_lines(&sql).await?;

        let mut rows = Vec::with_capacity(lines.len());
        for line in lines {
            let record: Record = serde_json::from_str(&line).map_err(|e| EngineError::Decode {
                message: format!("row of {} is not a JSON object: {}", query.relation, e),
            })?;
            rows.push(record);
        }
        log::debug!("{} row(s) from {}", rows.len(), query.relation);
        Ok(rows)
    }
}
