//! Embedded relation engine on Apache DataFusion
//!
//! Runs the same rendered SQL as the ClickHouse engine, in process:
//!
//! - `Parquet`, `JSONEachRow` and `CSVWithNames` files are registered as listing
//!   tables the first time a source is seen. Describe calls reuse the registration;
//!   each fetch scans the file once.
//! - tables registered up front with [`DataFusionEngine::with_table`]
//!
//! Arrow types are reported with ClickHouse storage type names (`Int64`,
//! `Nullable(String)`, ...) so both engines feed the same scalar mapping.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use datafusion::arrow::datatypes::{DataType, Schema, SchemaRef};
use datafusion::arrow::error::ArrowError;
use datafusion::arrow::json::reader::infer_json_schema_from_iterator;
use datafusion::arrow::json::writer::LineDelimited;
use datafusion::arrow::json::{ReaderBuilder, WriterBuilder};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::catalog::memory::MemTable;
use datafusion::common::{Column, ScalarValue, TableReference};
use datafusion::error::DataFusionError;
use datafusion::logical_expr::Expr;
use datafusion::prelude::{
    CsvReadOptions, NdJsonReadOptions, ParquetReadOptions, SessionConfig, SessionContext,
};
use serde_json::Value;
use tokio::sync::Mutex;

use super::catalog::clean_column_name;
use super::column_info::ColumnInfo;
use super::errors::EngineError;
use super::{Record, RelationEngine, RelationSource};
use crate::query_compiler::relation_query::RelationQuery;
use crate::query_compiler::to_sql::{self, Dialect, SqlParam};

const ENGINE_NAME: &str = "datafusion";

pub struct DataFusionEngine {
    ctx: SessionContext,
    /// File source -> name of the table it is registered under
    registered: Mutex<HashMap<RelationSource, String>>,
}

impl Default for DataFusionEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DataFusionEngine {
    pub fn new() -> Self {
        // One partition keeps scan order, so LIMIT/OFFSET windows page deterministically
        let mut config = SessionConfig::new().with_target_partitions(1);
        config.options_mut().execution.parquet.schema_force_view_types = false;
        Self {
            ctx: SessionContext::new_with_config(config),
            registered: Mutex::new(HashMap::new()),
        }
    }

    /// Register rows under a table name, addressable as `RelationSource::Table`.
    /// Column types are inferred from the values.
    pub fn with_table(self, name: &str, rows: Vec<Record>) -> Result<Self, EngineError> {
        let schema = infer_json_schema_from_iterator(
            rows.iter()
                .map(|row| Ok::<_, ArrowError>(Value::Object(row.clone()))),
        )
        .map_err(decode_error)?;
        let schema: SchemaRef = Arc::new(schema);

        let mut decoder = ReaderBuilder::new(schema.clone())
            .with_batch_size(rows.len().max(1))
            .build_decoder()
            .map_err(decode_error)?;
        decoder.serialize(&rows).map_err(decode_error)?;
        let batch = decoder
            .flush()
            .map_err(decode_error)?
            .unwrap_or_else(|| RecordBatch::new_empty(schema.clone()));

        let table = MemTable::try_new(schema, vec![vec![batch]])
            .map_err(|e| register_error(name, e))?;
        self.ctx
            .register_table(TableReference::bare(name), Arc::new(table))
            .map_err(|e| register_error(name, e))?;
        Ok(self)
    }

    /// Name of the table holding `source`, registering file sources on first use.
    async fn table_for(&self, source: &RelationSource) -> Result<String, EngineError> {
        match source {
            RelationSource::Table { table } => {
                let exists = self
                    .ctx
                    .table_exist(TableReference::bare(table.as_str()))
                    .map_err(|e| register_error(table, e))?;
                if exists {
                    Ok(table.clone())
                } else {
                    Err(EngineError::UnknownTable {
                        table: table.clone(),
                    })
                }
            }
            RelationSource::File {
                path,
                format,
                normalize_columns,
            } => {
                let mut registered = self.registered.lock().await;
                if let Some(name) = registered.get(source) {
                    return Ok(name.clone());
                }

                ensure_readable(path).await?;
                let name = format!("relation_{}", registered.len());
                let raw = if *normalize_columns {
                    format!("{}_raw", name)
                } else {
                    name.clone()
                };
                self.register_file(&raw, path, format).await?;
                if *normalize_columns {
                    self.register_normalized(&name, &raw).await?;
                }
                log::debug!("Registered {} as {}", source.describe(), name);

                registered.insert(source.clone(), name.clone());
                Ok(name)
            }
        }
    }

    async fn register_file(&self, name: &str, path: &Path, format: &str) -> Result<(), EngineError> {
        let location = path.to_string_lossy();
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        let registered = match format {
            "Parquet" => {
                let options = ParquetReadOptions {
                    file_extension: &extension,
                    ..Default::default()
                };
                self.ctx.register_parquet(name, &location, options).await
            }
            "JSONEachRow" | "JSONLines" | "NDJSON" => {
                let options = NdJsonReadOptions::default().file_extension(&extension);
                self.ctx.register_json(name, &location, options).await
            }
            "CSVWithNames" | "CSV" => {
                let options = CsvReadOptions::new()
                    .has_header(format == "CSVWithNames")
                    .file_extension(&extension);
                self.ctx.register_csv(name, &location, options).await
            }
            other => {
                return Err(EngineError::Unsupported {
                    engine: ENGINE_NAME,
                    message: format!("input format '{}' for {}", other, path.display()),
                })
            }
        };
        registered.map_err(|e| register_error(&location, e))
    }

    /// Expose `raw` under `name` with every column renamed by [`clean_column_name`].
    async fn register_normalized(&self, name: &str, raw: &str) -> Result<(), EngineError> {
        let frame = self
            .ctx
            .table(TableReference::bare(raw))
            .await
            .map_err(|e| register_error(raw, e))?;
        let renamed: Vec<Expr> = frame
            .schema()
            .fields()
            .iter()
            .map(|field| {
                Expr::Column(Column::from_name(field.name().as_str()))
                    .alias(clean_column_name(field.name()))
            })
            .collect();
        let view = frame
            .select(renamed)
            .map_err(|e| register_error(raw, e))?
            .into_view();
        self.ctx
            .register_table(TableReference::bare(name), view)
            .map_err(|e| register_error(name, e))?;
        Ok(())
    }

    async fn schema_of(&self, table: &str) -> Result<SchemaRef, EngineError> {
        let provider = self
            .ctx
            .table_provider(TableReference::bare(table))
            .await
            .map_err(|e| register_error(table, e))?;
        Ok(provider.schema())
    }

    #[cfg(test)]
    async fn registered_count(&self) -> usize {
        self.registered.lock().await.len()
    }
}

#[async_trait]
impl RelationEngine for DataFusionEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    async fn describe(&self, source: &RelationSource) -> Result<Vec<ColumnInfo>, EngineError> {
        let table = self.table_for(source).await?;
        let schema = self.schema_of(&table).await?;
        Ok(schema
            .fields()
            .iter()
            .map(|field| {
                let storage_type = storage_type(field.data_type());
                let storage_type = if field.is_nullable() {
                    format!("Nullable({})", storage_type)
                } else {
                    storage_type
                };
                ColumnInfo::new(field.name().as_str(), storage_type)
            })
            .collect())
    }

    async fn fetch(&self, query: &RelationQuery) -> Result<Vec<Record>, EngineError> {
        let table = self.table_for(&query.source).await?;
        if let RelationSource::File { path, .. } = &query.source {
            ensure_readable(path).await?;
        }
        let schema = self.schema_of(&table).await?;
        if let Some(column) = query
            .referenced_columns()
            .find(|c| schema.field_with_name(c).is_err())
        {
            return Err(EngineError::UnknownColumn {
                relation: query.relation.clone(),
                column: column.to_string(),
            });
        }

        let sql = to_sql::render_from_table(query, Dialect::DataFusion, &table);
        log::debug!("{}: {}", query.relation, sql.display_inline());
        let query_error = |e: DataFusionError| EngineError::Query {
            sql: sql.display_inline(),
            message: e.to_string(),
        };

        // Params bind in filter order, skipping null filters
        let bound_columns = query
            .filters
            .iter()
            .filter(|p| !p.value.is_null())
            .map(|p| p.column.as_str());
        let params = sql
            .params
            .iter()
            .zip(bound_columns)
            .map(|(param, column)| {
                let target = schema
                    .field_with_name(column)
                    .map(|f| f.data_type().clone())
                    .map_err(|e| query_error(e.into()))?;
                scalar_value(param).cast_to(&target).map_err(query_error)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let batches = self
            .ctx
            .sql(&sql.sql)
            .await
            .map_err(query_error)?
            .with_param_values(params)
            .map_err(query_error)?
            .collect()
            .await
            .map_err(query_error)?;

        decode_batches(&batches)
    }
}

async fn ensure_readable(path: &Path) -> Result<(), EngineError> {
    tokio::fs::metadata(path)
        .await
        .map(|_| ())
        .map_err(|e| EngineError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}

fn register_error(location: &str, err: DataFusionError) -> EngineError {
    EngineError::Query {
        sql: format!("register {}", location),
        message: err.to_string(),
    }
}

fn decode_error(err: ArrowError) -> EngineError {
    EngineError::Decode {
        message: err.to_string(),
    }
}

fn scalar_value(param: &SqlParam) -> ScalarValue {
    match param {
        SqlParam::Int(v) => ScalarValue::Int64(Some(*v)),
        SqlParam::UInt(v) => ScalarValue::UInt64(Some(*v)),
        SqlParam::Float(v) => ScalarValue::Float64(Some(*v)),
        SqlParam::Bool(v) => ScalarValue::Boolean(Some(*v)),
        SqlParam::Str(v) => ScalarValue::Utf8(Some(v.clone())),
    }
}

/// ClickHouse name for an Arrow type, without the `Nullable(..)` wrapper.
pub fn storage_type(data_type: &DataType) -> String {
    match data_type {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64
        | DataType::Float32
        | DataType::Float64 => data_type.to_string(),
        DataType::Float16 => "Float32".to_string(),
        DataType::Boolean => "Bool".to_string(),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => "String".to_string(),
        DataType::Null => "Nothing".to_string(),
        DataType::Decimal128(precision, scale) | DataType::Decimal256(precision, scale) => {
            format!("Decimal({}, {})", precision, scale)
        }
        DataType::Date32 | DataType::Date64 => "Date".to_string(),
        DataType::Timestamp(_, _) => "DateTime64".to_string(),
        DataType::Dictionary(_, value) => storage_type(value),
        DataType::List(_)
        | DataType::LargeList(_)
        | DataType::FixedSizeList(_, _)
        | DataType::Struct(_)
        | DataType::Map(_, _) => "Object('json')".to_string(),
        _ => "String".to_string(),
    }
}

fn is_float(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Float16 | DataType::Float32 | DataType::Float64
    )
}

fn decode_batches(batches: &[RecordBatch]) -> Result<Vec<Record>, EngineError> {
    let Some(first) = batches.first() else {
        return Ok(Vec::new());
    };
    let schema: Arc<Schema> = first.schema();

    let mut writer = WriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, LineDelimited>(Vec::new());
    let refs: Vec<&RecordBatch> = batches.iter().collect();
    writer.write_batches(&refs).map_err(decode_error)?;
    writer.finish().map_err(decode_error)?;
    let output = writer.into_inner();

    let text = String::from_utf8(output).map_err(|e| EngineError::Decode {
        message: e.to_string(),
    })?;
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let mut record: Record =
                serde_json::from_str(line).map_err(|e| EngineError::Decode {
                    message: format!("invalid row '{}': {}", line, e),
                })?;
            // Whole floats must stay floats (`4.0`, not `4`)
            for field in schema.fields().iter().filter(|f| is_float(f.data_type())) {
                if let Some(cell) = record.get_mut(field.name().as_str()) {
                    if let Some(n) = cell.as_f64() {
                        *cell = Value::from(n);
                    }
                }
            }
            Ok(record)
        })
        .collect()
}
