//! Edge traversal.
//!
//! Compiles one edge field of a request into a [`RelationQuery`], runs it and reshapes
//! the rows into nested records:
//!
//! 1. join key pairs become equality filters bound to the parent record's values
//! 2. non-null filter arguments become equality filters
//! 3. the projection is the requested leaves that exist as columns, plus the join
//!    columns needed by nested edges
//! 4. a requested `_distinct_` turns the query into a GROUP BY over the projection
//!    with one `COUNT(DISTINCT ..)` per requested count field, even when none is
//! 5. a positive `limit` windows the result
//!
//! Each traversal loads its own relation handle and keeps no state between calls.

use serde_json::Value;
use thiserror::Error;

use super::relation_query::{RelationQuery, DISTINCT_PREFIX, ROW_MARKER};
use super::selection::Selection;
use crate::graph_schema::{Edge, DISTINCT_FIELD};
use crate::relation_catalog::{CatalogError, EngineError, Record, RelationLoader};
use crate::schema_graph::SchemaGraph;

pub const DEFAULT_LIMIT: i64 = 100;
pub const DEFAULT_OFFSET: i64 = 0;

#[derive(Debug, Error)]
pub enum TraversalError {
    #[error("Unknown type `{type_name}`")]
    UnknownType { type_name: String },
    #[error("Edge `{edge}`: parent record has no value for join column `{column}`")]
    MissingJoinValue { edge: String, column: String },
    #[error("Failed to read relation `{relation}`: {source}")]
    Fetch {
        relation: String,
        #[source]
        source: EngineError,
    },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Arguments of one edge field invocation.
#[derive(Debug, Clone)]
pub struct EdgeTraversal<'a> {
    pub parent: &'a Record,
    /// Selection set under the edge field
    pub selection: &'a Selection,
    /// Column -> value equality filters; `null` values are skipped
    pub filter: Record,
    pub limit: i64,
    pub offset: i64,
}

impl<'a> EdgeTraversal<'a> {
    pub fn new(parent: &'a Record, selection: &'a Selection) -> Self {
        Self {
            parent,
            selection,
            filter: Record::new(),
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }

    pub fn with_filter(mut self, filter: Record) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_window(mut self, limit: i64, offset: i64) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}

pub struct EdgeResolver<'a> {
    graph: &'a SchemaGraph,
    loader: &'a RelationLoader,
}

impl<'a> EdgeResolver<'a> {
    pub fn new(graph: &'a SchemaGraph, loader: &'a RelationLoader) -> Self {
        Self { graph, loader }
    }

    /// Build the query for one traversal. `Ok(None)` means the parent's join value is
    /// null, which matches no rows.
    pub async fn compile(
        &self,
        edge: &Edge,
        traversal: &EdgeTraversal<'_>,
    ) -> Result<Option<RelationQuery>, TraversalError> {
        let target = self
            .graph
            .type_def(&edge.target)
            .ok_or_else(|| TraversalError::UnknownType {
                type_name: edge.target.clone(),
            })?;

        let mut join_values = Vec::with_capacity(edge.join_key.len());
        for (source_column, target_column) in edge.join_key.pairs() {
            match traversal.parent.get(source_column) {
                None => {
                    return Err(TraversalError::MissingJoinValue {
                        edge: format!("{}.{}", edge.source, edge.field),
                        column: source_column.clone(),
                    })
                }
                Some(Value::Null) => {
                    log::debug!(
                        "{}.{}: null join value for `{}`, nothing to fetch",
                        edge.source,
                        edge.field,
                        source_column
                    );
                    return Ok(None);
                }
                Some(value) => join_values.push((target_column.clone(), value.clone())),
            }
        }

        let relation = self.loader.load(&target.relation).await?;
        let mut query = relation.query();

        for (column, value) in join_values {
            query = query.filter_eq(column, value);
        }
        for (column, value) in &traversal.filter {
            if !value.is_null() {
                query = query.filter_eq(column.clone(), value.clone());
            }
        }

        let mut projection: Vec<String> = Vec::new();
        let mut push_column = |name: &str| {
            if relation.has_column(name) && !projection.iter().any(|p| p == name) {
                projection.push(name.to_string());
            }
        };
        for name in traversal.selection.field_names() {
            match self.graph.edge(&target.name, name) {
                Some(nested) => nested.join_key.source_columns().for_each(&mut push_column),
                None => push_column(name),
            }
        }

        let counts: Vec<String> = traversal
            .selection
            .field_names_of(DISTINCT_FIELD)
            .into_iter()
            .filter(|name| relation.has_column(name))
            .map(str::to_string)
            .collect();

        query = if traversal.selection.child(DISTINCT_FIELD).is_some() {
            query.aggregate_distinct(projection, counts)
        } else {
            query.select(projection)
        };

        Ok(Some(query.limit(traversal.limit, traversal.offset)))
    }

    pub async fn resolve(
        &self,
        edge: &Edge,
        traversal: &EdgeTraversal<'_>,
    ) -> Result<Vec<Record>, TraversalError> {
        let query = match self.compile(edge, traversal).await? {
            Some(query) => query,
            None => return Ok(Vec::new()),
        };

        let rows = self
            .loader
            .fetch(&query)
            .await
            .map_err(|source| TraversalError::Fetch {
                relation: query.relation.clone(),
                source,
            })?;
        log::debug!(
            "{}.{} -> {}: {} row(s)",
            edge.source,
            edge.field,
            edge.target,
            rows.len()
        );
        let grouped = query.is_aggregate();
        Ok(rows.into_iter().map(|row| reshape(row, grouped)).collect())
    }
}

/// Move `_distinct___<f>` columns into a nested `_distinct_` record keyed by `<f>`
/// and drop the row marker. Only grouped rows carry a `_distinct_` key.
pub fn reshape(record: Record, grouped: bool) -> Record {
    let mut out = Record::new();
    let mut counts = Record::new();
    for (key, value) in record {
        if key == ROW_MARKER {
            continue;
        }
        match key.strip_prefix(DISTINCT_PREFIX) {
            Some(field) => {
                counts.insert(field.to_string(), value);
            }
            None => {
                out.insert(key, value);
            }
        }
    }
    if grouped || !counts.is_empty() {
        out.insert(DISTINCT_FIELD.to_string(), Value::Object(counts));
    }
    out
}
