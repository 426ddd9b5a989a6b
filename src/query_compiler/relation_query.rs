//! Logical plan for a single relation read.
//!
//! A `RelationQuery` is what one edge traversal compiles to: equality filters, a
//! column projection, an optional distinct-count aggregation and an optional window.
//! Engines render it to SQL in their dialect (`to_sql`).

use serde_json::Value;

use crate::relation_catalog::RelationSource;

/// Alias prefix of aggregated distinct-count columns (`_distinct___<field>`).
pub const DISTINCT_PREFIX: &str = "_distinct___";

/// Helper column selected when nothing else is, so one record per row comes back.
pub const ROW_MARKER: &str = "__row";

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub limit: u64,
    pub offset: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationQuery {
    /// Logical relation name, for diagnostics
    pub relation: String,
    pub source: RelationSource,
    pub filters: Vec<Predicate>,
    pub projection: Vec<String>,
    /// Group by `projection`, one row per group
    pub aggregate: bool,
    /// Columns to count distinct values of within each group
    pub distinct_counts: Vec<String>,
    pub window: Option<Window>,
}

impl RelationQuery {
    pub fn new(relation: impl Into<String>, source: RelationSource) -> Self {
        Self {
            relation: relation.into(),
            source,
            filters: Vec::new(),
            projection: Vec::new(),
            aggregate: false,
            distinct_counts: Vec::new(),
            window: None,
        }
    }

    /// Restrict to rows where `column == value`.
    pub fn filter_eq(mut self, column: impl Into<String>, value: Value) -> Self {
        self.filters.push(Predicate {
            column: column.into(),
            value,
        });
        self
    }

    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Group by `group_by` and count distinct values of each of `counts`. An empty
    /// `counts` still groups.
    pub fn aggregate_distinct<G, C, S, T>(mut self, group_by: G, counts: C) -> Self
    where
        G: IntoIterator<Item = S>,
        C: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        self.projection = group_by.into_iter().map(Into::into).collect();
        self.aggregate = true;
        self.distinct_counts = counts.into_iter().map(Into::into).collect();
        self
    }

    /// Apply `LIMIT limit OFFSET offset`. A non-positive limit means "all rows" and
    /// leaves the query unwindowed; a negative offset counts as zero.
    pub fn limit(mut self, limit: i64, offset: i64) -> Self {
        self.window = if limit > 0 {
            Some(Window {
                limit: limit as u64,
                offset: offset.max(0) as u64,
            })
        } else {
            None
        };
        self
    }

    pub fn is_aggregate(&self) -> bool {
        self.aggregate
    }

    /// Every column the query touches, for validating against the relation.
    pub fn referenced_columns(&self) -> impl Iterator<Item = &str> {
        self.filters
            .iter()
            .map(|p| p.column.as_str())
            .chain(self.projection.iter().map(String::as_str))
            .chain(self.distinct_counts.iter().map(String::as_str))
    }
}

pub fn distinct_alias(column: &str) -> String {
    format!("{}{}", DISTINCT_PREFIX, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invoices() -> RelationQuery {
        RelationQuery::new("Invoice", RelationSource::table("invoices"))
    }

    #[test]
    fn test_non_positive_limit_is_unbounded() {
        assert_eq!(invoices().limit(0, 10).window, None);
        assert_eq!(invoices().limit(-1, 0).window, None);
        assert_eq!(
            invoices().limit(5, 10).window,
            Some(Window {
                limit: 5,
                offset: 10
            })
        );
        assert_eq!(
            invoices().limit(5, -3).window,
            Some(Window {
                limit: 5,
                offset: 0
            })
        );
    }

    #[test]
    fn test_aggregate_replaces_projection() {
        let query = invoices()
            .select(["id", "amount"])
            .aggregate_distinct(["customer_id"], ["id"]);
        assert!(query.is_aggregate());
        assert_eq!(query.projection, vec!["customer_id"]);
        assert_eq!(query.distinct_counts, vec!["id"]);
    }

    #[test]
    fn test_grouping_without_counts_is_still_an_aggregate() {
        let query = invoices().aggregate_distinct(["status"], Vec::<String>::new());
        assert!(query.is_aggregate());
        assert!(query.distinct_counts.is_empty());
        assert!(!invoices().select(["status"]).is_aggregate());
    }

    #[test]
    fn test_referenced_columns() {
        let query = invoices()
            .filter_eq("customer_id", json!(7))
            .aggregate_distinct(["region"], ["id"]);
        let columns: Vec<&str> = query.referenced_columns().collect();
        assert_eq!(columns, vec!["customer_id", "region", "id"]);
        assert_eq!(distinct_alias("id"), "_distinct___id");
    }
}
