//! SQL rendering for [`RelationQuery`].
//!
//! Values never get spliced into the SQL text. Every value (filter values, join values,
//! file path and format) becomes a placeholder plus an entry in `params`:
//!
//! - ClickHouse: back-quoted identifiers, `?` placeholders bound through
//!   `clickhouse::query::Query::bind`
//! - DataFusion: double-quoted identifiers, `$n` placeholders bound through
//!   `DataFrame::with_param_values`

use std::fmt;

use serde_json::Value;

use super::relation_query::{distinct_alias, Predicate, RelationQuery, ROW_MARKER};
use crate::relation_catalog::RelationSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    ClickHouse,
    DataFusion,
}

impl Dialect {
    pub fn quote_identifier(self, name: &str) -> String {
        match self {
            Dialect::ClickHouse => {
                format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
            }
            Dialect::DataFusion => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Placeholder for the parameter at 1-based `position`.
    fn placeholder(self, position: usize) -> String {
        match self {
            Dialect::ClickHouse => "?".to_string(),
            Dialect::DataFusion => format!("${}", position),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl SqlParam {
    /// Convert a JSON value into a bindable parameter. `None` for `null`; arrays and
    /// objects are bound as their JSON text.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(SqlParam::Bool(*b)),
            Value::Number(n) => Some(if let Some(i) = n.as_i64() {
                SqlParam::Int(i)
            } else if let Some(u) = n.as_u64() {
                SqlParam::UInt(u)
            } else {
                SqlParam::Float(n.as_f64().unwrap_or(f64::NAN))
            }),
            Value::String(s) => Some(SqlParam::Str(s.clone())),
            other => Some(SqlParam::Str(other.to_string())),
        }
    }
}

impl fmt::Display for SqlParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlParam::Int(v) => write!(f, "{}", v),
            SqlParam::UInt(v) => write!(f, "{}", v),
            SqlParam::Float(v) => write!(f, "{}", v),
            SqlParam::Bool(v) => write!(f, "{}", v),
            SqlParam::Str(v) => write!(f, "'{}'", v.replace('\\', "\\\\").replace('\'', "\\'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
    pub dialect: Dialect,
}

impl SqlQuery {
    /// SQL with parameters inlined, for log output only.
    pub fn display_inline(&self) -> String {
        let mut out = String::with_capacity(self.sql.len());
        match self.dialect {
            Dialect::ClickHouse => {
                let mut params = self.params.iter().peekable();
                for c in self.sql.chars() {
                    match (c, params.next_if(|_| c == '?')) {
                        (_, Some(p)) => out.push_str(&p.to_string()),
                        (c, None) => out.push(c),
                    }
                }
            }
            Dialect::DataFusion => {
                let mut chars = self.sql.chars().peekable();
                while let Some(c) = chars.next() {
                    if c != '$' {
                        out.push(c);
                        continue;
                    }
                    let mut digits = String::new();
                    while let Some(&d) = chars.peek() {
                        if !d.is_ascii_digit() {
                            break;
                        }
                        digits.push(d);
                        chars.next();
                    }
                    let param = digits
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| n.checked_sub(1))
                        .and_then(|i| self.params.get(i));
                    match param {
                        Some(p) => out.push_str(&p.to_string()),
                        None => {
                            out.push('$');
                            out.push_str(&digits);
                        }
                    }
                }
            }
        }
        out
    }
}

/// Accumulates bound parameters while a statement is rendered.
struct SqlWriter {
    dialect: Dialect,
    params: Vec<SqlParam>,
}

impl SqlWriter {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            params: Vec::new(),
        }
    }

    fn ident(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        self.dialect.placeholder(self.params.len())
    }

    fn finish(self, sql: String) -> SqlQuery {
        SqlQuery {
            sql,
            params: self.params,
            dialect: self.dialect,
        }
    }
}

pub fn quote_identifier(name: &str) -> String {
    Dialect::ClickHouse.quote_identifier(name)
}

/// The FROM target of a relation on ClickHouse.
fn clickhouse_source(writer: &mut SqlWriter, source: &RelationSource) -> String {
    match source {
        RelationSource::File { path, format, .. } => {
            let path = writer.bind(SqlParam::Str(path.to_string_lossy().into_owned()));
            let format = writer.bind(SqlParam::Str(format.clone()));
            format!("file({}, {})", path, format)
        }
        RelationSource::Table { table } => table
            .split('.')
            .map(|part| writer.ident(part))
            .collect::<Vec<_>>()
            .join("."),
    }
}

pub fn describe_sql(source: &RelationSource) -> SqlQuery {
    let mut writer = SqlWriter::new(Dialect::ClickHouse);
    let from = clickhouse_source(&mut writer, source);
    writer.finish(format!("DESCRIBE TABLE {}", from))
}

fn render_predicate(writer: &mut SqlWriter, predicate: &Predicate) -> String {
    let column = writer.ident(&predicate.column);
    match SqlParam::from_json(&predicate.value) {
        Some(param) => format!("{} = {}", column, writer.bind(param)),
        None => format!("{} IS NULL", column),
    }
}

fn render_select(mut writer: SqlWriter, query: &RelationQuery, from: String) -> SqlQuery {
    let mut select_items: Vec<String> = query.projection.iter().map(|c| writer.ident(c)).collect();
    for column in &query.distinct_counts {
        select_items.push(format!(
            "COUNT(DISTINCT {}) AS {}",
            writer.ident(column),
            writer.ident(&distinct_alias(column))
        ));
    }
    if select_items.is_empty() {
        // One row per matching row, or one row in total for an ungrouped aggregate
        let marker = if query.is_aggregate() { "COUNT(*)" } else { "1" };
        select_items.push(format!("{} AS {}", marker, writer.ident(ROW_MARKER)));
    }

    let mut sql = format!("SELECT {} FROM {}", select_items.join(", "), from);

    if !query.filters.is_empty() {
        let conditions: Vec<String> = query
            .filters
            .iter()
            .map(|p| render_predicate(&mut writer, p))
            .collect();
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    if query.is_aggregate() && !query.projection.is_empty() {
        let group_by: Vec<String> = query.projection.iter().map(|c| writer.ident(c)).collect();
        sql.push_str(" GROUP BY ");
        sql.push_str(&group_by.join(", "));
    }

    if let Some(window) = query.window {
        sql.push_str(&format!(" LIMIT {} OFFSET {}", window.limit, window.offset));
    }

    writer.finish(sql)
}

/// ClickHouse SQL reading straight from the query's source.
pub fn render(query: &RelationQuery) -> SqlQuery {
    let mut writer = SqlWriter::new(Dialect::ClickHouse);
    let from = clickhouse_source(&mut writer, &query.source);
    render_select(writer, query, from)
}

/// SQL over a table the engine has already registered under `table`.
pub fn render_from_table(query: &RelationQuery, dialect: Dialect, table: &str) -> SqlQuery {
    let writer = SqlWriter::new(dialect);
    let from = writer.ident(table);
    render_select(writer, query, from)
}
