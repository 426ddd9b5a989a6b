//! Query compilation: from an edge traversal request to a relation plan, SQL and
//! nested result records.

pub mod relation_query;
pub mod resolver;
pub mod selection;
pub mod to_sql;

pub use relation_query::{RelationQuery, DISTINCT_PREFIX, ROW_MARKER};
pub use resolver::{EdgeResolver, EdgeTraversal, TraversalError, DEFAULT_LIMIT, DEFAULT_OFFSET};
pub use selection::Selection;
pub use to_sql::{Dialect, SqlParam, SqlQuery};
