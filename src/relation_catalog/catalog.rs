//! Logical relation catalog.
//!
//! Maps a logical relation name (`Customer`, `Invoice`, ...) to where its rows live:
//!
//! ```yaml
//! catalog:
//!   Customer:
//!     path: data/customer.parquet   # read through ClickHouse's file() table function
//!     format: Parquet
//!   Invoice:
//!     table: sales.invoices         # existing table
//! ```
//!
//! Relative file paths are resolved against the directory of the configuration file
//! that declared them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::CatalogError;

fn default_format() -> String {
    "Parquet".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationSource {
    /// A file read through the engine (`file(path, format)` on ClickHouse, a listing
    /// table on DataFusion)
    File {
        path: PathBuf,
        #[serde(default = "default_format")]
        format: String,
        /// Rename columns with [`clean_column_name`] while loading
        #[serde(default)]
        normalize_columns: bool,
    },
    /// An existing table, optionally qualified as `database.table`
    Table { table: String },
}

impl RelationSource {
    pub fn file(path: impl Into<PathBuf>, format: impl Into<String>) -> Self {
        RelationSource::File {
            path: path.into(),
            format: format.into(),
            normalize_columns: false,
        }
    }

    pub fn table(table: impl Into<String>) -> Self {
        RelationSource::Table {
            table: table.into(),
        }
    }

    /// Short human-readable description used in log lines
    pub fn describe(&self) -> String {
        match self {
            RelationSource::File { path, format, .. } => {
                format!("file({}, {})", path.display(), format)
            }
            RelationSource::Table { table } => table.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationCatalog {
    entries: BTreeMap<String, RelationSource>,
}

impl RelationCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_relation(mut self, name: impl Into<String>, source: RelationSource) -> Self {
        self.insert(name, source);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, source: RelationSource) {
        self.entries.insert(name.into(), source);
    }

    pub fn get(&self, name: &str) -> Result<&RelationSource, CatalogError> {
        self.entries
            .get(name)
            .ok_or_else(|| CatalogError::UnknownRelation {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Make relative file paths absolute with respect to `base_dir`.
    pub fn resolve_relative_to(&mut self, base_dir: &Path) {
        for source in self.entries.values_mut() {
            if let RelationSource::File { path, .. } = source {
                if path.is_relative() {
                    *path = base_dir.join(&*path);
                }
            }
        }
    }
}

/// Lowercase a column name, collapse runs of non-word characters into `_` and trim
/// leading/trailing underscores: `"Invoice Date"` -> `"invoice_date"`.
pub fn clean_column_name(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() || c == '_' {
            cleaned.push(c);
            in_separator = false;
        } else if !in_separator {
            cleaned.push('_');
            in_separator = true;
        }
    }
    cleaned.trim_matches('_').to_string()
}
