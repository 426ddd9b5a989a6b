//! Relation column metadata
//!
//! Column descriptions come back from `DESCRIBE TABLE` (ClickHouse) or from the Arrow
//! schema of a registered table (DataFusion). Either way the order is the column
//! order of the source relation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::EngineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Parse one `DESCRIBE TABLE ... FORMAT JSONEachRow` line.
///
/// ClickHouse returns more keys than we need (`default_type`, `comment`, ...);
/// only `name` and `type` are kept.
pub fn parse_describe_row(line: &str) -> Result<ColumnInfo, EngineError> {
    let value: Value = serde_json::from_str(line).map_err(|e| EngineError::Decode {
        message: format!("invalid DESCRIBE row '{}': {}", line, e),
    })?;

    let name = value.get("name").and_then(Value::as_str);
    let data_type = value.get("type").and_then(Value::as_str);

    match (name, data_type) {
        (Some(name), Some(data_type)) => Ok(ColumnInfo::new(name, data_type)),
        _ => Err(EngineError::Decode {
            message: format!("DESCRIBE row is missing name/type: {}", line),
        }),
    }
}
