//! Storage type → scalar kind mapping.

use std::fmt;

use async_graphql::dynamic::TypeRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Int,
    Float,
    Bool,
    String,
}

/// Substrings checked in order; the first hit decides.
const MATCH_ORDER: &[(&str, ScalarKind)] = &[
    ("int", ScalarKind::Int),
    ("float", ScalarKind::Float),
    ("bool", ScalarKind::Bool),
    ("object", ScalarKind::String),
    ("string", ScalarKind::String),
];

impl ScalarKind {
    /// Map an engine storage type (`Int64`, `Nullable(Float64)`, `LowCardinality(String)`,
    /// ...) to a scalar kind. Anything unrecognised, dates and decimals included, is a
    /// String.
    pub fn from_storage_type(storage_type: &str) -> Self {
        let lowered = storage_type.to_ascii_lowercase();
        MATCH_ORDER
            .iter()
            .find(|(needle, _)| lowered.contains(needle))
            .map(|(_, kind)| *kind)
            .unwrap_or(ScalarKind::String)
    }

    pub fn graphql_type_name(&self) -> &'static str {
        match self {
            ScalarKind::Int => TypeRef::INT,
            ScalarKind::Float => TypeRef::FLOAT,
            ScalarKind::Bool => TypeRef::BOOLEAN,
            ScalarKind::String => TypeRef::STRING,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.graphql_type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Int64", ScalarKind::Int ; "plain int")]
    #[test_case("UInt8", ScalarKind::Int ; "unsigned int")]
    #[test_case("Nullable(Int32)", ScalarKind::Int ; "nullable int")]
    #[test_case("BIGINT", ScalarKind::Int ; "upper case")]
    #[test_case("Float64", ScalarKind::Float ; "float")]
    #[test_case("Nullable(Float32)", ScalarKind::Float ; "nullable float")]
    #[test_case("Bool", ScalarKind::Bool ; "bool")]
    #[test_case("BOOLEAN", ScalarKind::Bool ; "upper boolean")]
    #[test_case("String", ScalarKind::String ; "string")]
    #[test_case("LowCardinality(String)", ScalarKind::String ; "low cardinality")]
    #[test_case("Object('json')", ScalarKind::String ; "object")]
    #[test_case("Date", ScalarKind::String ; "date falls back")]
    #[test_case("Decimal(10, 2)", ScalarKind::String ; "decimal falls back")]
    #[test_case("", ScalarKind::String ; "empty falls back")]
    fn test_from_storage_type(storage_type: &str, expected: ScalarKind) {
        assert_eq!(ScalarKind::from_storage_type(storage_type), expected);
    }

    #[test]
    fn test_first_match_wins() {
        // "Point" contains "int"
        assert_eq!(ScalarKind::from_storage_type("Point"), ScalarKind::Int);
        assert_eq!(
            ScalarKind::from_storage_type("Map(String, Int64)"),
            ScalarKind::Int
        );
    }

    #[test]
    fn test_graphql_names() {
        assert_eq!(ScalarKind::Int.to_string(), "Int");
        assert_eq!(ScalarKind::Float.to_string(), "Float");
        assert_eq!(ScalarKind::Bool.to_string(), "Boolean");
        assert_eq!(ScalarKind::String.to_string(), "String");
    }
}
