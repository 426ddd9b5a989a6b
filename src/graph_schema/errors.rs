//! # Graph Schema Error Types
//!
//! Errors raised while registering types and edges (phase 1) and while compiling the
//! registry into a schema graph (phase 2). All of them are configuration errors: they
//! surface at startup and abort it.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphSchemaError {
    #[error("No type registered as `{type_name}`")]
    UnknownType { type_name: String },
    #[error("Type `{type_name}` is already registered")]
    DuplicateType { type_name: String },
    #[error("Type `{type_name}` has no columns")]
    EmptyType { type_name: String },
    #[error("Edge `{source_type}.{field}` is already registered")]
    DuplicateEdge { source_type: String, field: String },
    #[error("Edge `{source_type}.{field}` collides with an existing field of `{source_type}`")]
    FieldCollision { source_type: String, field: String },
    #[error("Edge `{source_type}.{field}` joins on `{column}`, which `{type_name}` does not have")]
    UnknownJoinColumn {
        source_type: String,
        field: String,
        type_name: String,
        column: String,
    },
    #[error("`{name}` is not a valid GraphQL {kind} name")]
    InvalidName { kind: &'static str, name: String },
    #[error("Generated GraphQL type name `{name}` is used twice")]
    NameCollision { name: String },
    #[error("The root type has no edges; add at least one `Query` edge")]
    EmptyRoot,
    #[error("Failed to load relation for type `{type_name}`: {message}")]
    RelationLoad { type_name: String, message: String },
    #[error("Failed to read configuration file: {error}")]
    ConfigReadError { error: String },
    #[error("Failed to parse configuration: {error}")]
    ConfigParseError { error: String },
    #[error("Failed to build GraphQL schema: {message}")]
    GraphQl { message: String },
}

impl GraphSchemaError {
    pub fn unknown_type(type_name: impl Into<String>) -> Self {
        GraphSchemaError::UnknownType {
            type_name: type_name.into(),
        }
    }

    pub fn invalid_name(kind: &'static str, name: impl Into<String>) -> Self {
        GraphSchemaError::InvalidName {
            kind,
            name: name.into(),
        }
    }
}
