//! Type and edge registration.
//!
//! `ObjectRegistry` is phase 1 of the schema build: it only collects metadata. Names
//! are resolved and validated by [`ObjectRegistry::compile`], which produces the
//! immutable [`SchemaGraph`].
//!
//! ```ignore
//! let mut registry = ObjectRegistry::new();
//! registry.register_type(&loader, "Customer", "Customer", true).await?;
//! registry.register_type(&loader, "Invoice", "Invoice", false).await?;
//! registry.add_edge(ROOT_TYPE, "customers", "Customer", None)?;
//! registry.add_edge("Customer", "invoices", "Invoice", Some(join))?;
//! let graph = registry.compile()?;
//! ```

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use super::edges::{EdgeDefinition, EdgeRegistry, JoinKey, JoinSpec};
use super::errors::GraphSchemaError;
use super::type_def::{FieldSet, TypeDefinition};
use crate::relation_catalog::{ColumnInfo, RelationLoader};
use crate::schema_graph::SchemaGraph;

/// Entry point of every schema; holds root edges and no columns.
pub const ROOT_TYPE: &str = "Query";
/// Emitted only when at least one type is mutable.
pub const MUTATION_TYPE: &str = "Mutation";
/// Pseudo-field carrying distinct-value counts on every non-root type.
pub const DISTINCT_FIELD: &str = "_distinct_";

lazy_static! {
    static ref GRAPHQL_NAME: Regex = Regex::new(r"^[_A-Za-z][_0-9A-Za-z]*$").unwrap();
}

/// A GraphQL name that is not reserved for introspection (`__` prefix).
pub fn is_valid_graphql_name(name: &str) -> bool {
    GRAPHQL_NAME.is_match(name) && !name.starts_with("__")
}

#[derive(Debug, Clone, Default)]
pub struct ObjectRegistry {
    types: Vec<TypeDefinition>,
    index: HashMap<String, usize>,
    edges: EdgeRegistry,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `relation` through the loader and register its columns as `name`.
    pub async fn register_type(
        &mut self,
        loader: &RelationLoader,
        name: &str,
        relation: &str,
        mutable: bool,
    ) -> Result<&TypeDefinition, GraphSchemaError> {
        self.check_new_type(name)?;
        let loaded = loader
            .load(relation)
            .await
            .map_err(|e| GraphSchemaError::RelationLoad {
                type_name: name.to_string(),
                message: e.to_string(),
            })?;
        self.define_type(name, relation, loaded.columns(), mutable)
    }

    /// Register a type from already-known columns.
    pub fn define_type(
        &mut self,
        name: &str,
        relation: &str,
        columns: &[ColumnInfo],
        mutable: bool,
    ) -> Result<&TypeDefinition, GraphSchemaError> {
        self.check_new_type(name)?;
        let fields = FieldSet::from_columns(columns);
        if fields.is_empty() {
            return Err(GraphSchemaError::EmptyType {
                type_name: name.to_string(),
            });
        }

        log::info!(
            "Registered type {} ({} fields, relation {}{})",
            name,
            fields.len(),
            relation,
            if mutable { ", mutable" } else { "" }
        );

        let idx = self.types.len();
        self.types
            .push(TypeDefinition::new(name, relation, fields, mutable));
        self.index.insert(name.to_string(), idx);
        Ok(&self.types[idx])
    }

    /// Record a directed edge. Without `join_on` the join key is inferred at compile
    /// time from the columns both types share.
    pub fn add_edge(
        &mut self,
        source: &str,
        field: &str,
        target: &str,
        join_on: Option<JoinKey>,
    ) -> Result<(), GraphSchemaError> {
        let join = match join_on {
            Some(key) => JoinSpec::Explicit(key),
            None => JoinSpec::Inferred,
        };
        self.edges.add(EdgeDefinition {
            source: source.to_string(),
            field: field.to_string(),
            target: target.to_string(),
            join,
        })?;
        log::debug!("Registered edge {}.{} -> {}", source, field, target);
        Ok(())
    }

    fn check_new_type(&self, name: &str) -> Result<(), GraphSchemaError> {
        if name == ROOT_TYPE || name == MUTATION_TYPE || self.index.contains_key(name) {
            return Err(GraphSchemaError::DuplicateType {
                type_name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn type_def(&self, name: &str) -> Option<&TypeDefinition> {
        self.index.get(name).map(|&idx| &self.types[idx])
    }

    /// Types in registration order.
    pub fn types(&self) -> &[TypeDefinition] {
        &self.types
    }

    pub fn edges(&self) -> &EdgeRegistry {
        &self.edges
    }

    /// Resolve every reference against the complete metadata and freeze the result.
    /// May be called any number of times; each call builds an independent graph.
    pub fn compile(&self) -> Result<SchemaGraph, GraphSchemaError> {
        SchemaGraph::compile(self)
    }
}
