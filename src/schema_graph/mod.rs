//! Compiled schema graph.
//!
//! [`SchemaGraph::compile`] is phase 2 of the schema build. Every type and edge
//! reference is resolved against the complete registry, so forward references work
//! regardless of registration order, and anything unresolvable fails here rather than
//! at query time. The result is immutable and cheap to clone.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::graph_schema::edges::{infer_join_key, Edge, EdgeDefinition, EdgeRegistry, JoinSpec};
use crate::graph_schema::registry::{is_valid_graphql_name, DISTINCT_FIELD, MUTATION_TYPE};
use crate::graph_schema::{GraphSchemaError, ObjectRegistry, TypeDefinition, ROOT_TYPE};

pub mod graphql;

#[derive(Debug)]
struct GraphInner {
    types: Vec<Arc<TypeDefinition>>,
    index: HashMap<String, usize>,
    edges: EdgeRegistry<Edge>,
}

#[derive(Debug, Clone)]
pub struct SchemaGraph {
    inner: Arc<GraphInner>,
}

impl SchemaGraph {
    pub fn compile(registry: &ObjectRegistry) -> Result<Self, GraphSchemaError> {
        let mut taken: HashSet<String> = HashSet::new();
        taken.insert(ROOT_TYPE.to_string());
        taken.insert(MUTATION_TYPE.to_string());

        for def in registry.types() {
            if !is_valid_graphql_name(&def.name) {
                return Err(GraphSchemaError::invalid_name("type", &def.name));
            }
            for shape_name in def.shape_names() {
                if !taken.insert(shape_name.clone()) {
                    return Err(GraphSchemaError::NameCollision { name: shape_name });
                }
            }
            for field in def.fields.names() {
                if !is_valid_graphql_name(field) {
                    return Err(GraphSchemaError::invalid_name(
                        "field",
                        format!("{}.{}", def.name, field),
                    ));
                }
                if field == DISTINCT_FIELD {
                    return Err(GraphSchemaError::FieldCollision {
                        source_type: def.name.clone(),
                        field: field.to_string(),
                    });
                }
            }
        }

        let mut edges = EdgeRegistry::new();
        for definition in registry.edges().iter() {
            edges.add(resolve_edge(registry, definition)?)?;
        }

        if edges.edges_of(ROOT_TYPE).is_none() {
            return Err(GraphSchemaError::EmptyRoot);
        }

        let types: Vec<Arc<TypeDefinition>> =
            registry.types().iter().cloned().map(Arc::new).collect();
        let index = types
            .iter()
            .enumerate()
            .map(|(i, def)| (def.name.clone(), i))
            .collect();

        log::info!(
            "Compiled schema graph: {} type(s), {} edge(s)",
            types.len(),
            edges.len()
        );

        Ok(Self {
            inner: Arc::new(GraphInner {
                types,
                index,
                edges,
            }),
        })
    }

    pub fn type_def(&self, name: &str) -> Option<&Arc<TypeDefinition>> {
        self.inner.index.get(name).map(|&i| &self.inner.types[i])
    }

    pub fn types(&self) -> &[Arc<TypeDefinition>] {
        &self.inner.types
    }

    /// Outgoing edges of `source`; `None` when it has none.
    pub fn edges_of(&self, source: &str) -> Option<&[Edge]> {
        self.inner.edges.edges_of(source)
    }

    pub fn edge(&self, source: &str, field: &str) -> Option<&Edge> {
        self.inner.edges.get(source, field)
    }

    pub fn has_mutations(&self) -> bool {
        self.inner.types.iter().any(|def| def.mutable)
    }
}

fn resolve_edge(
    registry: &ObjectRegistry,
    definition: &EdgeDefinition,
) -> Result<Edge, GraphSchemaError> {
    let EdgeDefinition {
        source,
        field,
        target,
        join,
    } = definition;

    let source_def = if source == ROOT_TYPE {
        None
    } else {
        Some(
            registry
                .type_def(source)
                .ok_or_else(|| GraphSchemaError::unknown_type(source))?,
        )
    };
    let target_def = registry
        .type_def(target)
        .ok_or_else(|| GraphSchemaError::unknown_type(target))?;

    if !is_valid_graphql_name(field) {
        return Err(GraphSchemaError::invalid_name(
            "field",
            format!("{}.{}", source, field),
        ));
    }
    let collides = field == DISTINCT_FIELD
        || source_def.is_some_and(|def| def.fields.contains(field));
    if collides {
        return Err(GraphSchemaError::FieldCollision {
            source_type: source.clone(),
            field: field.clone(),
        });
    }

    let join_key = match join {
        JoinSpec::Explicit(key) => {
            for (source_column, target_column) in key.pairs() {
                if !source_def.is_some_and(|def| def.fields.contains(source_column)) {
                    return Err(GraphSchemaError::UnknownJoinColumn {
                        source_type: source.clone(),
                        field: field.clone(),
                        type_name: source.clone(),
                        column: source_column.clone(),
                    });
                }
                if !target_def.fields.contains(target_column) {
                    return Err(GraphSchemaError::UnknownJoinColumn {
                        source_type: source.clone(),
                        field: field.clone(),
                        type_name: target.clone(),
                        column: target_column.clone(),
                    });
                }
            }
            key.clone()
        }
        JoinSpec::Inferred => match source_def {
            // Root edges list the whole target relation
            None => Default::default(),
            Some(def) => {
                let key = infer_join_key(&def.fields, &target_def.fields);
                if key.is_empty() {
                    log::warn!(
                        "Edge {}.{}: {} and {} share no columns; traversal is unrestricted",
                        source,
                        field,
                        source,
                        target
                    );
                } else if key.len() > 1 {
                    log::info!(
                        "Edge {}.{} joins on {} shared columns: {:?}",
                        source,
                        field,
                        key.len(),
                        key.source_columns().collect::<Vec<_>>()
                    );
                }
                key
            }
        },
    };

    Ok(Edge {
        source: source.clone(),
        field: field.clone(),
        target: target.clone(),
        join_key,
    })
}
