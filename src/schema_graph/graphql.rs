//! Dynamic GraphQL schema over a compiled [`SchemaGraph`].
//!
//! Per type `T`:
//!
//! ```graphql
//! type T { <column>: <Scalar>  _distinct_: TCounts  <edge>(filter: <Target>Filter, limit: Int = 100, offset: Int = 0): [<Target>] }
//! input TFilter { <column>: <Scalar> }
//! type TCounts { <column>: Int }
//! ```
//!
//! plus `Query` with the root edges and, when a type is mutable, `Mutation` with
//! `createT(data: TFilter!): T`. Resolved objects are [`Record`]s carried as
//! `FieldValue::owned_any`; edge fields hand off to [`EdgeResolver`].

use std::sync::Arc;

use async_graphql::dynamic::{
    Field, FieldFuture, FieldValue, InputObject, InputValue, Object, ResolverContext, Schema,
    TypeRef,
};
use async_graphql::{Error as GqlError, SelectionField, Value as GqlValue};
use serde_json::Value;

use super::SchemaGraph;
use crate::graph_schema::{
    Edge, GraphSchemaError, ScalarKind, Shape, TypeDefinition, DISTINCT_FIELD, MUTATION_TYPE,
    ROOT_TYPE,
};
use crate::query_compiler::{EdgeResolver, EdgeTraversal, Selection, DEFAULT_OFFSET};
use crate::relation_catalog::{Record, RelationLoader};

impl SchemaGraph {
    /// Assemble an executable schema. Every call builds a new, independent schema;
    /// `default_limit` is the default of every edge's `limit` argument.
    pub fn build_graphql(
        &self,
        loader: Arc<RelationLoader>,
        default_limit: i64,
    ) -> Result<Schema, GraphSchemaError> {
        let mutation = self.has_mutations().then_some(MUTATION_TYPE);
        let mut builder = Schema::build(ROOT_TYPE, mutation, None);

        let mut query = Object::new(ROOT_TYPE);
        for edge in self.edges_of(ROOT_TYPE).unwrap_or_default() {
            query = query.field(self.edge_field(edge, &loader, default_limit));
        }
        builder = builder.register(query);

        let mut mutation = Object::new(MUTATION_TYPE);
        for def in self.types() {
            builder = builder
                .register(self.output_object(def, &loader, default_limit))
                .register(filter_input(&def.filter()))
                .register(counts_object(&def.counts()));
            if def.mutable {
                mutation = mutation.field(create_field(def));
            }
        }
        if self.has_mutations() {
            builder = builder.register(mutation);
        }

        builder.finish().map_err(|e| GraphSchemaError::GraphQl {
            message: e.to_string(),
        })
    }

    fn output_object(
        &self,
        def: &TypeDefinition,
        loader: &Arc<RelationLoader>,
        default_limit: i64,
    ) -> Object {
        let output = def.output();
        let counts_name = def.counts().name;

        let mut object = Object::new(&output.name);
        for field in &output.fields {
            object = object.field(column_field(&field.name, field.kind));
        }
        object = object.field(Field::new(
            DISTINCT_FIELD,
            TypeRef::named(counts_name),
            |ctx| {
                FieldFuture::new(async move {
                    let record = ctx.parent_value.try_downcast_ref::<Record>()?;
                    Ok(match record.get(DISTINCT_FIELD) {
                        Some(Value::Object(counts)) => Some(FieldValue::owned_any(counts.clone())),
                        _ => None,
                    })
                })
            },
        ));
        for edge in self.edges_of(&def.name).unwrap_or_default() {
            object = object.field(self.edge_field(edge, loader, default_limit));
        }
        object
    }

    fn edge_field(&self, edge: &Edge, loader: &Arc<RelationLoader>, default_limit: i64) -> Field {
        let graph = self.clone();
        let loader = loader.clone();
        let source = edge.source.clone();
        let name = edge.field.clone();
        let filter_type = format!("{}Filter", edge.target);

        Field::new(&edge.field, TypeRef::named_list(&edge.target), move |ctx| {
            let graph = graph.clone();
            let loader = loader.clone();
            let source = source.clone();
            let name = name.clone();
            FieldFuture::new(async move {
                let edge = graph.edge(&source, &name).ok_or_else(|| {
                    GqlError::new(format!("No edge {}.{} in the schema graph", source, name))
                })?;

                let root = Record::new();
                let parent = if source == ROOT_TYPE {
                    &root
                } else {
                    ctx.parent_value.try_downcast_ref::<Record>()?
                };
                let selection = selection_of(ctx.field());
                let traversal = EdgeTraversal::new(parent, &selection)
                    .with_filter(filter_argument(&ctx)?)
                    .with_window(
                        int_argument(&ctx, "limit", default_limit)?,
                        int_argument(&ctx, "offset", DEFAULT_OFFSET)?,
                    );
                log::debug!("Resolving {}.{}: {:?}", source, name, selection);

                let records = EdgeResolver::new(&graph, &loader)
                    .resolve(edge, &traversal)
                    .await
                    .map_err(|e| {
                        log::error!("Traversal {}.{} failed: {}", source, name, e);
                        GqlError::new(e.to_string())
                    })?;

                Ok(Some(FieldValue::list(
                    records.into_iter().map(FieldValue::owned_any),
                )))
            })
        })
        .argument(InputValue::new("filter", TypeRef::named(filter_type)))
        .argument(InputValue::new("limit", TypeRef::named(TypeRef::INT)).default_value(default_limit))
        .argument(InputValue::new("offset", TypeRef::named(TypeRef::INT)).default_value(DEFAULT_OFFSET))
    }
}

fn column_field(name: &str, kind: ScalarKind) -> Field {
    let column = name.to_string();
    Field::new(name, TypeRef::named(kind.graphql_type_name()), move |ctx| {
        let column = column.clone();
        FieldFuture::new(async move {
            let record = ctx.parent_value.try_downcast_ref::<Record>()?;
            Ok(record
                .get(&column)
                .and_then(|value| coerce_scalar(kind, value))
                .map(|value| FieldValue::value(value)))
        })
    })
}

fn filter_input(shape: &Shape) -> InputObject {
    shape.fields.iter().fold(InputObject::new(&shape.name), |input, field| {
        input.field(InputValue::new(
            &field.name,
            TypeRef::named(field.kind.graphql_type_name()),
        ))
    })
}

fn counts_object(shape: &Shape) -> Object {
    shape.fields.iter().fold(Object::new(&shape.name), |object, field| {
        object.field(column_field(&field.name, field.kind))
    })
}

/// `create<T>` echoes the supplied non-null fields back as a `T`. Nothing is stored.
fn create_field(def: &TypeDefinition) -> Field {
    let type_name = def.name.clone();
    Field::new(
        format!("create{}", def.name),
        TypeRef::named(&def.name),
        move |ctx| {
            let type_name = type_name.clone();
            FieldFuture::new(async move {
                let data = ctx.args.try_get("data")?.as_value().clone().into_json()?;
                let record: Record = match data {
                    Value::Object(fields) => fields.into_iter().filter(|(_, v)| !v.is_null()).collect(),
                    _ => Record::new(),
                };
                log::info!(
                    "create{}: echoing {} field(s), nothing is persisted",
                    type_name,
                    record.len()
                );
                Ok(Some(FieldValue::owned_any(record)))
            })
        },
    )
    .argument(InputValue::new(
        "data",
        TypeRef::named_nn(def.filter().name),
    ))
}

fn selection_of(field: SelectionField<'_>) -> Selection {
    Selection::new(field.name(), field.selection_set().map(selection_of).collect())
}

fn filter_argument(ctx: &ResolverContext<'_>) -> async_graphql::Result<Record> {
    match ctx.args.get("filter") {
        Some(filter) if !filter.is_null() => match filter.as_value().clone().into_json()? {
            Value::Object(fields) => Ok(fields),
            other => Err(GqlError::new(format!("filter must be an object, got {}", other))),
        },
        _ => Ok(Record::new()),
    }
}

/// Explicit `null` falls back to the default like an omitted argument.
fn int_argument(ctx: &ResolverContext<'_>, name: &str, default: i64) -> async_graphql::Result<i64> {
    match ctx.args.get(name) {
        Some(value) if !value.is_null() => value.i64(),
        _ => Ok(default),
    }
}

/// Convert a cell to the GraphQL scalar of its field. Cells that cannot represent the
/// kind resolve to `null`.
pub fn coerce_scalar(kind: ScalarKind, value: &Value) -> Option<GqlValue> {
    match (kind, value) {
        (_, Value::Null) => None,
        (ScalarKind::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => {
            Some(GqlValue::Number(n.clone()))
        }
        (ScalarKind::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(GqlValue::from),
        (ScalarKind::Float, Value::Number(n)) => n
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(GqlValue::Number),
        (ScalarKind::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(GqlValue::Number),
        (ScalarKind::Bool, Value::Bool(b)) => Some(GqlValue::Boolean(*b)),
        (ScalarKind::Bool, Value::Number(n)) => n.as_i64().map(|i| GqlValue::Boolean(i != 0)),
        (ScalarKind::String, Value::String(s)) => Some(GqlValue::String(s.clone())),
        (ScalarKind::String, other) => Some(GqlValue::String(other.to_string())),
        _ => None,
    }
}
