//! Edges between types.
//!
//! Registration records an [`EdgeDefinition`] whose join key is either explicit or
//! left to inference. Compilation turns each definition into a resolved [`Edge`] with
//! a concrete [`JoinKey`].

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::errors::GraphSchemaError;
use super::type_def::FieldSet;

/// Ordered (source column, target column) equality pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinKey {
    pairs: Vec<(String, String)>,
}

impl JoinKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join every listed column to the column of the same name.
    pub fn identity<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        columns
            .into_iter()
            .map(|c| {
                let c = c.into();
                (c.clone(), c)
            })
            .collect()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn source_columns(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(source, _)| source.as_str())
    }

    pub fn target_columns(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(_, target)| target.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<S: Into<String>, T: Into<String>> FromIterator<(S, T)> for JoinKey {
    fn from_iter<I: IntoIterator<Item = (S, T)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(s, t)| (s.into(), t.into()))
                .collect(),
        }
    }
}

/// Written as a `source: target` map; pairs keep their declared order.
impl Serialize for JoinKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.pairs.iter().map(|(source, target)| (source, target)))
    }
}

impl<'de> Deserialize<'de> for JoinKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PairsVisitor;

        impl<'de> Visitor<'de> for PairsVisitor {
            type Value = JoinKey;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of source column to target column")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<JoinKey, A::Error> {
                let mut pairs: Vec<(String, String)> =
                    Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((source, target)) = map.next_entry::<String, String>()? {
                    if pairs.iter().any(|(seen, _)| *seen == source) {
                        return Err(de::Error::custom(format!(
                            "join column `{}` listed twice",
                            source
                        )));
                    }
                    pairs.push((source, target));
                }
                Ok(JoinKey { pairs })
            }
        }

        deserializer.deserialize_map(PairsVisitor)
    }
}

/// Shared column names, in the source's column order.
pub fn infer_join_key(source: &FieldSet, target: &FieldSet) -> JoinKey {
    JoinKey::identity(source.names().filter(|name| target.contains(name)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinSpec {
    Explicit(JoinKey),
    /// Column-name intersection, computed at compile time
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeDefinition {
    pub source: String,
    pub field: String,
    pub target: String,
    pub join: JoinSpec,
}

/// A compiled edge with its join key fixed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub source: String,
    pub field: String,
    pub target: String,
    pub join_key: JoinKey,
}

/// Edge lists keyed by source type name. A type without outgoing edges has no entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRegistry<E = EdgeDefinition> {
    edges: BTreeMap<String, Vec<E>>,
}

impl<E> Default for EdgeRegistry<E> {
    fn default() -> Self {
        Self {
            edges: BTreeMap::new(),
        }
    }
}

/// Access to the identity of an edge, shared by definitions and compiled edges.
pub trait EdgeName {
    fn source(&self) -> &str;
    fn field(&self) -> &str;
}

impl EdgeName for EdgeDefinition {
    fn source(&self) -> &str {
        &self.source
    }

    fn field(&self) -> &str {
        &self.field
    }
}

impl EdgeName for Edge {
    fn source(&self) -> &str {
        &self.source
    }

    fn field(&self) -> &str {
        &self.field
    }
}

impl<E: EdgeName> EdgeRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an edge to its source's list. Field names are unique per source type.
    pub fn add(&mut self, edge: E) -> Result<(), GraphSchemaError> {
        if self.get(edge.source(), edge.field()).is_some() {
            return Err(GraphSchemaError::DuplicateEdge {
                source_type: edge.source().to_string(),
                field: edge.field().to_string(),
            });
        }
        self.edges
            .entry(edge.source().to_string())
            .or_default()
            .push(edge);
        Ok(())
    }

    /// `None` when the type has no outgoing edges.
    pub fn edges_of(&self, source: &str) -> Option<&[E]> {
        self.edges.get(source).map(Vec::as_slice)
    }

    pub fn get(&self, source: &str, field: &str) -> Option<&E> {
        self.edges_of(source)?.iter().find(|e| e.field() == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.edges.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
