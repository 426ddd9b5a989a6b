//! Type definitions and their derived shapes.
//!
//! A type owns one canonical [`FieldSet`] (column order of its relation). The output,
//! filter and counts shapes are pure projections of that set, see [`project`].

use serde::{Deserialize, Serialize};

use super::scalar_kind::ScalarKind;
use crate::relation_catalog::ColumnInfo;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub kind: ScalarKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered, name-unique set of fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
    fields: Vec<Field>,
}

impl FieldSet {
    /// Apply the type mapper to every column. A repeated column name keeps its first
    /// occurrence.
    pub fn from_columns(columns: &[ColumnInfo]) -> Self {
        let mut set = FieldSet::default();
        for column in columns {
            if set.contains(&column.name) {
                log::debug!("Skipping repeated column `{}`", column.name);
                continue;
            }
            set.fields.push(Field::new(
                column.name.clone(),
                ScalarKind::from_storage_type(&column.data_type),
            ));
        }
        set
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<Field> for FieldSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut set = FieldSet::default();
        for field in iter {
            if !set.contains(&field.name) {
                set.fields.push(field);
            }
        }
        set
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// `<T>`: result records
    Output,
    /// `<T>Filter`: one optional equality argument per field
    Filter,
    /// `<T>Counts`: one integer per field, the shape of `_distinct_`
    Counts,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 3] = [ShapeKind::Output, ShapeKind::Filter, ShapeKind::Counts];

    pub fn shape_name(&self, type_name: &str) -> String {
        match self {
            ShapeKind::Output => type_name.to_string(),
            ShapeKind::Filter => format!("{}Filter", type_name),
            ShapeKind::Counts => format!("{}Counts", type_name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub kind: ShapeKind,
    pub name: String,
    pub fields: Vec<Field>,
}

pub fn project(type_name: &str, fields: &FieldSet, kind: ShapeKind) -> Shape {
    let fields = fields
        .iter()
        .map(|field| match kind {
            ShapeKind::Output | ShapeKind::Filter => field.clone(),
            ShapeKind::Counts => Field::new(field.name.clone(), ScalarKind::Int),
        })
        .collect();

    Shape {
        kind,
        name: kind.shape_name(type_name),
        fields,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDefinition {
    pub name: String,
    /// Logical relation name in the catalog
    pub relation: String,
    pub fields: FieldSet,
    pub mutable: bool,
}

impl TypeDefinition {
    pub fn new(
        name: impl Into<String>,
        relation: impl Into<String>,
        fields: FieldSet,
        mutable: bool,
    ) -> Self {
        Self {
            name: name.into(),
            relation: relation.into(),
            fields,
            mutable,
        }
    }

    pub fn shape(&self, kind: ShapeKind) -> Shape {
        project(&self.name, &self.fields, kind)
    }

    pub fn output(&self) -> Shape {
        self.shape(ShapeKind::Output)
    }

    pub fn filter(&self) -> Shape {
        self.shape(ShapeKind::Filter)
    }

    pub fn counts(&self) -> Shape {
        self.shape(ShapeKind::Counts)
    }

    /// Names of all three generated shapes.
    pub fn shape_names(&self) -> impl Iterator<Item = String> + '_ {
        ShapeKind::ALL.iter().map(|kind| kind.shape_name(&self.name))
    }
}
