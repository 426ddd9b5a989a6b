//! Transport-neutral selection tree.
//!
//! The GraphQL layer converts the request's selection set under an edge field into a
//! [`Selection`]; the resolver only ever looks at names.

/// Introspection field present on any object, never backed by a column.
const TYPENAME_FIELD: &str = "__typename";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    pub name: String,
    pub children: Vec<Selection>,
}

impl Selection {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn new(name: impl Into<String>, children: Vec<Selection>) -> Self {
        Self {
            name: name.into(),
            children,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Requested child names in request order, without duplicates or `__typename`.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::with_capacity(self.children.len());
        for child in &self.children {
            if child.name != TYPENAME_FIELD && !names.contains(&child.name.as_str()) {
                names.push(&child.name);
            }
        }
        names
    }

    /// First child selected under `name`. A field requested twice under different
    /// aliases merges into its first occurrence.
    pub fn child(&self, name: &str) -> Option<&Selection> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn field_names_of(&self, name: &str) -> Vec<&str> {
        self.child(name).map(Selection::field_names).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer_selection() -> Selection {
        Selection::new(
            "customers",
            vec![
                Selection::leaf("__typename"),
                Selection::leaf("id"),
                Selection::leaf("region"),
                Selection::leaf("id"),
                Selection::new(
                    "_distinct_",
                    vec![Selection::leaf("region"), Selection::leaf("id")],
                ),
                Selection::new("invoices", vec![Selection::leaf("amount")]),
            ],
        )
    }

    #[test]
    fn test_field_names() {
        let selection = customer_selection();
        assert_eq!(
            selection.field_names(),
            vec!["id", "region", "_distinct_", "invoices"]
        );
        assert!(!selection.is_leaf());
    }

    #[test]
    fn test_nested_selection() {
        let selection = customer_selection();
        assert_eq!(selection.field_names_of("_distinct_"), vec!["region", "id"]);
        assert!(selection.child("invoices").is_some());
        assert!(selection.child("missing").is_none());
        assert!(selection.field_names_of("missing").is_empty());
    }
}
