//! Registration file.
//!
//! Declares the relation catalog, the types built from it and the edges between them:
//!
//! ```yaml
//! catalog:
//!   Customer: { path: data/customer.jsonl, format: JSONEachRow }
//!   Invoice:  { table: sales.invoices }
//! types:
//!   - { name: Customer, mutable: true }
//!   - { name: Invoice }
//! edges:
//!   - { source: Query, field: customers, target: Customer }
//!   - { source: Customer, field: invoices, target: Invoice, join_on: { id: customer_id } }
//! ```
//!
//! Registration order follows the file: types first, then edges.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::edges::JoinKey;
use super::errors::GraphSchemaError;
use super::registry::ObjectRegistry;
use crate::relation_catalog::{RelationCatalog, RelationLoader};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrationConfig {
    #[serde(default)]
    pub catalog: RelationCatalog,
    #[serde(default)]
    pub types: Vec<TypeRegistration>,
    #[serde(default)]
    pub edges: Vec<EdgeRegistration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRegistration {
    pub name: String,
    /// Catalog entry; defaults to the type name
    #[serde(default)]
    pub relation: Option<String>,
    #[serde(default)]
    pub mutable: bool,
}

impl TypeRegistration {
    pub fn relation(&self) -> &str {
        self.relation.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRegistration {
    pub source: String,
    pub field: String,
    pub target: String,
    /// Source column -> target column, in declared order; inferred when omitted
    #[serde(default)]
    pub join_on: Option<JoinKey>,
}

impl RegistrationConfig {
    /// Load a registration file. Relative catalog paths are resolved against the
    /// file's directory.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, GraphSchemaError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| GraphSchemaError::ConfigReadError {
            error: format!("{}: {}", path.display(), e),
        })?;

        let mut config = Self::from_yaml_str(&contents)?;
        if let Some(dir) = path.parent() {
            config.catalog.resolve_relative_to(dir);
        }
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, GraphSchemaError> {
        serde_yaml::from_str(yaml).map_err(|e| GraphSchemaError::ConfigParseError {
            error: e.to_string(),
        })
    }

    /// Register every declared type (describing its relation through `loader`) and
    /// edge.
    pub async fn apply(
        &self,
        registry: &mut ObjectRegistry,
        loader: &RelationLoader,
    ) -> Result<(), GraphSchemaError> {
        for ty in &self.types {
            registry
                .register_type(loader, &ty.name, ty.relation(), ty.mutable)
                .await?;
        }
        for edge in &self.edges {
            registry.add_edge(
                &edge.source,
                &edge.field,
                &edge.target,
                edge.join_on.clone(),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    use crate::relation_catalog::{DataFusionEngine, RelationSource};

    const YAML: &str = r#"
catalog:
  Customer: { path: customer.jsonl, format: JSONEachRow }
  Invoice:  { path: invoice.jsonl, format: JSONEachRow }
types:
  - { name: Customer, mutable: true }
  - { name: Bill, relation: Invoice }
edges:
  - { source: Query, field: customers, target: Customer }
  - { source: Customer, field: bills, target: Bill, join_on: { id: customer_id } }
"#;

    #[test]
    fn test_parse_registration() {
        let config = RegistrationConfig::from_yaml_str(YAML).unwrap();
        assert_eq!(config.catalog.len(), 2);
        assert_eq!(config.types[0].relation(), "Customer");
        assert!(config.types[0].mutable);
        assert_eq!(config.types[1].relation(), "Invoice");
        assert!(!config.types[1].mutable);
        assert_eq!(config.edges[0].join_on, None);
        assert_eq!(
            config.edges[1].join_on,
            Some(JoinKey::from_iter([("id", "customer_id")]))
        );
    }

    #[test]
    fn test_composite_join_keeps_declared_order() {
        let config = RegistrationConfig::from_yaml_str(
            "edges:\n  - { source: Sale, field: targets, target: Target, join_on: { year: fiscal_year, region: area } }\n",
        )
        .unwrap();
        let join = config.edges[0].join_on.as_ref().unwrap();
        assert_eq!(
            join.pairs(),
            &[
                ("year".to_string(), "fiscal_year".to_string()),
                ("region".to_string(), "area".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            RegistrationConfig::from_yaml_str("types: 7"),
            Err(GraphSchemaError::ConfigParseError { .. })
        ));
        assert!(matches!(
            RegistrationConfig::from_yaml_file("/no/such/registration.yaml"),
            Err(GraphSchemaError::ConfigReadError { .. })
        ));
    }

    #[tokio::test]
    async fn test_apply_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut customers = fs::File::create(dir.path().join("customer.jsonl")).unwrap();
        writeln!(customers, r#"{{"id": 7, "region": "west"}}"#).unwrap();
        let mut invoices = fs::File::create(dir.path().join("invoice.jsonl")).unwrap();
        writeln!(invoices, r#"{{"id": 1, "customer_id": 7, "amount": 9.5}}"#).unwrap();
        let config_path = dir.path().join("registration.yaml");
        fs::write(&config_path, YAML).unwrap();

        let config = RegistrationConfig::from_yaml_file(&config_path).unwrap();
        assert_eq!(
            config.catalog.get("Customer").unwrap(),
            &RelationSource::file(dir.path().join("customer.jsonl"), "JSONEachRow")
        );

        let loader = RelationLoader::new(config.catalog.clone(), Arc::new(DataFusionEngine::new()));
        let mut registry = ObjectRegistry::new();
        config.apply(&mut registry, &loader).await.unwrap();

        let bill = registry.type_def("Bill").unwrap();
        assert_eq!(bill.relation, "Invoice");
        assert_eq!(bill.fields.len(), 3);
        assert_eq!(registry.edges().len(), 2);
        assert!(registry.compile().is_ok());
    }

    #[tokio::test]
    async fn test_unknown_catalog_entry_fails_registration() {
        let config = RegistrationConfig::from_yaml_str(
            "types:\n  - { name: Ghost }\n",
        )
        .unwrap();
        let loader = RelationLoader::new(RelationCatalog::new(), Arc::new(DataFusionEngine::new()));
        let mut registry = ObjectRegistry::new();
        assert!(matches!(
            config.apply(&mut registry, &loader).await,
            Err(GraphSchemaError::RelationLoad { type_name, .. }) if type_name == "Ghost"
        ));
    }
}
