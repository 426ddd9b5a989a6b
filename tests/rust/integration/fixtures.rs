//! Shared sales fixture: customers and invoices as JSONEachRow files plus a
//! registration file, served by the embedded DataFusion engine.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use relgraph::config::{EngineKind, ServerConfig};
use relgraph::relation_catalog::DataFusionEngine;
use relgraph::server::{self, AppState};
use serde_json::Value;
use tempfile::TempDir;

pub const CUSTOMERS: &str = r#"{"id": 7, "region": "west"}
{"id": 8, "region": "east"}
{"id": 9, "region": "west"}
"#;

pub const INVOICES: &str = r#"{"id": 1, "customer_id": 7, "amount": 10.5, "status": "paid"}
{"id": 2, "customer_id": 7, "amount": 4.0, "status": "open"}
{"id": 3, "customer_id": 7, "amount": 4.0, "status": "paid"}
{"id": 4, "customer_id": 8, "amount": 99.0, "status": "open"}
"#;

pub const REGISTRATION: &str = r#"
catalog:
  Customer: { path: customer.jsonl, format: JSONEachRow }
  Invoice:  { path: invoice.jsonl, format: JSONEachRow }
types:
  - { name: Customer, mutable: true }
  - { name: Invoice }
edges:
  - { source: Query, field: customers, target: Customer }
  - { source: Query, field: invoices, target: Invoice }
  - { source: Customer, field: invoices, target: Invoice, join_on: { id: customer_id } }
  - { source: Invoice, field: customer, target: Customer, join_on: { customer_id: id } }
"#;

pub struct Fixture {
    pub dir: TempDir,
    pub config: ServerConfig,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_registration(REGISTRATION)
    }

    pub fn with_registration(registration: &str) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("customer.jsonl"), CUSTOMERS).expect("customers");
        fs::write(dir.path().join("invoice.jsonl"), INVOICES).expect("invoices");
        let schema_path = dir.path().join("schema.yaml");
        fs::write(&schema_path, registration).expect("registration");

        let config = ServerConfig {
            schema_path: schema_path.to_string_lossy().into_owned(),
            engine: EngineKind::DataFusion,
            ..Default::default()
        };
        Self { dir, config }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.path().join(file)
    }

    pub async fn state(&self) -> Result<AppState, server::ServerError> {
        server::build_state_with_engine(&self.config, Arc::new(DataFusionEngine::new())).await
    }
}

/// Run a query and return `(data, error messages)` as JSON.
pub async fn execute(state: &AppState, query: &str) -> (Value, Vec<String>) {
    let response = state.schema.execute(query).await;
    let errors = response.errors.iter().map(|e| e.message.clone()).collect();
    (response.data.into_json().expect("json data"), errors)
}
