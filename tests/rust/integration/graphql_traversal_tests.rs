//! End-to-end traversals through the GraphQL schema against file-backed relations.

use std::fs;

use relgraph::graph_schema::GraphSchemaError;
use relgraph::server::ServerError;
use serde_json::{json, Value};

use super::fixtures::{execute, Fixture};

/// Grouped rows come back in no particular order.
fn by_status(rows: &Value) -> Vec<Value> {
    let mut rows = rows.as_array().cloned().unwrap_or_default();
    rows.sort_by_key(|row| row["status"].as_str().map(str::to_string));
    rows
}

#[tokio::test]
async fn test_customer_invoices_with_limit() {
    let fixture = Fixture::new();
    let state = fixture.state().await.unwrap();

    let (data, errors) = execute(
        &state,
        "{ customers(filter: {id: 7}) { id region invoices(limit: 2) { id amount } } }",
    )
    .await;
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(
        data,
        json!({"customers": [{
            "id": 7,
            "region": "west",
            "invoices": [{"id": 1, "amount": 10.5}, {"id": 2, "amount": 4.0}]
        }]})
    );
}

#[tokio::test]
async fn test_limit_and_offset() {
    let fixture = Fixture::new();
    let state = fixture.state().await.unwrap();

    let (data, _) = execute(&state, "{ customers(limit: 0, offset: 2) { id } }").await;
    assert_eq!(data, json!({"customers": [{"id": 7}, {"id": 8}, {"id": 9}]}));

    let (data, _) = execute(&state, "{ customers(limit: 1, offset: 1) { id } }").await;
    assert_eq!(data, json!({"customers": [{"id": 8}]}));

    let (data, _) = execute(&state, "{ customers(limit: null, offset: null) { id } }").await;
    assert_eq!(data["customers"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_filters_combine_with_join_key() {
    let fixture = Fixture::new();
    let state = fixture.state().await.unwrap();

    let (data, errors) = execute(
        &state,
        r#"{ customers(filter: {region: "west"}) {
              id
              invoices(filter: {status: "paid", amount: null}) { id }
           } }"#,
    )
    .await;
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(
        data,
        json!({"customers": [
            {"id": 7, "invoices": [{"id": 1}, {"id": 3}]},
            {"id": 9, "invoices": []}
        ]})
    );
}

#[tokio::test]
async fn test_nested_edge_without_selecting_join_column() {
    let fixture = Fixture::new();
    let state = fixture.state().await.unwrap();

    let (data, errors) = execute(
        &state,
        r#"{ invoices(filter: {status: "open"}) { id customer { region } } }"#,
    )
    .await;
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(
        data,
        json!({"invoices": [
            {"id": 2, "customer": [{"region": "west"}]},
            {"id": 4, "customer": [{"region": "east"}]}
        ]})
    );
}

#[tokio::test]
async fn test_distinct_counts_grouped_by_plain_fields() {
    let fixture = Fixture::new();
    let state = fixture.state().await.unwrap();

    let (data, errors) = execute(
        &state,
        "{ customers(filter: {id: 7}) { invoices { status _distinct_ { id amount } } } }",
    )
    .await;
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(
        by_status(&data["customers"][0]["invoices"]),
        vec![
            json!({"status": "open", "_distinct_": {"id": 1, "amount": 1}}),
            json!({"status": "paid", "_distinct_": {"id": 2, "amount": 2}}),
        ]
    );
}

#[tokio::test]
async fn test_distinct_counts_without_plain_fields() {
    let fixture = Fixture::new();
    let state = fixture.state().await.unwrap();

    let (data, errors) = execute(&state, "{ invoices { _distinct_ { customer_id status } } }").await;
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(
        data,
        json!({"invoices": [{"_distinct_": {"customer_id": 2, "status": 2}}]})
    );
}

#[tokio::test]
async fn test_plain_fields_have_no_distinct_entry() {
    let fixture = Fixture::new();
    let state = fixture.state().await.unwrap();

    let (data, errors) = execute(&state, "{ invoices(limit: 1) { __typename id } }").await;
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(data, json!({"invoices": [{"__typename": "Invoice", "id": 1}]}));
}

#[tokio::test]
async fn test_distinct_without_counts_groups_plain_fields() {
    let fixture = Fixture::new();
    let state = fixture.state().await.unwrap();

    let (data, errors) = execute(&state, "{ invoices { status _distinct_ { __typename } } }").await;
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(
        by_status(&data["invoices"]),
        vec![
            json!({"status": "open", "_distinct_": {"__typename": "InvoiceCounts"}}),
            json!({"status": "paid", "_distinct_": {"__typename": "InvoiceCounts"}}),
        ]
    );
}

#[tokio::test]
async fn test_traversal_failure_is_scoped_to_its_field() {
    let fixture = Fixture::new();
    let state = fixture.state().await.unwrap();
    fs::remove_file(fixture.path("invoice.jsonl")).unwrap();

    let (data, errors) = execute(&state, "{ customers(limit: 1) { id } invoices { id } }").await;
    assert_eq!(data["customers"], json!([{"id": 7}]));
    assert!(data.get("invoices").is_none_or(Value::is_null), "{}", data);
    assert_eq!(errors.len(), 1, "{:?}", errors);
    assert!(errors[0].contains("Invoice"), "{}", errors[0]);
}

#[tokio::test]
async fn test_create_mutation_echoes_input() {
    let fixture = Fixture::new();
    let state = fixture.state().await.unwrap();

    let (data, errors) = execute(
        &state,
        r#"mutation { createCustomer(data: {id: 10, region: null}) { id region } }"#,
    )
    .await;
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(data, json!({"createCustomer": {"id": 10, "region": null}}));

    // Nothing was written
    let (data, _) = execute(&state, "{ customers(limit: 0) { id } }").await;
    assert_eq!(data["customers"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn test_building_twice_gives_identical_answers() {
    let fixture = Fixture::new();
    let first = fixture.state().await.unwrap();
    let second = fixture.state().await.unwrap();

    let query = "{ customers { region invoices { _distinct_ { status } } } }";
    assert_eq!(execute(&first, query).await, execute(&second, query).await);
}

#[tokio::test]
async fn test_edge_to_unregistered_type_fails_at_startup() {
    let fixture = Fixture::with_registration(
        r#"
catalog:
  Customer: { path: customer.jsonl, format: JSONEachRow }
types:
  - { name: Customer }
edges:
  - { source: Query, field: customers, target: Customer }
  - { source: Customer, field: orders, target: Order }
"#,
    );
    match fixture.state().await {
        Err(ServerError::Schema(err)) => {
            assert_eq!(err, GraphSchemaError::unknown_type("Order"))
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("registration with an unknown target must fail"),
    }
}
