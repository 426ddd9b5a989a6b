//! HTTP surface: routes served by the axum router.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use relgraph::server;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::fixtures::Fixture;

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health() {
    let fixture = Fixture::new();
    let app = server::router(fixture.state().await.unwrap());

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["engine"], "datafusion");
    assert_eq!(body["types"], 2);
}

#[tokio::test]
async fn test_schema_sdl() {
    let fixture = Fixture::new();
    let app = server::router(fixture.state().await.unwrap());

    let response = app
        .oneshot(Request::get("/schema").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let sdl = body_text(response).await;
    assert!(sdl.contains("type Customer {"));
    assert!(sdl.contains("input InvoiceFilter {"));
    assert!(sdl.contains("type InvoiceCounts {"));
    assert!(sdl.contains("createCustomer"));
}

#[tokio::test]
async fn test_graphql_post() {
    let fixture = Fixture::new();
    let app = server::router(fixture.state().await.unwrap());

    let request = Request::post("/graphql")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"query": "{ customers(limit: 1) { id region } }"}).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        body["data"],
        json!({"customers": [{"id": 7, "region": "west"}]})
    );
}

#[tokio::test]
async fn test_graphql_playground() {
    let fixture = Fixture::new();
    let app = server::router(fixture.state().await.unwrap());

    let response = app
        .oneshot(Request::get("/graphql").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("/graphql"));
}
