use std::sync::Arc;

use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse},
    Json,
};

use super::AppState;

pub async fn graphql_handler(
    State(state): State<Arc<AppState>>,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let request = req.into_inner();
    log::debug!("GraphQL request: {}", request.query);
    let response = state.schema.execute(request).await;
    if !response.errors.is_empty() {
        log::warn!("GraphQL response carries {} error(s)", response.errors.len());
    }
    response.into()
}

pub async fn graphql_playground() -> impl IntoResponse {
    Html(playground_source(GraphQLPlaygroundConfig::new("/graphql")))
}

/// Simple health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "relgraph",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "engine": state.engine,
        "types": state.graph.types().len(),
    }))
}

/// Schema definition language of the served schema
pub async fn schema_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.schema.sdl(),
    )
}
