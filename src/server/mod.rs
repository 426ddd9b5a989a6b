use std::sync::Arc;
use std::time::Duration;

use async_graphql::dynamic::Schema;
use axum::{routing::get, Router};
use dotenvy::dotenv;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer,
};

use crate::config::{EngineKind, ServerConfig};
use crate::graph_schema::{GraphSchemaError, ObjectRegistry, RegistrationConfig};
use crate::relation_catalog::{
    ClickHouseEngine, DataFusionEngine, EngineError, RelationEngine, RelationLoader,
};
use crate::schema_graph::SchemaGraph;
use handlers::{graphql_handler, graphql_playground, health_check, schema_handler};

pub mod handlers;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Schema error: {0}")]
    Schema(#[from] GraphSchemaError),
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Failed to bind HTTP listener to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[derive(Clone)]
pub struct AppState {
    pub schema: Schema,
    pub graph: SchemaGraph,
    pub engine: &'static str,
    pub config: ServerConfig,
}

fn create_engine(kind: EngineKind) -> Result<Arc<dyn RelationEngine>, EngineError> {
    Ok(match kind {
        EngineKind::ClickHouse => Arc::new(ClickHouseEngine::from_env()?),
        EngineKind::DataFusion => Arc::new(DataFusionEngine::new()),
    })
}

/// Register everything declared in the registration file, compile the schema graph
/// and assemble the GraphQL schema on top of it.
pub async fn build_state_with_engine(
    config: &ServerConfig,
    engine: Arc<dyn RelationEngine>,
) -> Result<AppState, ServerError> {
    let registration = RegistrationConfig::from_yaml_file(&config.schema_path)?;
    let loader = Arc::new(RelationLoader::new(registration.catalog.clone(), engine));
    log::info!(
        "Loaded registration from {}: {} relation(s), {} type(s), {} edge(s)",
        config.schema_path,
        loader.catalog().len(),
        registration.types.len(),
        registration.edges.len()
    );

    let mut registry = ObjectRegistry::new();
    registration.apply(&mut registry, &loader).await?;
    let graph = registry.compile()?;
    let schema = graph.build_graphql(loader.clone(), config.default_limit)?;

    Ok(AppState {
        schema,
        graph,
        engine: loader.engine_name(),
        config: config.clone(),
    })
}

pub async fn build_state(config: &ServerConfig) -> Result<AppState, ServerError> {
    build_state_with_engine(config, create_engine(config.engine)?).await
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/graphql", get(graphql_playground).post(graphql_handler))
        .route("/health", get(health_check))
        .route("/schema", get(schema_handler))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CatchPanicLayer::new())
        .with_state(Arc::new(state))
}

pub async fn run_with_config(config: ServerConfig) -> Result<(), ServerError> {
    dotenv().ok();

    log::info!(
        "Server configuration: http={}:{}, engine={}, schema={}",
        config.http_host,
        config.http_port,
        config.engine,
        config.schema_path
    );

    let state = build_state(&config).await?;
    log::info!(
        "Schema ready: {} type(s) served by the {} engine",
        state.graph.types().len(),
        state.engine
    );

    let http_bind_address = format!("{}:{}", config.http_host, config.http_port);
    let listener = TcpListener::bind(&http_bind_address)
        .await
        .map_err(|source| ServerError::Bind {
            address: http_bind_address.clone(),
            source,
        })?;
    log::info!("GraphQL endpoint: http://{}/graphql", http_bind_address);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(config.daemon))
        .await
        .map_err(ServerError::Serve)?;

    log::info!("Server stopped");
    Ok(())
}

/// Ctrl+C, plus SIGTERM in daemon mode on unix.
async fn shutdown_signal(daemon: bool) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        if !daemon {
            return std::future::pending::<()>().await;
        }
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = async {
        let _ = daemon;
        std::future::pending::<()>().await
    };

    tokio::select! {
        _ = ctrl_c => log::info!("Received Ctrl+C, shutting down..."),
        _ = terminate => log::info!("Received SIGTERM, shutting down..."),
    }
}
