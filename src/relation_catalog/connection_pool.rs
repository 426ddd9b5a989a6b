//! ClickHouse client pool
//!
//! One `clickhouse::Client` per configured node. Traversals run concurrently, so every
//! caller gets its own cloned client handle, picked round-robin across nodes.
//!
//! Nodes come from `CLICKHOUSE_URL`, or from `CLICKHOUSE_URLS` (comma separated) when
//! several replicas should share the read load.

use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};

use clickhouse::Client;

use super::errors::EngineError;

pub struct ConnectionPool {
    clients: Vec<Client>,
    round_robin: AtomicUsize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub urls: Vec<String>,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ConnectionPool {
    pub fn new(config: ConnectionConfig) -> Result<Self, EngineError> {
        if config.urls.is_empty() {
            return Err(EngineError::Connection(
                "at least one ClickHouse URL is required".to_string(),
            ));
        }

        let clients: Vec<Client> = config
            .urls
            .iter()
            .map(|url| config.create_client_for_url(url))
            .collect();

        log::info!(
            "ClickHouse pool ready: {} node(s), database '{}'",
            clients.len(),
            config.database
        );

        Ok(Self {
            clients,
            round_robin: AtomicUsize::new(0),
        })
    }

    pub fn from_env() -> Result<Self, EngineError> {
        Self::new(ConnectionConfig::from_env()?)
    }

    /// Next client in round-robin order.
    pub fn get_client(&self) -> Client {
        let idx = self.round_robin.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        self.clients[idx].clone()
    }

    pub fn node_count(&self) -> usize {
        self.clients.len()
    }
}

impl ConnectionConfig {
    pub fn from_env() -> Result<Self, EngineError> {
        let urls = match env::var("CLICKHOUSE_URLS") {
            Ok(list) => list
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => vec![env::var("CLICKHOUSE_URL")
                .map_err(|_| EngineError::Connection("CLICKHOUSE_URL not set".to_string()))?],
        };

        Ok(Self {
            urls,
            user: env::var("CLICKHOUSE_USER")
                .map_err(|_| EngineError::Connection("CLICKHOUSE_USER not set".to_string()))?,
            // Allow empty password for local development
            password: env::var("CLICKHOUSE_PASSWORD").unwrap_or_default(),
            database: env::var("CLICKHOUSE_DATABASE").unwrap_or_else(|_| "default".to_string()),
        })
    }

    fn create_client_for_url(&self, url: &str) -> Client {
        Client::default()
            .with_url(url)
            .with_user(&self.user)
            .with_password(&self.password)
            .with_database(&self.database)
            // Row values are decoded from JSONEachRow; keep 64-bit integers numeric
            .with_option("output_format_json_quote_64bit_integers", "0")
    }
}
