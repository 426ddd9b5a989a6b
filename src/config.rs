use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Which relation engine serves traversals
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    ClickHouse,
    DataFusion,
}

#[derive(Debug, Error)]
#[error("unknown engine '{0}', expected 'clickhouse' or 'datafusion'")]
pub struct UnknownEngine(String);

impl FromStr for EngineKind {
    type Err = UnknownEngine;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clickhouse" => Ok(EngineKind::ClickHouse),
            "datafusion" => Ok(EngineKind::DataFusion),
            other => Err(UnknownEngine(other.to_string())),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::ClickHouse => f.write_str("clickhouse"),
            EngineKind::DataFusion => f.write_str("datafusion"),
        }
    }
}

/// Server configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host address
    #[validate(length(min = 1, message = "HTTP host cannot be empty"))]
    pub http_host: String,

    /// HTTP server port (1-65535)
    #[validate(range(
        min = 1,
        max = 65535,
        message = "HTTP port must be between 1 and 65535"
    ))]
    pub http_port: u16,

    /// Registration file declaring catalog, types and edges
    #[validate(length(min = 1, message = "Schema path cannot be empty"))]
    pub schema_path: String,

    #[serde(default)]
    pub engine: EngineKind,

    /// Default `limit` of every edge field
    #[validate(range(
        min = 1,
        max = 100000,
        message = "Default limit must be between 1 and 100000"
    ))]
    #[serde(default = "default_limit")]
    pub default_limit: i64,

    /// Whether to run server in daemon mode
    #[serde(default)]
    pub daemon: bool,
}

fn default_limit() -> i64 {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            schema_path: "schema.yaml".to_string(),
            engine: EngineKind::ClickHouse,
            default_limit: default_limit(),
            daemon: false,
        }
    }
}

impl ServerConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            http_host: env::var("RELGRAPH_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: parse_env_var("RELGRAPH_PORT", "8080")?,
            schema_path: env::var("RELGRAPH_SCHEMA_PATH")
                .unwrap_or_else(|_| "schema.yaml".to_string()),
            engine: parse_env_var("RELGRAPH_ENGINE", "clickhouse")?,
            default_limit: parse_env_var("RELGRAPH_DEFAULT_LIMIT", "100")?,
            daemon: false, // Environment-based config always runs in foreground
        };

        config.validate()?;
        Ok(config)
    }

    /// Environment configuration with the options given on the command line on top
    pub fn from_env_with_overrides(cli: CliConfig) -> Result<Self, ConfigError> {
        let mut config = Self::from_env()?;
        config.merge(cli);
        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply the options given on the command line; absent ones keep their value
    pub fn merge(&mut self, cli: CliConfig) {
        if let Some(http_host) = cli.http_host {
            self.http_host = http_host;
        }
        if let Some(http_port) = cli.http_port {
            self.http_port = http_port;
        }
        if let Some(schema_path) = cli.schema_path {
            self.schema_path = schema_path;
        }
        if let Some(engine) = cli.engine {
            self.engine = engine;
        }
        if let Some(default_limit) = cli.default_limit {
            self.default_limit = default_limit;
        }
        self.daemon |= cli.daemon;
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug, Default)]
pub struct CliConfig {
    pub http_host: Option<String>,
    pub http_port: Option<u16>,
    pub schema_path: Option<String>,
    pub engine: Option<EngineKind>,
    pub default_limit: Option<i64>,
    pub daemon: bool,
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.engine, EngineKind::ClickHouse);
        assert_eq!(config.default_limit, 100);
    }

    #[test]
    fn test_invalid_port_range() {
        let config = ServerConfig {
            http_port: 0, // Invalid
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_default_limit() {
        for default_limit in [0, -1, 100001] {
            let config = ServerConfig {
                default_limit,
                ..Default::default()
            };
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_empty_host_and_schema_path() {
        let config = ServerConfig {
            http_host: "".to_string(), // Invalid
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            schema_path: "".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_kind_parsing() {
        assert_eq!(
            "datafusion".parse::<EngineKind>().unwrap(),
            EngineKind::DataFusion
        );
        assert_eq!(
            " ClickHouse ".parse::<EngineKind>().unwrap(),
            EngineKind::ClickHouse
        );
        assert!("memory".parse::<EngineKind>().is_err());
        assert_eq!(EngineKind::DataFusion.to_string(), "datafusion");
    }

    #[test]
    #[serial]
    fn test_from_env() {
        unsafe {
            env::set_var("RELGRAPH_PORT", "9090");
            env::set_var("RELGRAPH_ENGINE", "datafusion");
            env::set_var("RELGRAPH_SCHEMA_PATH", "/etc/relgraph/schema.yaml");
        }
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.http_port, 9090);
        assert_eq!(config.engine, EngineKind::DataFusion);
        assert_eq!(config.schema_path, "/etc/relgraph/schema.yaml");
        assert_eq!(config.default_limit, 100);

        unsafe {
            env::set_var("RELGRAPH_PORT", "not-a-port");
        }
        assert!(matches!(
            ServerConfig::from_env(),
            Err(ConfigError::Parse { field, .. }) if field == "RELGRAPH_PORT"
        ));

        unsafe {
            env::remove_var("RELGRAPH_PORT");
            env::remove_var("RELGRAPH_ENGINE");
            env::remove_var("RELGRAPH_SCHEMA_PATH");
        }
    }

    #[test]
    #[serial]
    fn test_cli_options_override_env() {
        unsafe {
            env::set_var("RELGRAPH_PORT", "9090");
            env::set_var("RELGRAPH_ENGINE", "datafusion");
            env::set_var("RELGRAPH_DEFAULT_LIMIT", "25");
        }
        let cli = CliConfig {
            http_port: Some(7070),
            schema_path: Some("cli.yaml".to_string()),
            daemon: true,
            ..Default::default()
        };
        let config = ServerConfig::from_env_with_overrides(cli).unwrap();
        assert_eq!(config.http_port, 7070);
        assert_eq!(config.schema_path, "cli.yaml");
        assert_eq!(config.engine, EngineKind::DataFusion);
        assert_eq!(config.default_limit, 25);
        assert_eq!(config.http_host, "0.0.0.0");
        assert!(config.daemon);

        let invalid = CliConfig {
            default_limit: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            ServerConfig::from_env_with_overrides(invalid),
            Err(ConfigError::Validation(_))
        ));

        unsafe {
            env::remove_var("RELGRAPH_PORT");
            env::remove_var("RELGRAPH_ENGINE");
            env::remove_var("RELGRAPH_DEFAULT_LIMIT");
        }
    }

    #[test]
    fn test_merge_keeps_unset_options() {
        let mut config = ServerConfig::default();
        config.merge(CliConfig {
            engine: Some(EngineKind::DataFusion),
            ..Default::default()
        });
        assert_eq!(config.engine, EngineKind::DataFusion);
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.schema_path, "schema.yaml");
        assert!(!config.daemon);
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "http_host: 127.0.0.1\nhttp_port: 8181\nschema_path: graph.yaml\nengine: datafusion\n"
        )
        .unwrap();

        let config = ServerConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.http_host, "127.0.0.1");
        assert_eq!(config.http_port, 8181);
        assert_eq!(config.engine, EngineKind::DataFusion);
        assert_eq!(config.default_limit, 100);
        assert!(!config.daemon);
    }
}
