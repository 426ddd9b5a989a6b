use clap::Parser;
use relgraph::{config, server};

/// relgraph - GraphQL traversals over columnar relations
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// HTTP server host address [env: RELGRAPH_HOST, default: 0.0.0.0]
    #[arg(long)]
    http_host: Option<String>,

    /// HTTP server port [env: RELGRAPH_PORT, default: 8080]
    #[arg(long)]
    http_port: Option<u16>,

    /// Registration file (catalog, types, edges) [env: RELGRAPH_SCHEMA_PATH, default: schema.yaml]
    #[arg(long)]
    schema: Option<String>,

    /// Relation engine: clickhouse or datafusion [env: RELGRAPH_ENGINE, default: clickhouse]
    #[arg(long)]
    engine: Option<config::EngineKind>,

    /// Default `limit` of edge fields [env: RELGRAPH_DEFAULT_LIMIT, default: 100]
    #[arg(long)]
    default_limit: Option<i64>,

    /// Server configuration file; replaces the environment and the options above
    #[arg(long)]
    config: Option<String>,

    /// Run server in daemon mode (also stops on SIGTERM)
    #[arg(long)]
    daemon: bool,
}

impl From<Cli> for config::CliConfig {
    fn from(cli: Cli) -> Self {
        config::CliConfig {
            http_host: cli.http_host,
            http_port: cli.http_port,
            schema_path: cli.schema,
            engine: cli.engine,
            default_limit: cli.default_limit,
            daemon: cli.daemon,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::info!("relgraph v{}", env!("CARGO_PKG_VERSION"));

    let config = match cli.config.clone() {
        Some(path) => config::ServerConfig::from_yaml_file(path)?,
        None => config::ServerConfig::from_env_with_overrides(cli.into())?,
    };

    server::run_with_config(config).await?;
    Ok(())
}
