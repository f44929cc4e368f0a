mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use quarry::{Client, ClientConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "quarry")]
#[command(about = "Quarry - Elasticsearch cluster tools")]
#[command(version)]
struct Cli {
    /// Node URL; repeat for several seed nodes
    #[arg(long = "url", env = "QUARRY_URL", value_delimiter = ',', global = true)]
    urls: Vec<String>,

    /// TOML client configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Talk only to the given URLs
    #[arg(long, global = true)]
    no_sniff: bool,

    /// Skip health checks at startup and in the background
    #[arg(long, global = true)]
    no_healthcheck: bool,

    /// Retries per request
    #[arg(long, global = true)]
    retries: Option<u32>,

    #[arg(long, value_enum, default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show name, cluster and version of the first node
    Ping,

    /// Show cluster health
    Health {
        /// Block until the cluster reaches this status (green, yellow, red)
        #[arg(long)]
        wait_for: Option<String>,

        /// How long to wait, e.g. 30s
        #[arg(long, default_value = "30s")]
        timeout: String,
    },

    /// Sniff the cluster and list the connection pool
    Nodes,

    /// Manage indices
    Indices {
        #[command(subcommand)]
        action: IndicesAction,
    },

    /// Run a query_string search and print hits as JSON lines
    Search {
        index: String,

        /// Lucene query; match_all when omitted
        #[arg(short, long)]
        query: Option<String>,

        #[arg(long, default_value = "10")]
        size: u64,
    },

    /// Count matching documents
    Count {
        index: String,

        #[arg(short, long)]
        query: Option<String>,
    },

    /// Load an NDJSON file of documents through the bulk processor
    Bulk {
        index: String,

        /// Document file, `-` for stdin
        #[arg(short, long)]
        file: String,

        /// Mapping type of the documents
        #[arg(long = "type", default_value = "_doc")]
        typ: String,

        /// Actions per bulk request
        #[arg(long, default_value = "1000")]
        batch: usize,

        #[arg(long, default_value = "1")]
        workers: usize,
    },

    /// Copy all documents from one index to another
    Reindex {
        source: String,
        dest: String,

        /// Wait for the reindex to finish instead of returning a task id
        #[arg(long)]
        wait: bool,
    },
}

#[derive(Subcommand, Debug)]
enum IndicesAction {
    Create {
        name: String,
        #[arg(long)]
        shards: Option<u32>,
        #[arg(long)]
        replicas: Option<u32>,
    },
    Delete {
        name: String,
    },
    Exists {
        name: String,
    },
    Refresh {
        name: String,
    },
}

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
    );
    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

fn client_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if !cli.urls.is_empty() {
        config.urls = cli.urls.clone();
    }
    if cli.no_sniff {
        config.sniff = false;
    }
    if cli.no_healthcheck {
        config.healthcheck = false;
    }
    if let Some(retries) = cli.retries {
        config.max_retries = retries;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let config = client_config(&cli)?;
    let client = Client::new(config.clone())
        .await
        .context("connecting to cluster")?;

    let result = match cli.command {
        Commands::Ping => commands::run_ping(&client, &config).await,
        Commands::Health { wait_for, timeout } => {
            commands::run_health(&client, wait_for.as_deref(), &timeout).await
        }
        Commands::Nodes => commands::run_nodes(&client, &config).await,
        Commands::Indices { action } => match action {
            IndicesAction::Create {
                name,
                shards,
                replicas,
            } => {
                let shards = shards.or(config.shards);
                let replicas = replicas.or(config.replicas);
                commands::run_create_index(&client, &name, shards, replicas).await
            }
            IndicesAction::Delete { name } => commands::run_delete_index(&client, &name).await,
            IndicesAction::Exists { name } => commands::run_index_exists(&client, &name).await,
            IndicesAction::Refresh { name } => commands::run_refresh(&client, &name).await,
        },
        Commands::Search { index, query, size } => {
            commands::run_search(&client, &index, query.as_deref(), size).await
        }
        Commands::Count { index, query } => {
            commands::run_count(&client, &index, query.as_deref()).await
        }
        Commands::Bulk {
            index,
            file,
            typ,
            batch,
            workers,
        } => commands::run_bulk(&client, &index, &typ, &file, batch, workers).await,
        Commands::Reindex { source, dest, wait } => {
            commands::run_reindex(&client, &source, &dest, wait).await
        }
    };

    client.stop().await;
    result
}
