//! Proofchain Node - proof-of-work ledger node.
//!
//! This is the main entry point for running a proofchain node.

use anyhow::Context;
use clap::Parser;
use proofchain_node::api::AppState;
use proofchain_node::config::NodeConfig;
use proofchain_node::observability::{init_logging, LogFormat};
use proofchain_node::schema::RecordSchema;
use proofchain_node::server;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Proofchain Node - proof-of-work ledger with longest-chain consensus
#[derive(Parser, Debug)]
#[command(name = "proofchain-node")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "proofchain.yaml")]
    config: PathBuf,

    /// API listen address
    #[arg(long)]
    api_addr: Option<SocketAddr>,

    /// Port to listen on, keeping the configured host
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    /// Leading hex zeros required of a proof
    #[arg(long)]
    difficulty: Option<u8>,

    /// Check block indices and the genesis sentinel of peer chains
    #[arg(long)]
    strict_index: Option<bool>,

    /// Record shape accepted by POST /transactions/new
    #[arg(long, value_enum)]
    record_schema: Option<RecordSchema>,

    /// Peer to register at startup (repeatable)
    #[arg(long = "peer", value_name = "ADDR")]
    peers: Vec<String>,

    /// Bound on a single peer chain fetch, in milliseconds
    #[arg(long)]
    peer_timeout_ms: Option<u64>,

    /// Seconds between automatic resolution rounds (0 disables)
    #[arg(long)]
    resolve_interval_secs: Option<u64>,

    /// Path peers serve their chain on
    #[arg(long)]
    peer_chain_path: Option<String>,
}

impl Args {
    /// Applies command-line overrides on top of the file configuration.
    fn apply(self, config: &mut NodeConfig) {
        if let Some(addr) = self.api_addr {
            config.api_addr = addr;
        }
        if let Some(port) = self.port {
            config.api_addr.set_port(port);
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty;
        }
        if let Some(strict) = self.strict_index {
            config.strict_index = strict;
        }
        if let Some(schema) = self.record_schema {
            config.record_schema = schema;
        }
        config.peers.extend(self.peers);
        if let Some(timeout) = self.peer_timeout_ms {
            config.peer_timeout_ms = timeout;
        }
        if let Some(interval) = self.resolve_interval_secs {
            config.resolve_interval_secs = interval;
        }
        if let Some(path) = self.peer_chain_path {
            config.peer_chain_path = path;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = NodeConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    args.apply(&mut config);
    config.validate()?;

    init_logging(&config.log_level, config.log_format);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting proofchain node");
    tracing::info!(
        api_addr = %config.api_addr,
        difficulty = config.difficulty,
        strict_index = config.strict_index,
        record_schema = ?config.record_schema,
        peers = config.peers.len(),
        resolve_interval_secs = config.resolve_interval_secs,
        "Node configuration"
    );

    let state = AppState::from_config(&config)?;
    let listener = tokio::net::TcpListener::bind(config.api_addr)
        .await
        .with_context(|| format!("binding {}", config.api_addr))?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            server::shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let resolver = config
        .resolve_interval()
        .map(|period| server::spawn_resolve_loop(state.clone(), period, shutdown.clone()));

    tracing::info!("Node is ready. Press Ctrl+C to stop.");
    server::serve(listener, state, shutdown).await?;

    if let Some(resolver) = resolver {
        resolver.await?;
    }
    tracing::info!("Proofchain node stopped");

    Ok(())
}
