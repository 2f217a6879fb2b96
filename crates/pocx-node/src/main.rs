//! PoCX node binary.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod node;

use config::NodeConfig;
use node::Node;

/// Proof-of-capacity consensus node.
#[derive(Parser, Debug)]
#[command(name = "pocx-node")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "pocx-node.toml")]
    pub config: PathBuf,

    /// Network to run on (mainnet, testnet, regtest)
    #[arg(short, long)]
    pub network: Option<String>,

    /// API bind address
    #[arg(long)]
    pub api_bind: Option<String>,

    /// Generate a forging key when none is configured
    #[arg(long)]
    pub generate_key: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("starting pocx-node v{}", env!("CARGO_PKG_VERSION"));

    let config = NodeConfig::load(&args.config, &args)?;
    info!(network = %config.network, api = %config.api.bind_address, "configuration loaded");

    let node = Node::new(config)?;
    node.run().await
}
