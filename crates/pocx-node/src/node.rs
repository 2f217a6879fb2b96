//! Component wiring.

use crate::config::NodeConfig;
use anyhow::{bail, Context, Result};
use pocx_api::{build_router, AppState};
use pocx_chain::ChainManager;
use pocx_consensus::{ChainNetwork, ChainParams};
use pocx_mining::{Scheduler, SchedulerHandles};
use pocx_wallet::KeyStore;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// A running node: chain, wallet, scheduler and API glued together.
pub struct Node {
    config: NodeConfig,
    chain: Arc<ChainManager>,
    keystore: Arc<KeyStore>,
    scheduler: Arc<Scheduler>,
}

fn params_for(network: &str) -> Result<ChainParams> {
    let network = ChainNetwork::from_str(network).map_err(anyhow::Error::msg)?;
    Ok(match network {
        ChainNetwork::Mainnet => ChainParams::mainnet(),
        ChainNetwork::Testnet => ChainParams::testnet(),
        ChainNetwork::Regtest => ChainParams::regtest(),
    })
}

impl Node {
    /// Build all components from the configuration.
    pub fn new(config: NodeConfig) -> Result<Self> {
        let params = params_for(&config.network)?;
        info!(network = %params.network, "initialising node");

        let chain = Arc::new(ChainManager::new(params.clone()));

        let keystore = Arc::new(KeyStore::new());
        for key_hex in &config.wallet.keys {
            let bytes = hex::decode(key_hex).context("invalid wallet key hex")?;
            let secret: [u8; 32] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| anyhow::anyhow!("wallet keys must be 32 bytes"))?;
            let account = keystore.import_secret(&secret)?;
            info!(account = %account, "wallet key imported");
        }
        if keystore.accounts().is_empty() {
            if !config.wallet.generate_key {
                bail!("no wallet keys configured; set wallet.keys or --generate-key");
            }
            let account = keystore.generate_key();
            info!(account = %account, "forging key generated");
        }

        let scheduler = Arc::new(Scheduler::start(SchedulerHandles {
            chain: chain.clone(),
            assignments: chain.clone(),
            templates: chain.clone(),
            sink: chain.clone(),
            signer: keystore.clone(),
            params,
        }));

        Ok(Self {
            config,
            chain,
            keystore,
            scheduler,
        })
    }

    /// Serve the API until shutdown is requested.
    pub async fn run(&self) -> Result<()> {
        let state = AppState::new(
            self.chain.clone(),
            self.scheduler.clone(),
            self.keystore.clone(),
        );
        let router = build_router(state);

        let listener = tokio::net::TcpListener::bind(&self.config.api.bind_address)
            .await
            .with_context(|| format!("failed to bind {}", self.config.api.bind_address))?;
        info!(address = %self.config.api.bind_address, "API listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.ok();
                info!("shutdown signal received");
            })
            .await
            .context("API server failed")?;

        self.scheduler.shutdown();
        Ok(())
    }

    pub fn chain(&self) -> &Arc<ChainManager> {
        &self.chain
    }
}
