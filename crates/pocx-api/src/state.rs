//! Shared application state.

use pocx_chain::ChainManager;
use pocx_consensus::ChainParams;
use pocx_mining::Scheduler;
use pocx_wallet::KeyStore;
use std::sync::Arc;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The host chain (block index, assignments, coins).
    pub chain: Arc<ChainManager>,
    /// Forging scheduler accepting validated submissions.
    pub scheduler: Arc<Scheduler>,
    /// Wallet key store.
    pub keystore: Arc<KeyStore>,
    /// Chain parameters.
    pub params: ChainParams,
}

impl AppState {
    pub fn new(
        chain: Arc<ChainManager>,
        scheduler: Arc<Scheduler>,
        keystore: Arc<KeyStore>,
    ) -> Self {
        let params = chain.params().clone();
        Self {
            chain,
            scheduler,
            keystore,
            params,
        }
    }
}
