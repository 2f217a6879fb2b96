//! Minimal transaction surface and wallet-side transaction building.
//!
//! The core only needs the shape of a transaction the host chain exposes:
//! inputs naming spent coins, outputs carrying value and a script. Script
//! validation and mempool policy stay with the host chain.

use crate::opcodes::{
    create_assignment_op_return, create_p2wpkh_script, create_revocation_op_return,
};
use crate::{AssignmentError, AssignmentResult};
use pocx_consensus::{double_sha256, AccountId};
use tracing::debug;

/// Reference to an output of a prior transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutPoint {
    pub txid: [u8; 32],
    pub vout: u32,
}

/// Transaction input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxIn {
    pub prevout: OutPoint,
}

/// Transaction output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut {
    /// Value in base units.
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

/// A transaction as seen by the assignment layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Transaction {
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
}

impl Transaction {
    /// Canonical serialization for the txid.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            out.extend_from_slice(&input.prevout.txid);
            out.extend_from_slice(&input.prevout.vout.to_le_bytes());
        }
        out.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            out.extend_from_slice(&output.value.to_le_bytes());
            out.extend_from_slice(&(output.script_pubkey.len() as u32).to_le_bytes());
            out.extend_from_slice(&output.script_pubkey);
        }
        out
    }

    pub fn txid(&self) -> [u8; 32] {
        double_sha256(&self.serialize())
    }
}

/// Lookup of unspent coins by outpoint (the host chain's coins view).
pub trait CoinView: Send + Sync {
    fn coin(&self, outpoint: &OutPoint) -> Option<TxOut>;
}

/// Wallet-side enumeration of spendable coins.
pub trait CoinSource {
    /// All confirmed spendable coins of the wallet.
    fn available_coins(&self) -> Vec<(OutPoint, TxOut)>;
}

/// Virtual size estimate for a one-input two-output assignment
/// transaction, witness included. Fee policy is wallet-local, not
/// consensus.
const ASSIGNMENT_TX_VSIZE: u64 = 140;

fn build_marked_transaction(
    wallet: &dyn CoinSource,
    plot: &AccountId,
    op_return_script: Vec<u8>,
    fee_rate: u64,
) -> AssignmentResult<Transaction> {
    let plot_script = create_p2wpkh_script(plot);

    // Largest confirmed coin at the plot address proves ownership.
    let (outpoint, coin) = wallet
        .available_coins()
        .into_iter()
        .filter(|(_, coin)| coin.script_pubkey == plot_script)
        .max_by_key(|(_, coin)| coin.value)
        .ok_or(AssignmentError::NoPlotCoins)?;

    let fee = fee_rate.max(1) * ASSIGNMENT_TX_VSIZE;
    if coin.value <= fee {
        return Err(AssignmentError::InsufficientFunds {
            value: coin.value,
            fee,
        });
    }

    let tx = Transaction {
        inputs: vec![TxIn { prevout: outpoint }],
        outputs: vec![
            TxOut {
                value: 0,
                script_pubkey: op_return_script,
            },
            TxOut {
                value: coin.value - fee,
                script_pubkey: plot_script,
            },
        ],
    };

    debug!(
        plot = %plot,
        txid = hex::encode(tx.txid()),
        fee,
        "built forging transaction"
    );
    Ok(tx)
}

/// Build an assignment transaction delegating `plot` to `forge`.
pub fn build_assignment_transaction(
    wallet: &dyn CoinSource,
    plot: &AccountId,
    forge: &AccountId,
    fee_rate: u64,
) -> AssignmentResult<Transaction> {
    build_marked_transaction(
        wallet,
        plot,
        create_assignment_op_return(plot, forge),
        fee_rate,
    )
}

/// Build a revocation transaction for `plot`.
pub fn build_revocation_transaction(
    wallet: &dyn CoinSource,
    plot: &AccountId,
    fee_rate: u64,
) -> AssignmentResult<Transaction> {
    build_marked_transaction(wallet, plot, create_revocation_op_return(plot), fee_rate)
}
