//! Error types for the assignment model.

use thiserror::Error;

/// Assignment validation and transaction-building errors.
#[derive(Error, Debug)]
pub enum AssignmentError {
    /// OP_RETURN payload failed structural validation.
    #[error("Invalid assignment payload: {0}")]
    InvalidPayload(String),

    /// No input of the transaction spends a coin owned by the plot address.
    #[error("Transaction does not prove ownership of plot {0}")]
    OwnershipNotProven(String),

    /// Revocation for a plot that has no stored assignment.
    #[error("No assignment found for plot {0}")]
    NotAssigned(String),

    /// Undo record could not be decoded.
    #[error("Invalid undo record: {0}")]
    InvalidUndo(String),

    /// Wallet has no spendable coin at the plot address.
    #[error("No coins available at the plot address, cannot prove ownership")]
    NoPlotCoins,

    /// Selected coin cannot cover the fee.
    #[error("Insufficient funds: coin value {value}, fee {fee}")]
    InsufficientFunds { value: u64, fee: u64 },
}

/// Result type for assignment operations.
pub type AssignmentResult<T> = Result<T, AssignmentError>;
