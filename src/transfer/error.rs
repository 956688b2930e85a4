//! Transfer Error Types

use thiserror::Error;

use crate::core_types::WalletId;
use crate::money::MoneyError;

/// Transfer error types
///
/// `InvalidState` and `Construction` are assertion-class: they mean an
/// upstream collaborator broke an invariant, and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    // === Assertion Errors ===
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid transfer construction: {0}")]
    Construction(String),

    // === Lifecycle Errors ===
    #[error("Transfer hash already set to {0}")]
    HashAlreadySet(String),

    // === Lookup Errors ===
    #[error("Transfer not found: {0}")]
    TransferNotFound(String),

    #[error("Wallet not found: {0}")]
    WalletNotFound(WalletId),

    // === Value Errors ===
    #[error("Money error: {0}")]
    Money(#[from] MoneyError),
}

impl TransferError {
    /// Stable error code for logs and reports
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::InvalidState(_) => "INVALID_STATE",
            TransferError::Construction(_) => "CONSTRUCTION_ERROR",
            TransferError::HashAlreadySet(_) => "HASH_ALREADY_SET",
            TransferError::TransferNotFound(_) => "TRANSFER_NOT_FOUND",
            TransferError::WalletNotFound(_) => "WALLET_NOT_FOUND",
            TransferError::Money(_) => "MONEY_ERROR",
        }
    }

    /// Whether this reports a bug upstream rather than a bad input
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransferError::InvalidState(_) | TransferError::Construction(_)
        )
    }
}
