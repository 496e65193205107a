use alloy::primitives::{B256, U256};
use thiserror::Error;

use crate::repository::RepositoryError;

#[derive(Debug, Clone, Error)]
pub enum UniswapError {
    /// Not a `0x`-prefixed 40 hex digit value nor a known token name.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("{0}")]
    InvalidFeeTier(String),

    /// The token has no exchange or pool, or its metadata calls failed.
    #[error("Invalid token address: {0}")]
    InvalidToken(String),

    #[error("Insufficient balance. Had {have}, needed {need}")]
    InsufficientBalance { have: U256, need: U256 },

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A state-changing operation was requested on a client without a private key.
    #[error("{0} requires a private key, the client is read-only")]
    SignerUnavailable(String),

    /// A transaction this client waited on was mined with a failure status.
    #[error("Transaction {0} reverted")]
    TransactionReverted(B256),

    #[error("Failed to sign transaction: {0}")]
    Signing(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl UniswapError {
    pub fn insufficient_balance(have: U256, need: U256) -> Self {
        Self::InsufficientBalance { have, need }
    }
}
