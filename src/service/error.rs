use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repository::RepositoryError;
use crate::uniswap::UniswapError;

#[derive(Debug, Clone, Error, JsonSchema, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ServiceError {
    /// The provided address is invalid or malformed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// The token has no exchange or pool, or is not a token at all.
    #[error("Token not found or not supported: {0}")]
    TokenNotFound(String),

    /// The requested amount is invalid (e.g., negative, zero, or malformed).
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The wallet has insufficient balance for the requested operation.
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: String, available: String },

    /// The fee tier is missing or not valid for the configured Uniswap version.
    #[error("Invalid fee tier: {0}")]
    InvalidFeeTier(String),

    /// The configured Uniswap version does not offer the operation.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The server runs without a private key and cannot send transactions.
    #[error("No wallet configured: {0}")]
    WalletNotConfigured(String),

    /// A transaction was broadcast but reverted.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// An error occurred while communicating with the blockchain.
    #[error("Blockchain connection error: {0}")]
    BlockchainError(String),

    /// An unexpected internal error occurred.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::RpcError(msg)
            | RepositoryError::NetworkError(msg)
            | RepositoryError::ContractError(msg) => {
                ServiceError::BlockchainError(format!("Failed to interact with blockchain: {msg}"))
            }
            RepositoryError::ParseError(msg) => ServiceError::InternalError(msg),
            RepositoryError::ReceiptTimeout { hash, seconds } => ServiceError::TransactionFailed(
                format!("{hash} was not mined within {seconds}s"),
            ),
        }
    }
}

impl From<UniswapError> for ServiceError {
    fn from(err: UniswapError) -> Self {
        match err {
            UniswapError::InvalidAddress(msg) => ServiceError::InvalidAddress(msg),
            UniswapError::InvalidToken(msg) => ServiceError::TokenNotFound(msg),
            UniswapError::InvalidFeeTier(msg) => ServiceError::InvalidFeeTier(msg),
            UniswapError::InsufficientBalance { have, need } => ServiceError::InsufficientBalance {
                required: need.to_string(),
                available: have.to_string(),
            },
            UniswapError::UnsupportedOperation(msg) => ServiceError::UnsupportedOperation(msg),
            UniswapError::InvalidArgument(msg) => ServiceError::InvalidArgument(msg),
            UniswapError::SignerUnavailable(operation) => {
                ServiceError::WalletNotConfigured(operation)
            }
            UniswapError::TransactionReverted(hash) => {
                ServiceError::TransactionFailed(format!("{hash} reverted"))
            }
            UniswapError::Signing(msg) => ServiceError::InternalError(msg),
            UniswapError::Repository(err) => err.into(),
        }
    }
}
