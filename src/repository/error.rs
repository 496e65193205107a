use alloy::primitives::B256;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("RPC error: {0}")]
    RpcError(String),

    /// The call reverted or the node rejected it.
    #[error("Contract call error: {0}")]
    ContractError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    /// Return data that does not match the expected ABI.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A broadcast transaction was not mined in time. It may still land.
    #[error("No receipt for {hash} after {seconds}s")]
    ReceiptTimeout { hash: B256, seconds: u64 },
}
