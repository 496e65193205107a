pub mod alloy;
pub mod contract;
pub mod error;
pub mod multicall;

use std::time::Duration;

use ::alloy::primitives::{Address, B256, Bytes, U256};
use ::alloy::rpc::types::{Log, TransactionRequest};
use ::alloy::sol_types::SolCall;
use async_trait::async_trait;

pub use self::alloy::AlloyContractGateway;
pub use error::RepositoryError;

pub(crate) type RepoResult<T> = std::result::Result<T, RepositoryError>;

/// Polling interval used while waiting for a transaction receipt.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Receipt of a mined transaction, reduced to what the client inspects.
#[derive(Debug, Clone, Default)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    /// `true` when the transaction executed successfully.
    pub status: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub logs: Vec<Log>,
}

/// Narrow call/transact interface to an Ethereum JSON-RPC node.
///
/// Every other component reads contract state or submits signed transactions
/// through this trait, which keeps the trading logic independent of the transport
/// and lets unit tests substitute a mock node.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContractGateway: Send + Sync {
    /// Executes a read-only `eth_call` against `to` with ABI-encoded `data`.
    ///
    /// # Arguments
    /// * `to` - The contract address
    /// * `data` - Selector followed by the ABI-encoded arguments
    ///
    /// # Returns
    /// The raw return data of the call
    async fn call(&self, to: Address, data: Bytes) -> RepoResult<Bytes>;

    /// Estimates the gas needed to execute a transaction draft.
    async fn estimate_gas(&self, tx: TransactionRequest) -> RepoResult<u64>;

    /// Broadcasts an EIP-2718 encoded signed transaction.
    ///
    /// # Returns
    /// The transaction hash reported by the node
    async fn send_raw_transaction(&self, raw: Bytes) -> RepoResult<B256>;

    /// Fetches the receipt of a transaction, `None` while it is still pending.
    async fn get_transaction_receipt(&self, hash: B256) -> RepoResult<Option<TxReceipt>>;

    /// Returns the native coin balance of an address in wei.
    async fn get_balance(&self, address: Address) -> RepoResult<U256>;

    /// Returns the number of transactions sent from an address.
    async fn get_transaction_count(&self, address: Address) -> RepoResult<u64>;

    /// Returns the current gas price in wei.
    async fn get_gas_price(&self) -> RepoResult<u128>;

    /// Returns the chain id of the connected network.
    async fn get_chain_id(&self) -> RepoResult<u64>;
}

/// Encodes `call`, executes it with `eth_call` and decodes the typed return value.
pub async fn read_contract<C>(
    gateway: &dyn ContractGateway,
    to: Address,
    call: C,
) -> RepoResult<C::Return>
where
    C: SolCall + Send + Sync,
{
    let output = gateway.call(to, Bytes::from(call.abi_encode())).await?;

    C::abi_decode_returns(&output).map_err(|e| {
        RepositoryError::ParseError(format!(
            "Failed to decode {} output from {to}: {e}",
            C::SIGNATURE
        ))
    })
}

/// Polls for the receipt of `hash` until it is mined or `timeout` elapses.
pub async fn wait_for_receipt(
    gateway: &dyn ContractGateway,
    hash: B256,
    timeout: Duration,
) -> RepoResult<TxReceipt> {
    let start = tokio::time::Instant::now();
    loop {
        if let Some(receipt) = gateway.get_transaction_receipt(hash).await? {
            return Ok(receipt);
        }
        if start.elapsed() >= timeout {
            return Err(RepositoryError::ReceiptTimeout {
                hash,
                seconds: timeout.as_secs(),
            });
        }
        tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
    }
}
