use std::sync::Arc;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use tracing::instrument;

use super::error::RepositoryError;
use crate::repository::{ContractGateway, RepoResult, TxReceipt};

/// [`ContractGateway`] backed by an alloy JSON-RPC provider.
pub struct AlloyContractGateway<P> {
    provider: Arc<P>,
}

impl<P: Provider + Clone + 'static> AlloyContractGateway<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }
}

/// Transport failures and rate limits are network errors, anything the node
/// answered with is an RPC error.
fn rpc_error(action: &str, e: impl std::fmt::Display) -> RepositoryError {
    let message = e.to_string();
    if message.contains("429") {
        tracing::warn!("Rate limited while trying to {action}");
        return RepositoryError::NetworkError(format!("Rate limited while trying to {action}"));
    }
    if message.contains("error sending request") || message.contains("connection") {
        return RepositoryError::NetworkError(format!("Failed to {action}: {message}"));
    }
    RepositoryError::RpcError(format!("Failed to {action}: {message}"))
}

#[async_trait]
impl<P: Provider + Clone + Send + Sync + 'static> ContractGateway for AlloyContractGateway<P> {
    #[instrument(skip(self, data), err)]
    async fn call(&self, to: Address, data: Bytes) -> RepoResult<Bytes> {
        let tx = TransactionRequest::default().with_to(to).with_input(data);

        self.provider.call(tx).await.map_err(|e| {
            tracing::debug!("eth_call to {to} failed: {e}");
            RepositoryError::ContractError(format!("Call to {to} reverted or failed: {e}"))
        })
    }

    #[instrument(skip(self, tx), err)]
    async fn estimate_gas(&self, tx: TransactionRequest) -> RepoResult<u64> {
        self.provider
            .estimate_gas(tx)
            .await
            .map_err(|e| RepositoryError::ContractError(format!("Failed to estimate gas: {e}")))
    }

    #[instrument(skip(self, raw), err)]
    async fn send_raw_transaction(&self, raw: Bytes) -> RepoResult<B256> {
        let pending = self
            .provider
            .send_raw_transaction(&raw)
            .await
            .map_err(|e| rpc_error("broadcast transaction", e))?;

        Ok(*pending.tx_hash())
    }

    #[instrument(skip(self), err)]
    async fn get_transaction_receipt(&self, hash: B256) -> RepoResult<Option<TxReceipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| rpc_error("fetch transaction receipt", e))?;

        Ok(receipt.map(|r| TxReceipt {
            transaction_hash: r.transaction_hash,
            status: r.status(),
            block_number: r.block_number,
            gas_used: r.gas_used,
            logs: r.inner.logs().to_vec(),
        }))
    }

    #[instrument(skip(self), err)]
    async fn get_balance(&self, address: Address) -> RepoResult<U256> {
        self.provider
            .get_balance(address)
            .await
            .map_err(|e| rpc_error("get balance", e))
    }

    #[instrument(skip(self), err)]
    async fn get_transaction_count(&self, address: Address) -> RepoResult<u64> {
        self.provider
            .get_transaction_count(address)
            .await
            .map_err(|e| rpc_error("get transaction count", e))
    }

    #[instrument(skip(self), err)]
    async fn get_gas_price(&self) -> RepoResult<u128> {
        self.provider
            .get_gas_price()
            .await
            .map_err(|e| rpc_error("get gas price", e))
    }

    #[instrument(skip(self), err)]
    async fn get_chain_id(&self) -> RepoResult<u64> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| rpc_error("get chain id", e))
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;
    use alloy::providers::ProviderBuilder;
    use alloy::sol_types::SolCall;

    use super::*;
    use crate::repository::contract::IERC20;
    use crate::repository::read_contract;

    const DAI: Address = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");

    fn rpc_url() -> String {
        std::env::var("RPC_URL").unwrap_or_else(|_| "https://eth.llamarpc.com".to_string())
    }

    fn gateway() -> AlloyContractGateway<impl Provider + Clone + 'static> {
        let provider = ProviderBuilder::new().connect_http(rpc_url().parse().unwrap());
        AlloyContractGateway::new(Arc::new(provider))
    }

    async fn rate_limit_delay() {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    }

    #[test]
    fn test_rpc_error_classification() {
        let err = rpc_error("get nonce", "HTTP error 429 with body: Too Many Requests");
        assert!(matches!(err, RepositoryError::NetworkError(msg) if msg.contains("get nonce")));

        let err = rpc_error("broadcast transaction", "nonce too low");
        assert!(matches!(err, RepositoryError::RpcError(msg) if msg.contains("nonce too low")));
    }

    #[tokio::test]
    #[serial_test::serial]
    #[ignore]
    async fn test_get_chain_id_on_mainnet() {
        rate_limit_delay().await;
        let chain_id = gateway().get_chain_id().await.unwrap();
        assert_eq!(chain_id, 1);
    }

    #[tokio::test]
    #[serial_test::serial]
    #[ignore]
    async fn test_call_reads_erc20_metadata() {
        rate_limit_delay().await;
        let gateway = gateway();

        let raw = gateway
            .call(DAI, IERC20::decimalsCall {}.abi_encode().into())
            .await
            .unwrap();
        assert_eq!(raw.len(), 32);

        let symbol = read_contract(&gateway, DAI, IERC20::symbolCall {})
            .await
            .unwrap();
        assert_eq!(symbol, "DAI");
    }

    #[tokio::test]
    #[serial_test::serial]
    #[ignore]
    async fn test_get_transaction_count_for_fresh_address() {
        rate_limit_delay().await;
        let count = gateway()
            .get_transaction_count(address!("0x000000000000000000000000000000000000dEaD"))
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
