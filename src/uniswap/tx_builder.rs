use std::sync::Arc;

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, B256, Bytes, TxKind, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;
use tokio::sync::Mutex;
use tracing::instrument;

use super::{UniswapError, UniswapResult};
use crate::repository::ContractGateway;

/// How the gas limit of a transaction is chosen when none is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPolicy {
    /// Estimate remotely and add a 20% margin, otherwise use the fallback.
    pub use_estimate_gas: bool,
    pub fallback_gas_limit: u64,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            use_estimate_gas: true,
            fallback_gas_limit: 250_000,
        }
    }
}

/// Parameters of the next transaction from the signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxParams {
    pub from: Address,
    pub value: U256,
    pub nonce: u64,
    /// Explicit gas limit, chosen by [`GasPolicy`] when absent.
    pub gas: Option<u64>,
}

/// Signs and broadcasts transactions for one private key while tracking its nonce.
pub struct TxBuilder {
    gateway: Arc<dyn ContractGateway>,
    signer: PrivateKeySigner,
    chain_id: u64,
    gas_policy: GasPolicy,
    // The next nonce this process expects to use.
    last_nonce: Mutex<u64>,
}

impl TxBuilder {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        signer: PrivateKeySigner,
        chain_id: u64,
        gas_policy: GasPolicy,
    ) -> Self {
        Self {
            gateway,
            signer,
            chain_id,
            gas_policy,
            last_nonce: Mutex::new(0),
        }
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub async fn last_nonce(&self) -> u64 {
        *self.last_nonce.lock().await
    }

    /// Assembles parameters with nonce `max(last tracked, node count)`.
    ///
    /// The node count covers transactions sent from the same key by other processes.
    pub async fn next_tx_params(&self, value: U256, gas: Option<u64>) -> UniswapResult<TxParams> {
        let last_nonce = *self.last_nonce.lock().await;
        self.params_after(last_nonce, value, gas).await
    }

    /// Signs and broadcasts `data` to `to` with prepared `params`.
    ///
    /// The tracked nonce advances past `params.nonce` whether or not the
    /// broadcast succeeds.
    #[instrument(skip(self, data), err)]
    pub async fn submit(&self, to: Address, data: Bytes, params: TxParams) -> UniswapResult<B256> {
        let mut last_nonce = self.last_nonce.lock().await;
        let result = self.sign_and_send(to, data, &params).await;
        *last_nonce = (*last_nonce).max(params.nonce + 1);
        result
    }

    /// Builds parameters and submits under a single lock, so concurrent sends
    /// from this process never share a nonce.
    #[instrument(skip(self, data), err)]
    pub async fn send(
        &self,
        to: Address,
        data: Bytes,
        value: U256,
        gas: Option<u64>,
    ) -> UniswapResult<B256> {
        let mut last_nonce = self.last_nonce.lock().await;
        let params = self.params_after(*last_nonce, value, gas).await?;
        let result = self.sign_and_send(to, data, &params).await;
        *last_nonce = (*last_nonce).max(params.nonce + 1);
        result
    }

    async fn params_after(
        &self,
        last_nonce: u64,
        value: U256,
        gas: Option<u64>,
    ) -> UniswapResult<TxParams> {
        let from = self.address();
        let remote_nonce = self.gateway.get_transaction_count(from).await?;

        Ok(TxParams {
            from,
            value,
            nonce: last_nonce.max(remote_nonce),
            gas,
        })
    }

    async fn gas_limit(&self, to: Address, data: &Bytes, params: &TxParams) -> UniswapResult<u64> {
        if let Some(gas) = params.gas {
            return Ok(gas);
        }
        if !self.gas_policy.use_estimate_gas {
            return Ok(self.gas_policy.fallback_gas_limit);
        }

        let draft = TransactionRequest::default()
            .with_from(params.from)
            .with_to(to)
            .with_value(params.value)
            .with_nonce(params.nonce)
            .with_input(data.clone());
        let estimate = self.gateway.estimate_gas(draft).await?;
        Ok(estimate.saturating_mul(12) / 10)
    }

    async fn sign_and_send(&self, to: Address, data: Bytes, params: &TxParams) -> UniswapResult<B256> {
        let gas_limit = self.gas_limit(to, &data, params).await?;
        let gas_price = self.gateway.get_gas_price().await?;

        let tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce: params.nonce,
            gas_price,
            gas_limit,
            to: TxKind::Call(to),
            value: params.value,
            input: data,
        };
        let signature = self
            .signer
            .sign_hash_sync(&tx.signature_hash())
            .map_err(|e| UniswapError::Signing(e.to_string()))?;
        let envelope = TxEnvelope::Legacy(tx.into_signed(signature));

        let hash = self
            .gateway
            .send_raw_transaction(Bytes::from(envelope.encoded_2718()))
            .await?;

        tracing::info!(
            "Sent transaction {hash} to {to} (nonce={}, gas={gas_limit}, value={})",
            params.nonce,
            params.value
        );
        Ok(hash)
    }
}
