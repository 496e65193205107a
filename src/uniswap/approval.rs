use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use tracing::instrument;

use super::token_registry::ETH_ADDRESS;
use super::tx_builder::TxBuilder;
use super::{UniswapError, UniswapResult};
use crate::repository::contract::IERC20;
use crate::repository::{ContractGateway, TxReceipt, read_contract, wait_for_receipt};

/// Allowance granted by [`ApprovalManager::approve`] unless told otherwise.
pub const MAX_APPROVAL: U256 = U256::MAX;

/// Allowances at or above `2^196 - 1` count as approved.
///
/// Lower than [`MAX_APPROVAL`] so an unlimited allowance that trades have
/// partially consumed does not trigger a new approval.
pub const MAX_APPROVAL_CHECK: U256 = U256::from_limbs([u64::MAX, u64::MAX, u64::MAX, 0xf]);

/// Grants spenders unlimited ERC20 allowances before trades and liquidity calls.
pub struct ApprovalManager {
    gateway: Arc<dyn ContractGateway>,
    tx: Arc<TxBuilder>,
    receipt_timeout: Duration,
    settle_delay: Duration,
}

impl ApprovalManager {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        tx: Arc<TxBuilder>,
        receipt_timeout: Duration,
        settle_delay: Duration,
    ) -> Self {
        Self {
            gateway,
            tx,
            receipt_timeout,
            settle_delay,
        }
    }

    /// Checks whether `spender` may move the signer's `token` without a new approval.
    #[instrument(skip(self), err)]
    pub async fn is_approved(&self, token: Address, spender: Address) -> UniswapResult<bool> {
        let allowance = read_contract(
            self.gateway.as_ref(),
            token,
            IERC20::allowanceCall {
                owner: self.tx.address(),
                spender,
            },
        )
        .await?;

        Ok(allowance >= MAX_APPROVAL_CHECK)
    }

    /// Approves `amount` (unlimited by default) and blocks until the approval is mined.
    ///
    /// After the receipt arrives it sleeps for the settle delay so nodes behind
    /// a load balancer observe the new allowance before the next call.
    #[instrument(skip(self), err)]
    pub async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: Option<U256>,
    ) -> UniswapResult<TxReceipt> {
        let call = IERC20::approveCall {
            spender,
            amount: amount.unwrap_or(MAX_APPROVAL),
        };
        tracing::warn!("Approving {token} for {spender}...");

        let hash = self
            .tx
            .send(token, Bytes::from(call.abi_encode()), U256::ZERO, None)
            .await?;
        let receipt = wait_for_receipt(self.gateway.as_ref(), hash, self.receipt_timeout).await?;
        if !receipt.status {
            return Err(UniswapError::TransactionReverted(hash));
        }

        tokio::time::sleep(self.settle_delay).await;
        Ok(receipt)
    }

    /// Approves `token` for `spender` unless it already is. The native coin is skipped.
    pub async fn ensure_approved(&self, token: Address, spender: Address) -> UniswapResult<()> {
        if token == ETH_ADDRESS || self.is_approved(token, spender).await? {
            return Ok(());
        }
        self.approve(token, spender, None).await.map(|_| ())
    }
}
