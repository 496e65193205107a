//! V3 liquidity positions held as NonfungiblePositionManager tokens.
//!
//! Minting and closing a position take several transactions. Each one is
//! awaited before the next is sent, but the sequence is not atomic: a failure
//! part way leaves the earlier steps applied.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::aliases::{I24, U24};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use tracing::instrument;

use super::approval::ApprovalManager;
use super::constants::{ContractAddresses, require};
use super::fee::FeeTier;
use super::protocol::balance_of;
use super::tick_math::{encode_sqrt_ratio_x96, nearest_valid_tick};
use super::tx_builder::TxBuilder;
use super::{UniswapError, UniswapResult, deadline};
use crate::repository::contract::{INonfungiblePositionManager, IUniswapV3Pool};
use crate::repository::{ContractGateway, TxReceipt, read_contract, wait_for_receipt};

/// Enumerates the position tokens of `owner` held by `manager`.
#[instrument(skip(gateway), err)]
pub async fn liquidity_positions(
    gateway: &dyn ContractGateway,
    manager: Address,
    owner: Address,
) -> UniswapResult<Vec<U256>> {
    let count = read_contract(
        gateway,
        manager,
        INonfungiblePositionManager::balanceOfCall { owner },
    )
    .await?;

    let mut positions = Vec::new();
    let mut index = U256::ZERO;
    while index < count {
        let id = read_contract(
            gateway,
            manager,
            INonfungiblePositionManager::tokenOfOwnerByIndexCall { owner, index },
        )
        .await?;
        positions.push(id);
        index += U256::from(1);
    }
    Ok(positions)
}

pub struct PositionManager {
    gateway: Arc<dyn ContractGateway>,
    tx: Arc<TxBuilder>,
    approvals: Arc<ApprovalManager>,
    manager: Address,
    receipt_timeout: Duration,
}

impl PositionManager {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        contracts: &ContractAddresses,
        tx: Arc<TxBuilder>,
        approvals: Arc<ApprovalManager>,
        receipt_timeout: Duration,
    ) -> UniswapResult<Self> {
        Ok(Self {
            gateway,
            tx,
            approvals,
            manager: require(contracts.v3_position_manager, "Uniswap V3 position manager")?,
            receipt_timeout,
        })
    }

    /// Ids of the position tokens `owner` holds.
    pub async fn get_liquidity_positions(&self, owner: Address) -> UniswapResult<Vec<U256>> {
        liquidity_positions(self.gateway.as_ref(), self.manager, owner).await
    }

    /// Deposits `amount0` and `amount1` into `pool` between the two ticks and
    /// mints the position token to the signer.
    ///
    /// Ticks are rounded to the pool's spacing first. An uninitialized pool is
    /// initialized at the price implied by the two amounts.
    #[instrument(skip(self), err)]
    pub async fn mint_liquidity(
        &self,
        pool: Address,
        amount0: U256,
        amount1: U256,
        tick_lower: i32,
        tick_upper: i32,
        deadline_at: Option<U256>,
    ) -> UniswapResult<TxReceipt> {
        let gateway = self.gateway.as_ref();
        let owner = self.tx.address();
        let token0 = read_contract(gateway, pool, IUniswapV3Pool::token0Call {}).await?;
        let token1 = read_contract(gateway, pool, IUniswapV3Pool::token1Call {}).await?;

        for (token, amount) in [(token0, amount0), (token1, amount1)] {
            let balance = balance_of(gateway, token, owner).await?;
            if balance < amount {
                return Err(UniswapError::insufficient_balance(balance, amount));
            }
        }

        let fee_value = read_contract(gateway, pool, IUniswapV3Pool::feeCall {})
            .await?
            .to::<u32>();
        let fee = FeeTier::from_value(fee_value).ok_or_else(|| {
            UniswapError::InvalidFeeTier(format!("Pool {pool} has unknown fee {fee_value}"))
        })?;
        let tick_lower = nearest_valid_tick(tick_lower, fee)?;
        let tick_upper = nearest_valid_tick(tick_upper, fee)?;
        if tick_lower >= tick_upper {
            return Err(UniswapError::InvalidArgument(format!(
                "Invalid tick range [{tick_lower}, {tick_upper}]"
            )));
        }

        let slot0 = read_contract(gateway, pool, IUniswapV3Pool::slot0Call {}).await?;
        if !slot0.unlocked {
            let sqrt_price = encode_sqrt_ratio_x96(amount0, amount1)?;
            tracing::warn!("Pool {pool} is not initialized, initializing at {sqrt_price}");
            let call = IUniswapV3Pool::initializeCall {
                sqrtPriceX96: sqrt_price.to(),
            };
            self.send_and_wait(pool, &call).await?;
        }

        self.approvals.approve(token0, self.manager, Some(amount0)).await?;
        self.approvals.approve(token1, self.manager, Some(amount1)).await?;

        let params = INonfungiblePositionManager::MintParams {
            token0,
            token1,
            fee: U24::from(fee.value()),
            tickLower: to_i24(tick_lower)?,
            tickUpper: to_i24(tick_upper)?,
            amount0Desired: amount0,
            amount1Desired: amount1,
            amount0Min: U256::ZERO,
            amount1Min: U256::ZERO,
            recipient: owner,
            deadline: deadline_at.unwrap_or_else(deadline),
        };
        self.send_and_wait(self.manager, &INonfungiblePositionManager::mintCall { params })
            .await
    }

    /// Removes all liquidity of `token_id`, collects the owed tokens and burns
    /// the position token.
    #[instrument(skip(self), err)]
    pub async fn close_position(
        &self,
        token_id: U256,
        amount0_min: U256,
        amount1_min: U256,
        deadline_at: Option<U256>,
    ) -> UniswapResult<TxReceipt> {
        use INonfungiblePositionManager as Npm;
        let position = read_contract(
            self.gateway.as_ref(),
            self.manager,
            Npm::positionsCall { tokenId: token_id },
        )
        .await?;
        let deadline_at = deadline_at.unwrap_or_else(deadline);

        let decrease = Npm::decreaseLiquidityCall {
            params: Npm::DecreaseLiquidityParams {
                tokenId: token_id,
                liquidity: position.liquidity,
                amount0Min: amount0_min,
                amount1Min: amount1_min,
                deadline: deadline_at,
            },
        };
        self.send_and_wait(self.manager, &decrease).await?;

        let collect = Npm::collectCall {
            params: Npm::CollectParams {
                tokenId: token_id,
                recipient: self.tx.address(),
                amount0Max: u128::MAX,
                amount1Max: u128::MAX,
            },
        };
        self.send_and_wait(self.manager, &collect).await?;

        self.send_and_wait(self.manager, &Npm::burnCall { tokenId: token_id })
            .await
    }

    async fn send_and_wait<C: SolCall>(&self, to: Address, call: &C) -> UniswapResult<TxReceipt> {
        let hash = self
            .tx
            .send(to, Bytes::from(call.abi_encode()), U256::ZERO, None)
            .await?;
        let receipt = wait_for_receipt(self.gateway.as_ref(), hash, self.receipt_timeout).await?;
        if !receipt.status {
            return Err(UniswapError::TransactionReverted(hash));
        }
        Ok(receipt)
    }
}

fn to_i24(tick: i32) -> UniswapResult<I24> {
    I24::try_from(tick)
        .map_err(|e| UniswapError::InvalidArgument(format!("Tick {tick} out of range: {e}")))
}
