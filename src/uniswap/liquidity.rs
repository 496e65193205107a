//! V3 pool reads and the on-chain total value locked estimate.
//!
//! TVL walks the pool's tick bitmap to find the initialized tick range, reads
//! every tick in that range through Multicall2 and sums the token amounts each
//! tick band holds at the current price. The result is an approximation and can
//! differ from indexer figures.

use std::sync::Arc;

use alloy::primitives::aliases::I24;
use alloy::primitives::{Address, U256};
use tracing::instrument;

use super::cache::LookupCache;
use super::constants::{ContractAddresses, require};
use super::fee::FeeTier;
use super::protocol::v3::pool_address;
use super::tick_math::{bitmap_word_range, tick_at_bitmap_position, u256_to_f64};
use super::{UniswapError, UniswapResult};
use crate::repository::contract::{IERC20, IUniswapV3Pool};
use crate::repository::multicall::aggregate_decoded;
use crate::repository::{ContractGateway, read_contract};

/// Ticks or bitmap words read per multicall request.
pub const MULTICALL_BATCH_SIZE: usize = 100;

const Q96: f64 = 79228162514264337593543950336.0;

/// Values fixed when a pool is deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolImmutables {
    pub factory: Address,
    pub token0: Address,
    pub token1: Address,
    pub fee: u32,
    pub tick_spacing: i32,
    pub max_liquidity_per_tick: u128,
}

/// Current price and liquidity of a pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolState {
    pub liquidity: u128,
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub observation_index: u16,
    pub observation_cardinality: u16,
    pub observation_cardinality_next: u16,
    pub fee_protocol: u8,
    pub unlocked: bool,
}

/// Total value locked in a pool, in whole units of each token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolTvl {
    pub token0: f64,
    pub token1: f64,
}

pub struct LiquidityAggregator {
    gateway: Arc<dyn ContractGateway>,
    cache: LookupCache,
    factory: Address,
    multicall: Option<Address>,
}

impl LiquidityAggregator {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        contracts: &ContractAddresses,
        cache: LookupCache,
    ) -> UniswapResult<Self> {
        Ok(Self {
            gateway,
            cache,
            factory: require(contracts.v3_factory, "Uniswap V3 factory")?,
            multicall: contracts.multicall,
        })
    }

    /// Pool of a token pair and fee tier, `InvalidToken` when none is deployed.
    #[instrument(skip(self), err)]
    pub async fn get_pool_instance(
        &self,
        token_a: Address,
        token_b: Address,
        fee: FeeTier,
    ) -> UniswapResult<Address> {
        pool_address(
            self.gateway.as_ref(),
            &self.cache,
            self.factory,
            token_a,
            token_b,
            fee,
        )
        .await
    }

    #[instrument(skip(self), err)]
    pub async fn get_pool_immutables(&self, pool: Address) -> UniswapResult<PoolImmutables> {
        let gateway = self.gateway.as_ref();
        Ok(PoolImmutables {
            factory: read_contract(gateway, pool, IUniswapV3Pool::factoryCall {}).await?,
            token0: read_contract(gateway, pool, IUniswapV3Pool::token0Call {}).await?,
            token1: read_contract(gateway, pool, IUniswapV3Pool::token1Call {}).await?,
            fee: read_contract(gateway, pool, IUniswapV3Pool::feeCall {})
                .await?
                .to::<u32>(),
            tick_spacing: read_contract(gateway, pool, IUniswapV3Pool::tickSpacingCall {})
                .await?
                .as_i32(),
            max_liquidity_per_tick: read_contract(
                gateway,
                pool,
                IUniswapV3Pool::maxLiquidityPerTickCall {},
            )
            .await?,
        })
    }

    #[instrument(skip(self), err)]
    pub async fn get_pool_state(&self, pool: Address) -> UniswapResult<PoolState> {
        let gateway = self.gateway.as_ref();
        let liquidity = read_contract(gateway, pool, IUniswapV3Pool::liquidityCall {}).await?;
        let slot0 = read_contract(gateway, pool, IUniswapV3Pool::slot0Call {}).await?;

        Ok(PoolState {
            liquidity,
            sqrt_price_x96: U256::from(slot0.sqrtPriceX96),
            tick: slot0.tick.as_i32(),
            observation_index: slot0.observationIndex,
            observation_cardinality: slot0.observationCardinality,
            observation_cardinality_next: slot0.observationCardinalityNext,
            fee_protocol: slot0.feeProtocol,
            unlocked: slot0.unlocked,
        })
    }

    /// Estimates the amounts of both tokens locked in `pool`.
    #[instrument(skip(self), err)]
    pub async fn get_tvl_in_pool(&self, pool: Address) -> UniswapResult<PoolTvl> {
        let multicall = require(self.multicall, "Multicall2")?;
        let immutables = self.get_pool_immutables(pool).await?;
        let state = self.get_pool_state(pool).await?;
        let fee = FeeTier::from_value(immutables.fee).ok_or_else(|| {
            UniswapError::InvalidFeeTier(format!("Pool {pool} has unknown fee {}", immutables.fee))
        })?;

        let (min_tick, max_tick) = self.initialized_tick_range(multicall, pool, fee).await?;
        let spacing = fee.tick_spacing();
        let ticks: Vec<i32> = (min_tick..=max_tick).step_by(spacing as usize).collect();
        tracing::debug!(
            "Reading {} ticks of {pool} between {min_tick} and {max_tick}",
            ticks.len()
        );

        let mut liquidity_nets = Vec::with_capacity(ticks.len());
        for batch in ticks.chunks(MULTICALL_BATCH_SIZE) {
            let calls = batch
                .iter()
                .map(|tick| I24::try_from(*tick).map(|tick| IUniswapV3Pool::ticksCall { tick }))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| UniswapError::InvalidArgument(format!("Tick out of range: {e}")))?;
            let infos = aggregate_decoded(self.gateway.as_ref(), multicall, pool, &calls).await?;
            liquidity_nets.extend(infos.into_iter().map(|info| info.liquidityNet));
        }

        let sqrt_price = u256_to_f64(state.sqrt_price_x96) / Q96;
        let ticks_with_nets: Vec<(i32, i128)> = ticks.into_iter().zip(liquidity_nets).collect();
        let (amount0, amount1) = accumulate_tick_amounts(&ticks_with_nets, spacing, sqrt_price);

        let decimals0 = self.decimals(immutables.token0).await?;
        let decimals1 = self.decimals(immutables.token1).await?;
        Ok(PoolTvl {
            token0: (amount0 / 10f64.powi(decimals0.into())).floor(),
            token1: (amount1 / 10f64.powi(decimals1.into())).floor(),
        })
    }

    async fn decimals(&self, token: Address) -> UniswapResult<u8> {
        read_contract(self.gateway.as_ref(), token, IERC20::decimalsCall {})
            .await
            .map_err(|e| UniswapError::InvalidToken(format!("{token}: {e}")))
    }

    /// Lowest and highest initialized tick, scanning bitmap words inward from
    /// both ends of the tier's range.
    async fn initialized_tick_range(
        &self,
        multicall: Address,
        pool: Address,
        fee: FeeTier,
    ) -> UniswapResult<(i32, i32)> {
        let (first_word, last_word) = bitmap_word_range(fee);
        let ascending: Vec<i16> = (first_word..=last_word).collect();
        let descending: Vec<i16> = ascending.iter().rev().copied().collect();

        let no_ticks =
            || UniswapError::InvalidArgument(format!("Pool {pool} has no initialized ticks"));
        let (low_word, low_bits) = self
            .first_nonzero_word(multicall, pool, &ascending)
            .await?
            .ok_or_else(no_ticks)?;
        let (high_word, high_bits) = self
            .first_nonzero_word(multicall, pool, &descending)
            .await?
            .ok_or_else(no_ticks)?;

        let lowest_bit = low_bits.trailing_zeros() as u8;
        let highest_bit = (255 - high_bits.leading_zeros()) as u8;
        Ok((
            tick_at_bitmap_position(low_word, lowest_bit, fee),
            tick_at_bitmap_position(high_word, highest_bit, fee),
        ))
    }

    async fn first_nonzero_word(
        &self,
        multicall: Address,
        pool: Address,
        words: &[i16],
    ) -> UniswapResult<Option<(i16, U256)>> {
        for batch in words.chunks(MULTICALL_BATCH_SIZE) {
            let calls: Vec<_> = batch
                .iter()
                .map(|word| IUniswapV3Pool::tickBitmapCall { wordPosition: *word })
                .collect();
            let bitmaps = aggregate_decoded(self.gateway.as_ref(), multicall, pool, &calls).await?;
            if let Some(found) = batch
                .iter()
                .zip(bitmaps)
                .find(|(_, bits)| !bits.is_zero())
            {
                return Ok(Some((*found.0, found.1)));
            }
        }
        Ok(None)
    }
}

/// Sums the raw token0 and token1 amounts held by each tick band.
///
/// Liquidity accumulates over `liquidity_net` in tick order. A band spans
/// `[tick, tick + spacing)` with bounds `1.0001^floor(tick / 2)`, the price
/// clamped into the band.
pub fn accumulate_tick_amounts(
    ticks: &[(i32, i128)],
    spacing: i32,
    sqrt_price: f64,
) -> (f64, f64) {
    let mut liquidity = 0.0;
    let mut amount0 = 0.0;
    let mut amount1 = 0.0;

    for (tick, liquidity_net) in ticks {
        liquidity += *liquidity_net as f64;
        let sqrt_low = 1.0001f64.powi(tick.div_euclid(2));
        let sqrt_high = 1.0001f64.powi((tick + spacing).div_euclid(2));
        let price = sqrt_price.clamp(sqrt_low, sqrt_high);

        amount0 += liquidity * (sqrt_high - price) / (price * sqrt_high);
        amount1 += liquidity * (price - sqrt_low);
    }
    (amount0, amount1)
}
