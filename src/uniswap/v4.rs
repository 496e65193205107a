//! Read-only access to Uniswap V4 pools through the StateView lens.
//!
//! V4 keeps every pool inside a singleton PoolManager, identified by the hash
//! of its [`PoolKey`]. Native ETH is the zero currency, the same sentinel the
//! rest of the client uses.

use std::sync::Arc;

use alloy::primitives::aliases::{I24, U24};
use alloy::primitives::{Address, B256, U256, keccak256};
use alloy::sol_types::SolValue;
use tracing::instrument;

use super::constants::{ContractAddresses, require};
use super::{UniswapError, UniswapResult};
use crate::repository::contract::{IStateView, PoolKey};
use crate::repository::{ContractGateway, read_contract};

const MAX_LP_FEE: u32 = 1_000_000;
const DYNAMIC_FEE_FLAG: u32 = 0x800000;
const MAX_TICK_SPACING: i32 = i16::MAX as i32;

/// Builds the key of a pool with its currencies in canonical order.
pub fn pool_key(
    currency_a: Address,
    currency_b: Address,
    fee: u32,
    tick_spacing: i32,
    hooks: Address,
) -> UniswapResult<PoolKey> {
    if currency_a == currency_b {
        return Err(UniswapError::InvalidArgument(
            "A V4 pool needs two different currencies".to_string(),
        ));
    }
    if fee > MAX_LP_FEE && fee != DYNAMIC_FEE_FLAG {
        return Err(UniswapError::InvalidFeeTier(format!(
            "V4 fee {fee} is neither a static fee up to {MAX_LP_FEE} nor the dynamic fee flag"
        )));
    }
    if !(1..=MAX_TICK_SPACING).contains(&tick_spacing) {
        return Err(UniswapError::InvalidArgument(format!(
            "Tick spacing {tick_spacing} is out of bounds: (1, {MAX_TICK_SPACING})"
        )));
    }

    let (currency0, currency1) = if currency_a < currency_b {
        (currency_a, currency_b)
    } else {
        (currency_b, currency_a)
    };
    Ok(PoolKey {
        currency0,
        currency1,
        fee: U24::from(fee),
        tickSpacing: I24::try_from(tick_spacing)
            .map_err(|e| UniswapError::InvalidArgument(e.to_string()))?,
        hooks,
    })
}

/// Pool id used by the PoolManager, `keccak256(abi.encode(key))`.
pub fn pool_id(key: &PoolKey) -> B256 {
    keccak256(key.abi_encode())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V4Slot0 {
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub protocol_fee: u32,
    pub lp_fee: u32,
}

pub struct V4StateReader {
    gateway: Arc<dyn ContractGateway>,
    state_view: Address,
}

impl V4StateReader {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        contracts: &ContractAddresses,
    ) -> UniswapResult<Self> {
        Ok(Self {
            gateway,
            state_view: require(contracts.v4_state_view, "Uniswap V4 state view")?,
        })
    }

    #[instrument(skip(self, key), fields(pool_id = %pool_id(key)), err)]
    pub async fn get_slot0(&self, key: &PoolKey) -> UniswapResult<V4Slot0> {
        let slot0 = read_contract(
            self.gateway.as_ref(),
            self.state_view,
            IStateView::getSlot0Call {
                poolId: pool_id(key),
            },
        )
        .await?;

        // an uninitialized pool reads as all zeroes
        if slot0.sqrtPriceX96.is_zero() {
            return Err(UniswapError::InvalidToken(format!(
                "V4 pool {} is not initialized",
                pool_id(key)
            )));
        }

        Ok(V4Slot0 {
            sqrt_price_x96: U256::from(slot0.sqrtPriceX96),
            tick: slot0.tick.as_i32(),
            protocol_fee: slot0.protocolFee.to::<u32>(),
            lp_fee: slot0.lpFee.to::<u32>(),
        })
    }

    #[instrument(skip(self, key), fields(pool_id = %pool_id(key)), err)]
    pub async fn get_liquidity(&self, key: &PoolKey) -> UniswapResult<u128> {
        Ok(read_contract(
            self.gateway.as_ref(),
            self.state_view,
            IStateView::getLiquidityCall {
                poolId: pool_id(key),
            },
        )
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Bytes, address, b256};
    use alloy::sol_types::SolCall;

    use super::*;
    use crate::repository::MockContractGateway;
    use crate::uniswap::ETH_ADDRESS;

    const STATE_VIEW: Address = address!("0x7fFE42C4a5DEeA5b0feC41C94C136Cf115597227");
    const USDC: Address = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");
    const ETH_USDC_POOL: B256 =
        b256!("0x21c67e77068de97969ba93d4aab21826d33ca12bb9f565d8496e8fda8a82ca27");

    fn reader(gateway: MockContractGateway) -> V4StateReader {
        let contracts = ContractAddresses {
            v4_state_view: Some(STATE_VIEW),
            ..Default::default()
        };
        V4StateReader::new(Arc::new(gateway), &contracts).unwrap()
    }

    #[test]
    fn test_pool_id_of_eth_usdc_pool() {
        let key = pool_key(USDC, ETH_ADDRESS, 500, 10, Address::ZERO).unwrap();

        assert_eq!(key.currency0, ETH_ADDRESS);
        assert_eq!(key.currency1, USDC);
        assert_eq!(pool_id(&key), ETH_USDC_POOL);
    }

    #[test]
    fn test_pool_key_rejects_bad_parameters() {
        assert!(matches!(
            pool_key(USDC, USDC, 500, 10, Address::ZERO),
            Err(UniswapError::InvalidArgument(_))
        ));
        assert!(matches!(
            pool_key(ETH_ADDRESS, USDC, 1_000_001, 10, Address::ZERO),
            Err(UniswapError::InvalidFeeTier(_))
        ));
        assert!(matches!(
            pool_key(ETH_ADDRESS, USDC, 500, 0, Address::ZERO),
            Err(UniswapError::InvalidArgument(_))
        ));
        assert!(pool_key(ETH_ADDRESS, USDC, DYNAMIC_FEE_FLAG, 60, Address::ZERO).is_ok());
    }

    #[tokio::test]
    async fn test_get_slot0_queries_by_pool_id() {
        let mut gateway = MockContractGateway::new();
        gateway
            .expect_call()
            .withf(|to, _| *to == STATE_VIEW)
            .times(1)
            .returning(|_, data| {
                let call = IStateView::getSlot0Call::abi_decode(&data).unwrap();
                assert_eq!(call.poolId, ETH_USDC_POOL);
                let slot0 = (U256::from(1u128 << 96), -200_000i32, 0u32, 500u32);
                Ok(Bytes::from(slot0.abi_encode_params()))
            });

        let key = pool_key(ETH_ADDRESS, USDC, 500, 10, Address::ZERO).unwrap();
        let slot0 = reader(gateway).get_slot0(&key).await.unwrap();

        assert_eq!(slot0.sqrt_price_x96, U256::from(1u128 << 96));
        assert_eq!(slot0.tick, -200_000);
        assert_eq!(slot0.lp_fee, 500);
    }

    #[tokio::test]
    async fn test_uninitialized_pool_is_reported() {
        let mut gateway = MockContractGateway::new();
        gateway.expect_call().returning(|_, _| {
            Ok(Bytes::from((U256::ZERO, 0i32, 0u32, 0u32).abi_encode_params()))
        });

        let key = pool_key(ETH_ADDRESS, USDC, 3000, 60, Address::ZERO).unwrap();
        let result = reader(gateway).get_slot0(&key).await;
        assert!(matches!(result, Err(UniswapError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_get_liquidity() {
        let mut gateway = MockContractGateway::new();
        gateway
            .expect_call()
            .withf(|_, data| data[..4] == IStateView::getLiquidityCall::SELECTOR)
            .returning(|_, _| Ok(Bytes::from(U256::from(42u64).abi_encode())));

        let key = pool_key(ETH_ADDRESS, USDC, 500, 10, Address::ZERO).unwrap();
        assert_eq!(reader(gateway).get_liquidity(&key).await.unwrap(), 42);
    }
}
