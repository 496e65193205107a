//! Spot prices, price impact and fee figures.
//!
//! These are `f64` approximations meant for display and rough checks, trades
//! always guard with exact integer quotes.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tracing::instrument;

use super::cache::LookupCache;
use super::client::load_token;
use super::constants::{ContractAddresses, require};
use super::fee::FeeTier;
use super::protocol::v3::pool_address;
use super::protocol::{Protocol, QuoteRequest, TradeDirection, balance_of};
use super::tick_math::{sqrt_price_to_price, u256_to_f64};
use super::token_registry::ETH_ADDRESS;
use super::version::ProtocolVersion;
use super::{UniswapError, UniswapResult};
use crate::repository::contract::{IUniswapV2Factory, IUniswapV3Pool};
use crate::repository::{ContractGateway, read_contract};

/// Maker fee of the V1 and V2 pools.
pub fn fee_maker() -> f64 {
    0.0
}

/// Taker fee of the V1 and V2 pools.
pub fn fee_taker() -> f64 {
    0.003
}

/// Fee actually charged on `amount_in` as a fraction of it.
///
/// Pools round the fee up to a whole unit, so small trades pay more than the
/// nominal rate.
pub fn realised_fee_percentage(fee: FeeTier, amount_in: U256) -> f64 {
    if amount_in.is_zero() {
        return 0.0;
    }
    let charged = amount_in.saturating_mul(U256::from(fee.value()));
    let million = U256::from(1_000_000);
    let mut realised = charged / million;
    if !(charged % million).is_zero() {
        realised += U256::from(1);
    }
    u256_to_f64(realised) / u256_to_f64(amount_in)
}

pub struct PriceEstimator {
    gateway: Arc<dyn ContractGateway>,
    protocol: Arc<dyn Protocol>,
    cache: LookupCache,
    contracts: ContractAddresses,
}

impl PriceEstimator {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        protocol: Arc<dyn Protocol>,
        contracts: ContractAddresses,
        cache: LookupCache,
    ) -> Self {
        Self {
            gateway,
            protocol,
            cache,
            contracts,
        }
    }

    async fn wrap(&self, token: Address) -> UniswapResult<Address> {
        if token == ETH_ADDRESS {
            self.protocol.weth_address().await
        } else {
            Ok(token)
        }
    }

    /// Spot price of one whole `token_in` in whole `token_out`, read from the
    /// pool without trading.
    #[instrument(skip(self), err)]
    pub async fn get_raw_price(
        &self,
        token_in: Address,
        token_out: Address,
        fee: FeeTier,
    ) -> UniswapResult<f64> {
        let token_in = self.wrap(token_in).await?;
        let token_out = self.wrap(token_out).await?;

        match self.protocol.version() {
            ProtocolVersion::V2 => self.pair_price(token_in, token_out).await,
            ProtocolVersion::V3 => self.pool_price(token_in, token_out, fee).await,
            version => Err(UniswapError::UnsupportedOperation(format!(
                "raw prices are not available on Uniswap {version}"
            ))),
        }
    }

    async fn pair_price(&self, token_in: Address, token_out: Address) -> UniswapResult<f64> {
        let gateway = self.gateway.as_ref();
        let factory = require(self.contracts.v2_factory, "Uniswap V2 factory")?;
        let pair = read_contract(
            gateway,
            factory,
            IUniswapV2Factory::getPairCall {
                tokenA: token_in,
                tokenB: token_out,
            },
        )
        .await?;
        if pair.is_zero() {
            return Err(UniswapError::InvalidToken(format!(
                "no V2 pair for {token_in} and {token_out}"
            )));
        }

        let reserve_in = self.whole_units(token_in, balance_of(gateway, token_in, pair).await?).await?;
        let reserve_out =
            self.whole_units(token_out, balance_of(gateway, token_out, pair).await?).await?;
        if reserve_in == 0.0 {
            return Err(UniswapError::InvalidArgument(format!(
                "V2 pair {pair} holds none of {token_in}"
            )));
        }
        Ok(reserve_out / reserve_in)
    }

    async fn pool_price(
        &self,
        token_in: Address,
        token_out: Address,
        fee: FeeTier,
    ) -> UniswapResult<f64> {
        let gateway = self.gateway.as_ref();
        let factory = require(self.contracts.v3_factory, "Uniswap V3 factory")?;
        let pool = pool_address(gateway, &self.cache, factory, token_in, token_out, fee).await?;

        let token1 = read_contract(gateway, pool, IUniswapV3Pool::token1Call {}).await?;
        let token0 = if token1 == token_in { token_out } else { token_in };
        let decimals0 = load_token(gateway, token0).await?.decimals;
        let decimals1 = load_token(gateway, token1).await?.decimals;

        let slot0 = read_contract(gateway, pool, IUniswapV3Pool::slot0Call {}).await?;
        // token1 per token0, in whole units
        let price = sqrt_price_to_price(U256::from(slot0.sqrtPriceX96))
            * 10f64.powi(decimals0.into())
            / 10f64.powi(decimals1.into());

        if token1 != token_in {
            return Ok(price);
        }
        if price == 0.0 {
            return Err(UniswapError::InvalidArgument(format!("Pool {pool} has a zero price")));
        }
        Ok(1.0 / price)
    }

    async fn whole_units(&self, token: Address, amount: U256) -> UniswapResult<f64> {
        let decimals = load_token(self.gateway.as_ref(), token).await?.decimals;
        Ok(u256_to_f64(amount) / 10f64.powi(decimals.into()))
    }

    /// Price impact of selling `amount_in`, net of the realised pool fee,
    /// as a fraction (`0.01` is 1%).
    ///
    /// Returns `1.0` when there is no pool or it holds nothing to price against.
    #[instrument(skip(self), err)]
    pub async fn estimate_price_impact(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        fee: FeeTier,
        route: Option<Vec<Address>>,
    ) -> UniswapResult<f64> {
        let raw_price = match self.get_raw_price(token_in, token_out, fee).await {
            Ok(price) if price > 0.0 => price,
            Ok(_) | Err(UniswapError::InvalidToken(_) | UniswapError::InvalidArgument(_)) => {
                return Ok(1.0);
            }
            Err(e) => return Err(e),
        };

        let request = QuoteRequest {
            token_in,
            token_out,
            amount: amount_in,
            direction: TradeDirection::ExactInput,
            fee,
            route,
        };
        let quoted_out = match self.protocol.quote(&request).await {
            Ok(quote) => quote.amount,
            Err(UniswapError::InvalidToken(_) | UniswapError::Repository(_)) => return Ok(1.0),
            Err(e) => return Err(e),
        };

        let amount_in = self.whole_units(self.wrap(token_in).await?, amount_in).await?;
        let quoted_out = self.whole_units(self.wrap(token_out).await?, quoted_out).await?;
        let realised_price = quoted_out / amount_in;

        let impact = (raw_price - realised_price) / raw_price;
        Ok(impact - realised_fee_percentage(fee, request.amount))
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Bytes, address};
    use alloy::sol_types::{SolCall, SolValue};

    use super::*;
    use crate::repository::MockContractGateway;
    use crate::repository::contract::IERC20;
    use crate::uniswap::protocol::{v2, v3};

    const PAIR: Address = address!("0xA478c2975Ab1Ea89e8196811F51A7B7Ade33eB11");

    /// Token metadata answers, 6 decimals for USDC and 18 for everything else.
    fn token_call(to: &Address, data: &Bytes) -> Option<Bytes> {
        let selector: [u8; 4] = data.get(..4)?.try_into().ok()?;
        let encoded = match selector {
            IERC20::decimalsCall::SELECTOR if *to == v3::tests::USDC => U256::from(6).abi_encode(),
            IERC20::decimalsCall::SELECTOR => U256::from(18).abi_encode(),
            IERC20::symbolCall::SELECTOR | IERC20::nameCall::SELECTOR => "TKN".to_string().abi_encode(),
            _ => return None,
        };
        Some(encoded.into())
    }

    fn v2_estimator(pair: Address) -> PriceEstimator {
        let mut gateway = MockContractGateway::new();
        gateway.expect_call().returning(move |to, data| {
            if to == v2::tests::FACTORY {
                return Ok(pair.abi_encode().into());
            }
            if let Ok(call) = IERC20::balanceOfCall::abi_decode(&data) {
                assert_eq!(call.account, PAIR);
                let reserve = if to == v2::tests::DAI { 1_000_000 } else { 500 };
                return Ok(v2::tests::ether(reserve).abi_encode().into());
            }
            if let Some(answer) = token_call(&to, &data) {
                return Ok(answer);
            }
            Ok(v2::tests::router_call(&to, &data).unwrap())
        });
        let gateway: Arc<dyn ContractGateway> = Arc::new(gateway);

        let contracts = ContractAddresses {
            v2_router: Some(v2::tests::ROUTER),
            v2_factory: Some(v2::tests::FACTORY),
            ..Default::default()
        };
        let protocol =
            v2::V2Protocol::new(gateway.clone(), &contracts, LookupCache::new(16)).unwrap();
        PriceEstimator::new(gateway, Arc::new(protocol), contracts, LookupCache::new(16))
    }

    #[test]
    fn test_fixed_fees() {
        assert_eq!(fee_maker(), 0.0);
        assert_eq!(fee_taker(), 0.003);
    }

    #[test]
    fn test_realised_fee_rounds_up() {
        assert_eq!(realised_fee_percentage(FeeTier::Tier3000, U256::from(1_000_000)), 0.003);
        // 0.3% of 100 units rounds up to one unit
        assert_eq!(realised_fee_percentage(FeeTier::Tier3000, U256::from(100)), 0.01);
        assert_eq!(realised_fee_percentage(FeeTier::Tier500, U256::ZERO), 0.0);
    }

    #[tokio::test]
    async fn test_v2_raw_price_is_reserve_ratio() {
        let estimator = v2_estimator(PAIR);

        let price = estimator
            .get_raw_price(v2::tests::DAI, v2::tests::WETH, FeeTier::Tier3000)
            .await
            .unwrap();
        assert!((price - 0.0005).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_price_impact_of_small_trade_is_fee_only() {
        let estimator = v2_estimator(PAIR);

        let impact = estimator
            .estimate_price_impact(
                v2::tests::DAI,
                v2::tests::WETH,
                v2::tests::ether(1),
                FeeTier::Tier3000,
                None,
            )
            .await
            .unwrap();
        // one DAI against a million barely moves the price
        assert!((impact - 9.94e-7).abs() < 1e-8, "impact {impact}");
    }

    #[tokio::test]
    async fn test_missing_pair_has_full_impact() {
        let estimator = v2_estimator(Address::ZERO);

        let impact = estimator
            .estimate_price_impact(
                v2::tests::DAI,
                v2::tests::USDC,
                v2::tests::ether(1),
                FeeTier::Tier3000,
                None,
            )
            .await
            .unwrap();
        assert_eq!(impact, 1.0);
    }

    #[tokio::test]
    async fn test_v3_raw_price_is_oriented_to_input() {
        let mut gateway = MockContractGateway::new();
        gateway.expect_call().returning(|to, data| {
            if to == v3::tests::POOL {
                if data[..4] == IUniswapV3Pool::token1Call::SELECTOR {
                    return Ok(v3::tests::WETH.abi_encode().into());
                }
                // sqrt price of exactly 1
                let slot0 = (U256::from(1u128 << 96), 0i32, 0u16, 1u16, 1u16, U256::ZERO, true);
                return Ok(slot0.abi_encode_params().into());
            }
            if let Some(answer) = token_call(&to, &data) {
                return Ok(answer);
            }
            Ok(v3::tests::v3_call(&to, &data).unwrap())
        });
        let gateway: Arc<dyn ContractGateway> = Arc::new(gateway);
        let contracts = v3::tests::contracts();
        let protocol =
            v3::V3Protocol::new(gateway.clone(), &contracts, LookupCache::new(16)).unwrap();
        let estimator =
            PriceEstimator::new(gateway, Arc::new(protocol), contracts, LookupCache::new(16));

        // one raw unit each way, so a whole USDC is 1e-12 of a whole WETH
        let usdc_in_weth = estimator
            .get_raw_price(v3::tests::USDC, v3::tests::WETH, FeeTier::Tier500)
            .await
            .unwrap();
        assert!((usdc_in_weth / 1e-12 - 1.0).abs() < 1e-9);

        let eth_in_usdc = estimator
            .get_raw_price(ETH_ADDRESS, v3::tests::USDC, FeeTier::Tier500)
            .await
            .unwrap();
        assert!((eth_in_usdc / 1e12 - 1.0).abs() < 1e-9);
    }
}
