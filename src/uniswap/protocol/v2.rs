use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tracing::instrument;

use super::{
    ContractCall, Protocol, Quote, QuoteRequest, SwapPlan, Topology, TradeDirection,
    validate_route,
};
use crate::repository::contract::IUniswapV2Router02;
use crate::repository::contract::{IUniswapV2Factory, IUniswapV2Pair};
use crate::repository::{ContractGateway, read_contract};
use crate::uniswap::cache::{LookupCache, LookupKey};
use crate::uniswap::constants::{ContractAddresses, require};
use crate::uniswap::token_registry::ETH_ADDRESS;
use crate::uniswap::version::ProtocolVersion;
use crate::uniswap::{UniswapError, UniswapResult};

/// Uniswap V2: pair pools traded through Router02 along an explicit path.
pub struct V2Protocol {
    gateway: Arc<dyn ContractGateway>,
    router: Address,
    factory: Address,
    cache: LookupCache,
}

impl V2Protocol {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        contracts: &ContractAddresses,
        cache: LookupCache,
    ) -> UniswapResult<Self> {
        Ok(Self {
            gateway,
            router: require(contracts.v2_router, "Uniswap V2 router")?,
            factory: require(contracts.v2_factory, "Uniswap V2 factory")?,
            cache,
        })
    }

    pub fn router(&self) -> Address {
        self.router
    }

    /// Pair contract of two tokens, `InvalidToken` when none exists.
    #[instrument(skip(self), err)]
    pub async fn pair_address(&self, token_a: Address, token_b: Address) -> UniswapResult<Address> {
        let pair = read_contract(
            self.gateway.as_ref(),
            self.factory,
            IUniswapV2Factory::getPairCall {
                tokenA: token_a,
                tokenB: token_b,
            },
        )
        .await?;

        if pair.is_zero() {
            return Err(UniswapError::InvalidToken(format!(
                "no V2 pair for {token_a} and {token_b}"
            )));
        }
        Ok(pair)
    }

    /// Reserves of `pair` ordered as (`token_in` side, other side).
    pub async fn reserves(&self, pair: Address, token_in: Address) -> UniswapResult<(U256, U256)> {
        let gateway = self.gateway.as_ref();
        let reserves = read_contract(gateway, pair, IUniswapV2Pair::getReservesCall {}).await?;
        let token0 = read_contract(gateway, pair, IUniswapV2Pair::token0Call {}).await?;

        let (reserve0, reserve1) = (U256::from(reserves.reserve0), U256::from(reserves.reserve1));
        Ok(if token0 == token_in {
            (reserve0, reserve1)
        } else {
            (reserve1, reserve0)
        })
    }

    /// Path between two tokens with ETH mapped to WETH.
    ///
    /// Trades touching WETH go direct, anything else hops through WETH. A
    /// caller route is used as given after validation.
    pub async fn path(
        &self,
        token_in: Address,
        token_out: Address,
        route: Option<&[Address]>,
    ) -> UniswapResult<Vec<Address>> {
        let weth = self.weth_address().await?;
        let wrap = |token: Address| if token == ETH_ADDRESS { weth } else { token };
        let (token_in, token_out) = (wrap(token_in), wrap(token_out));

        if let Some(route) = route {
            validate_route(route, token_in, token_out)?;
            return Ok(route.to_vec());
        }

        if token_in == weth || token_out == weth {
            Ok(vec![token_in, token_out])
        } else {
            let path = vec![token_in, weth, token_out];
            tracing::warn!("No route specified, assuming route: {path:?}");
            Ok(path)
        }
    }
}

#[async_trait]
impl Protocol for V2Protocol {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V2
    }

    async fn weth_address(&self) -> UniswapResult<Address> {
        self.cache
            .get_or_try_insert(LookupKey::WrappedNative, || async {
                read_contract(self.gateway.as_ref(), self.router, IUniswapV2Router02::WETHCall {})
                    .await
                    .map_err(UniswapError::from)
            })
            .await
    }

    #[instrument(skip(self), err)]
    async fn quote(&self, request: &QuoteRequest) -> UniswapResult<Quote> {
        let path = self
            .path(request.token_in, request.token_out, request.route.as_deref())
            .await?;
        let gateway = self.gateway.as_ref();

        let amount = match request.direction {
            TradeDirection::ExactInput => {
                let amounts = read_contract(
                    gateway,
                    self.router,
                    IUniswapV2Router02::getAmountsOutCall {
                        amountIn: request.amount,
                        path: path.clone(),
                    },
                )
                .await?;
                amounts.last().copied()
            }
            TradeDirection::ExactOutput => {
                let amounts = read_contract(
                    gateway,
                    self.router,
                    IUniswapV2Router02::getAmountsInCall {
                        amountOut: request.amount,
                        path: path.clone(),
                    },
                )
                .await?;
                amounts.first().copied()
            }
        }
        .ok_or_else(|| UniswapError::InvalidToken(format!("router returned no amounts for {path:?}")))?;

        tracing::debug!("V2 {} quote for {} along {path:?}: {amount}", request.direction, request.amount);
        Ok(Quote {
            amount,
            direction: request.direction,
            route: path,
        })
    }

    async fn spender(&self, _token: Address) -> UniswapResult<Address> {
        Ok(self.router)
    }

    async fn build_swap(&self, plan: &SwapPlan) -> UniswapResult<ContractCall> {
        let topology = Topology::of(plan.token_in, plan.token_out)?;
        let path = plan.route.clone();
        let to = plan.beneficiary();
        let deadline = plan.deadline;

        use IUniswapV2Router02 as R;
        let call = match (plan.direction, topology, plan.fee_on_transfer) {
            (TradeDirection::ExactInput, Topology::EthToToken, false) => ContractCall::payable(
                self.router,
                &R::swapExactETHForTokensCall { amountOutMin: plan.limit, path, to, deadline },
                plan.amount,
            ),
            (TradeDirection::ExactInput, Topology::EthToToken, true) => ContractCall::payable(
                self.router,
                &R::swapExactETHForTokensSupportingFeeOnTransferTokensCall {
                    amountOutMin: plan.limit,
                    path,
                    to,
                    deadline,
                },
                plan.amount,
            ),
            (TradeDirection::ExactInput, Topology::TokenToEth, false) => ContractCall::new(
                self.router,
                &R::swapExactTokensForETHCall {
                    amountIn: plan.amount,
                    amountOutMin: plan.limit,
                    path,
                    to,
                    deadline,
                },
            ),
            (TradeDirection::ExactInput, Topology::TokenToEth, true) => ContractCall::new(
                self.router,
                &R::swapExactTokensForETHSupportingFeeOnTransferTokensCall {
                    amountIn: plan.amount,
                    amountOutMin: plan.limit,
                    path,
                    to,
                    deadline,
                },
            ),
            (TradeDirection::ExactInput, Topology::TokenToToken, false) => ContractCall::new(
                self.router,
                &R::swapExactTokensForTokensCall {
                    amountIn: plan.amount,
                    amountOutMin: plan.limit,
                    path,
                    to,
                    deadline,
                },
            ),
            (TradeDirection::ExactInput, Topology::TokenToToken, true) => ContractCall::new(
                self.router,
                &R::swapExactTokensForTokensSupportingFeeOnTransferTokensCall {
                    amountIn: plan.amount,
                    amountOutMin: plan.limit,
                    path,
                    to,
                    deadline,
                },
            ),
            (TradeDirection::ExactOutput, _, true) => {
                return Err(UniswapError::UnsupportedOperation(
                    "fee on transfer tokens can only be swapped with an exact input".to_string(),
                ));
            }
            (TradeDirection::ExactOutput, Topology::EthToToken, false) => ContractCall::payable(
                self.router,
                &R::swapETHForExactTokensCall { amountOut: plan.amount, path, to, deadline },
                plan.limit,
            ),
            (TradeDirection::ExactOutput, Topology::TokenToEth, false) => ContractCall::new(
                self.router,
                &R::swapTokensForExactETHCall {
                    amountOut: plan.amount,
                    amountInMax: plan.limit,
                    path,
                    to,
                    deadline,
                },
            ),
            (TradeDirection::ExactOutput, Topology::TokenToToken, false) => ContractCall::new(
                self.router,
                &R::swapTokensForExactTokensCall {
                    amountOut: plan.amount,
                    amountInMax: plan.limit,
                    path,
                    to,
                    deadline,
                },
            ),
        };

        Ok(call)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use alloy::primitives::{Bytes, address};
    use alloy::sol_types::{SolCall, SolValue};

    use super::*;
    use crate::repository::MockContractGateway;
    use crate::uniswap::fee::FeeTier;
    use crate::uniswap::protocol::{constant_product_input, constant_product_output};

    pub(crate) const ROUTER: Address = address!("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D");
    pub(crate) const FACTORY: Address = address!("0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f");
    pub(crate) const WETH: Address = address!("0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
    pub(crate) const DAI: Address = address!("0x6B175474E89094C44Da98b954EedeAC495271d0F");
    pub(crate) const USDC: Address = address!("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");

    pub(crate) fn ether(amount: u64) -> U256 {
        U256::from(amount) * U256::from(10).pow(U256::from(18))
    }

    /// Answers router calls like a router over a single DAI/WETH pair holding
    /// 1,000,000 DAI and 500 WETH.
    pub(crate) fn router_call(to: &Address, data: &Bytes) -> Option<Bytes> {
        if *to != ROUTER {
            return None;
        }
        let reserve = |token: Address| if token == DAI { ether(1_000_000) } else { ether(500) };

        if data[..4] == IUniswapV2Router02::WETHCall::SELECTOR {
            return Some(WETH.abi_encode().into());
        }
        if let Ok(call) = IUniswapV2Router02::getAmountsOutCall::abi_decode(data) {
            let (token_in, token_out) = (call.path[0], call.path[1]);
            let out = constant_product_output(call.amountIn, reserve(token_in), reserve(token_out))
                .unwrap();
            return Some(vec![call.amountIn, out].abi_encode().into());
        }
        if let Ok(call) = IUniswapV2Router02::getAmountsInCall::abi_decode(data) {
            let (token_in, token_out) = (call.path[0], call.path[1]);
            let cost = constant_product_input(call.amountOut, reserve(token_in), reserve(token_out))
                .unwrap();
            return Some(vec![cost, call.amountOut].abi_encode().into());
        }
        None
    }

    pub(crate) fn protocol(gateway: MockContractGateway) -> V2Protocol {
        let contracts = ContractAddresses {
            v2_router: Some(ROUTER),
            v2_factory: Some(FACTORY),
            ..Default::default()
        };
        V2Protocol::new(Arc::new(gateway), &contracts, LookupCache::new(16)).unwrap()
    }

    fn plan(direction: TradeDirection, token_in: Address, token_out: Address) -> SwapPlan {
        SwapPlan {
            token_in,
            token_out,
            direction,
            amount: U256::from(1_000),
            limit: U256::from(990),
            fee: FeeTier::Tier3000,
            route: vec![WETH, DAI],
            sender: Address::repeat_byte(1),
            recipient: None,
            deadline: U256::from(1_700_000_000u64),
            fee_on_transfer: false,
        }
    }

    #[tokio::test]
    async fn test_quote_matches_constant_product_formula() {
        let mut gateway = MockContractGateway::new();
        gateway
            .expect_call()
            .returning(|to, data| Ok(router_call(&to, &data).unwrap()));
        let v2 = protocol(gateway);

        let quote = v2
            .quote(&QuoteRequest {
                token_in: DAI,
                token_out: WETH,
                amount: ether(1),
                direction: TradeDirection::ExactInput,
                fee: FeeTier::Tier3000,
                route: None,
            })
            .await
            .unwrap();

        // 1e18 * 997 * 500e18 / (1_000_000e18 * 1000 + 1e18 * 997)
        assert_eq!(quote.amount, U256::from(498_499_502_995_995u64));
        assert_eq!(quote.route, vec![DAI, WETH]);
    }

    #[tokio::test]
    async fn test_path_hops_through_weth() {
        let mut gateway = MockContractGateway::new();
        gateway
            .expect_call()
            .times(1)
            .returning(|to, data| Ok(router_call(&to, &data).unwrap()));
        let v2 = protocol(gateway);

        assert_eq!(v2.path(DAI, USDC, None).await.unwrap(), vec![DAI, WETH, USDC]);
        assert_eq!(v2.path(ETH_ADDRESS, DAI, None).await.unwrap(), vec![WETH, DAI]);
        assert_eq!(v2.path(DAI, ETH_ADDRESS, None).await.unwrap(), vec![DAI, WETH]);
        assert_eq!(v2.path(WETH, USDC, None).await.unwrap(), vec![WETH, USDC]);
        assert_eq!(
            v2.path(DAI, USDC, Some(&[DAI, USDC])).await.unwrap(),
            vec![DAI, USDC]
        );
    }

    #[tokio::test]
    async fn test_build_swap_selects_router_function() {
        let v2 = protocol(MockContractGateway::new());

        let call = v2
            .build_swap(&plan(TradeDirection::ExactInput, ETH_ADDRESS, DAI))
            .await
            .unwrap();
        assert_eq!(call.to, ROUTER);
        assert_eq!(call.value, U256::from(1_000));
        let decoded = IUniswapV2Router02::swapExactETHForTokensCall::abi_decode(&call.data).unwrap();
        assert_eq!(decoded.amountOutMin, U256::from(990));
        assert_eq!(decoded.to, Address::repeat_byte(1));

        let mut exact_output = plan(TradeDirection::ExactOutput, ETH_ADDRESS, DAI);
        exact_output.limit = U256::from(1_010);
        let call = v2.build_swap(&exact_output).await.unwrap();
        assert_eq!(call.value, U256::from(1_010));
        assert!(IUniswapV2Router02::swapETHForExactTokensCall::abi_decode(&call.data).is_ok());

        let mut to_eth = plan(TradeDirection::ExactOutput, DAI, ETH_ADDRESS);
        to_eth.recipient = Some(Address::repeat_byte(9));
        let call = v2.build_swap(&to_eth).await.unwrap();
        assert_eq!(call.value, U256::ZERO);
        let decoded = IUniswapV2Router02::swapTokensForExactETHCall::abi_decode(&call.data).unwrap();
        assert_eq!(decoded.amountInMax, U256::from(990));
        assert_eq!(decoded.to, Address::repeat_byte(9));
    }

    #[tokio::test]
    async fn test_fee_on_transfer_variants() {
        let v2 = protocol(MockContractGateway::new());

        let mut input = plan(TradeDirection::ExactInput, DAI, USDC);
        input.fee_on_transfer = true;
        let call = v2.build_swap(&input).await.unwrap();
        assert_eq!(
            call.data[..4],
            IUniswapV2Router02::swapExactTokensForTokensSupportingFeeOnTransferTokensCall::SELECTOR
        );

        let mut output = plan(TradeDirection::ExactOutput, DAI, USDC);
        output.fee_on_transfer = true;
        assert!(matches!(
            v2.build_swap(&output).await,
            Err(UniswapError::UnsupportedOperation(_))
        ));
    }
}
