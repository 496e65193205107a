use std::sync::Arc;

use alloy::primitives::aliases::{U24, U160};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use tracing::instrument;

use super::{ContractCall, Protocol, Quote, QuoteRequest, SwapPlan, Topology, TradeDirection};
use crate::repository::contract::{IQuoterV2, ISwapRouter, IUniswapV3Factory};
use crate::repository::{ContractGateway, read_contract};
use crate::uniswap::cache::{LookupCache, LookupKey};
use crate::uniswap::constants::{ContractAddresses, require};
use crate::uniswap::fee::FeeTier;
use crate::uniswap::token_registry::ETH_ADDRESS;
use crate::uniswap::version::ProtocolVersion;
use crate::uniswap::{UniswapError, UniswapResult};

/// Looks up the pool of a token pair and fee tier through the factory.
///
/// Existing pools never move, so the address is cached. A missing pool is an
/// `InvalidToken` error and is not cached.
pub async fn pool_address(
    gateway: &dyn ContractGateway,
    cache: &LookupCache,
    factory: Address,
    token_a: Address,
    token_b: Address,
    fee: FeeTier,
) -> UniswapResult<Address> {
    cache
        .get_or_try_insert(LookupKey::pool(token_a, token_b, fee), || {
            fetch_pool(gateway, factory, token_a, token_b, fee)
        })
        .await
}

async fn fetch_pool(
    gateway: &dyn ContractGateway,
    factory: Address,
    token_a: Address,
    token_b: Address,
    fee: FeeTier,
) -> UniswapResult<Address> {
    let pool = read_contract(
        gateway,
        factory,
        IUniswapV3Factory::getPoolCall {
            tokenA: token_a,
            tokenB: token_b,
            fee: U24::from(fee.value()),
        },
    )
    .await?;

    if pool.is_zero() {
        return Err(UniswapError::InvalidToken(format!(
            "no V3 pool for {token_a} and {token_b} with fee {fee}"
        )));
    }
    Ok(pool)
}

/// Uniswap V3: concentrated liquidity pools quoted by QuoterV2 and traded
/// single-hop through SwapRouter.
pub struct V3Protocol {
    gateway: Arc<dyn ContractGateway>,
    router: Address,
    quoter: Address,
    factory: Address,
    cache: LookupCache,
}

impl V3Protocol {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        contracts: &ContractAddresses,
        cache: LookupCache,
    ) -> UniswapResult<Self> {
        Ok(Self {
            gateway,
            router: require(contracts.v3_router, "Uniswap V3 swap router")?,
            quoter: require(contracts.v3_quoter, "Uniswap V3 quoter")?,
            factory: require(contracts.v3_factory, "Uniswap V3 factory")?,
            cache,
        })
    }

    pub fn router(&self) -> Address {
        self.router
    }

    pub fn factory(&self) -> Address {
        self.factory
    }

    async fn wrap(&self, token: Address) -> UniswapResult<Address> {
        if token == ETH_ADDRESS {
            self.weth_address().await
        } else {
            Ok(token)
        }
    }

    fn encode_multicall(&self, calls: Vec<Bytes>, value: U256) -> ContractCall {
        ContractCall::payable(self.router, &ISwapRouter::multicallCall { data: calls }, value)
    }
}

#[async_trait]
impl Protocol for V3Protocol {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V3
    }

    async fn weth_address(&self) -> UniswapResult<Address> {
        self.cache
            .get_or_try_insert(LookupKey::WrappedNative, || async {
                read_contract(self.gateway.as_ref(), self.router, ISwapRouter::WETH9Call {})
                    .await
                    .map_err(UniswapError::from)
            })
            .await
    }

    #[instrument(skip(self), err)]
    async fn quote(&self, request: &QuoteRequest) -> UniswapResult<Quote> {
        // multi-hop quotes need the packed path encoding of the quoter
        if request.route.is_some() {
            return Err(UniswapError::UnsupportedOperation(
                "custom route not yet supported for v3".to_string(),
            ));
        }

        let token_in = self.wrap(request.token_in).await?;
        let token_out = self.wrap(request.token_out).await?;
        let gateway = self.gateway.as_ref();
        pool_address(gateway, &self.cache, self.factory, token_in, token_out, request.fee).await?;

        let fee = U24::from(request.fee.value());
        // no bound on the price movement while estimating
        let sqrt_price_limit = U160::ZERO;

        let amount = match request.direction {
            TradeDirection::ExactInput => {
                read_contract(
                    gateway,
                    self.quoter,
                    IQuoterV2::quoteExactInputSingleCall {
                        params: IQuoterV2::QuoteExactInputSingleParams {
                            tokenIn: token_in,
                            tokenOut: token_out,
                            amountIn: request.amount,
                            fee,
                            sqrtPriceLimitX96: sqrt_price_limit,
                        },
                    },
                )
                .await?
                .amountOut
            }
            TradeDirection::ExactOutput => {
                read_contract(
                    gateway,
                    self.quoter,
                    IQuoterV2::quoteExactOutputSingleCall {
                        params: IQuoterV2::QuoteExactOutputSingleParams {
                            tokenIn: token_in,
                            tokenOut: token_out,
                            amount: request.amount,
                            fee,
                            sqrtPriceLimitX96: sqrt_price_limit,
                        },
                    },
                )
                .await?
                .amountIn
            }
        };

        tracing::debug!(
            "V3 {} quote for {} of {token_in} -> {token_out} (fee {}): {amount}",
            request.direction,
            request.amount,
            request.fee
        );
        Ok(Quote {
            amount,
            direction: request.direction,
            route: vec![token_in, token_out],
        })
    }

    async fn spender(&self, _token: Address) -> UniswapResult<Address> {
        Ok(self.router)
    }

    async fn build_swap(&self, plan: &SwapPlan) -> UniswapResult<ContractCall> {
        if plan.fee_on_transfer {
            return Err(UniswapError::UnsupportedOperation(
                "fee on transfer not supported by Uniswap v3".to_string(),
            ));
        }

        let topology = Topology::of(plan.token_in, plan.token_out)?;
        let token_in = self.wrap(plan.token_in).await?;
        let token_out = self.wrap(plan.token_out).await?;
        let fee = U24::from(plan.fee.value());
        let recipient = plan.beneficiary();

        // The router cannot pay out ETH directly: a swap into ETH sends WETH to
        // the router, which the second call of the multicall unwraps.
        let swap_recipient = if topology == Topology::TokenToEth {
            self.router
        } else {
            recipient
        };

        let call = match plan.direction {
            TradeDirection::ExactInput => {
                let swap = ISwapRouter::exactInputSingleCall {
                    params: ISwapRouter::ExactInputSingleParams {
                        tokenIn: token_in,
                        tokenOut: token_out,
                        fee,
                        recipient: swap_recipient,
                        deadline: plan.deadline,
                        amountIn: plan.amount,
                        amountOutMinimum: plan.limit,
                        sqrtPriceLimitX96: U160::ZERO,
                    },
                };
                match topology {
                    Topology::EthToToken => ContractCall::payable(self.router, &swap, plan.amount),
                    Topology::TokenToToken => ContractCall::new(self.router, &swap),
                    Topology::TokenToEth => {
                        let unwrap = ISwapRouter::unwrapWETH9Call {
                            amountMinimum: plan.limit,
                            recipient,
                        };
                        self.encode_multicall(
                            vec![swap.abi_encode().into(), unwrap.abi_encode().into()],
                            U256::ZERO,
                        )
                    }
                }
            }
            TradeDirection::ExactOutput => {
                let swap = ISwapRouter::exactOutputSingleCall {
                    params: ISwapRouter::ExactOutputSingleParams {
                        tokenIn: token_in,
                        tokenOut: token_out,
                        fee,
                        recipient: swap_recipient,
                        deadline: plan.deadline,
                        amountOut: plan.amount,
                        amountInMaximum: plan.limit,
                        sqrtPriceLimitX96: U160::ZERO,
                    },
                };
                match topology {
                    // unspent ETH is refunded in the same transaction
                    Topology::EthToToken => self.encode_multicall(
                        vec![
                            swap.abi_encode().into(),
                            ISwapRouter::refundETHCall {}.abi_encode().into(),
                        ],
                        plan.limit,
                    ),
                    Topology::TokenToToken => ContractCall::new(self.router, &swap),
                    Topology::TokenToEth => {
                        let unwrap = ISwapRouter::unwrapWETH9Call {
                            amountMinimum: plan.amount,
                            recipient,
                        };
                        self.encode_multicall(
                            vec![swap.abi_encode().into(), unwrap.abi_encode().into()],
                            U256::ZERO,
                        )
                    }
                }
            }
        };

        Ok(call)
    }
}
