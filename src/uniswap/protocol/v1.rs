use std::sync::Arc;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tracing::instrument;

use super::{
    ContractCall, Protocol, Quote, QuoteRequest, SwapPlan, Topology, TradeDirection,
    constant_product_input,
};
use crate::repository::contract::{IERC20, IUniswapV1Exchange, IUniswapV1Factory};
use crate::repository::{ContractGateway, read_contract};
use crate::uniswap::cache::{LookupCache, LookupKey};
use crate::uniswap::constants::{ContractAddresses, require};
use crate::uniswap::tick_math::u256_to_f64;
use crate::uniswap::token_registry::ETH_ADDRESS;
use crate::uniswap::version::ProtocolVersion;
use crate::uniswap::{UniswapError, UniswapResult};

/// Safety margin on the ETH leg of a token to token trade, as a ratio.
const ETH_LEG_MARGIN: (u64, u64) = (12, 10);

/// Uniswap V1: one ETH/token exchange contract per token.
///
/// Token to token trades run through ETH in a single exchange call.
pub struct V1Protocol {
    gateway: Arc<dyn ContractGateway>,
    factory: Address,
    cache: LookupCache,
}

impl V1Protocol {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        contracts: &ContractAddresses,
        cache: LookupCache,
    ) -> UniswapResult<Self> {
        Ok(Self {
            gateway,
            factory: require(contracts.v1_factory, "Uniswap V1 factory")?,
            cache,
        })
    }

    /// Exchange contract of `token`, `InvalidToken` when the factory has none.
    pub async fn exchange_address(&self, token: Address) -> UniswapResult<Address> {
        self.cache
            .get_or_try_insert(LookupKey::Exchange(token), || self.fetch_exchange(token))
            .await
    }

    async fn fetch_exchange(&self, token: Address) -> UniswapResult<Address> {
        let exchange = read_contract(
            self.gateway.as_ref(),
            self.factory,
            IUniswapV1Factory::getExchangeCall { token },
        )
        .await?;

        if exchange.is_zero() {
            return Err(UniswapError::InvalidToken(format!("no V1 exchange for {token}")));
        }
        tracing::info!("Loaded V1 exchange {exchange} for {token}");
        Ok(exchange)
    }

    /// ETH held by the exchange of `token`.
    #[instrument(skip(self), err)]
    pub async fn ex_eth_balance(&self, token: Address) -> UniswapResult<U256> {
        let exchange = self.exchange_address(token).await?;
        Ok(self.gateway.get_balance(exchange).await?)
    }

    /// `token` held by its own exchange.
    #[instrument(skip(self), err)]
    pub async fn ex_token_balance(&self, token: Address) -> UniswapResult<U256> {
        let exchange = self.exchange_address(token).await?;
        self.token_reserve(token, exchange).await
    }

    async fn token_reserve(&self, token: Address, exchange: Address) -> UniswapResult<U256> {
        Ok(read_contract(
            self.gateway.as_ref(),
            token,
            IERC20::balanceOfCall { account: exchange },
        )
        .await?)
    }

    /// Tokens per ETH in the exchange of `token`.
    pub async fn exchange_rate(&self, token: Address) -> UniswapResult<f64> {
        let eth_reserve = self.ex_eth_balance(token).await?;
        let token_reserve = self.ex_token_balance(token).await?;
        if eth_reserve.is_zero() {
            return Err(UniswapError::InvalidArgument(format!(
                "V1 exchange of {token} holds no ETH"
            )));
        }
        Ok(u256_to_f64(token_reserve) / u256_to_f64(eth_reserve))
    }

    /// Encodes a deposit of `max_eth` plus tokens at the current reserve ratio.
    ///
    /// The token cap is `max_eth * token_reserve / eth_reserve + 10`, the slack
    /// absorbing rounding between this read and execution.
    pub async fn add_liquidity_call(
        &self,
        token: Address,
        max_eth: U256,
        min_liquidity: U256,
        deadline: U256,
    ) -> UniswapResult<ContractCall> {
        let exchange = self.exchange_address(token).await?;
        let eth_reserve = self.gateway.get_balance(exchange).await?;
        let token_reserve = self.token_reserve(token, exchange).await?;
        if eth_reserve.is_zero() {
            return Err(UniswapError::InvalidArgument(format!(
                "V1 exchange of {token} holds no ETH"
            )));
        }

        let max_tokens = max_eth
            .checked_mul(token_reserve)
            .map(|scaled| scaled / eth_reserve + U256::from(10))
            .ok_or_else(|| {
                UniswapError::InvalidArgument(format!("Deposit of {max_eth} wei is too large"))
            })?;

        Ok(ContractCall::payable(
            exchange,
            &IUniswapV1Exchange::addLiquidityCall {
                min_liquidity,
                max_tokens,
                deadline,
            },
            max_eth,
        ))
    }

    /// Encodes a withdrawal burning `amount` liquidity tokens, accepting any payout.
    pub async fn remove_liquidity_call(
        &self,
        token: Address,
        amount: U256,
        deadline: U256,
    ) -> UniswapResult<ContractCall> {
        let exchange = self.exchange_address(token).await?;
        Ok(ContractCall::new(
            exchange,
            &IUniswapV1Exchange::removeLiquidityCall {
                amount,
                min_eth: U256::from(1),
                min_tokens: U256::from(1),
                deadline,
            },
        ))
    }

    /// Caps of a token to token exact output trade: the ETH bought on the
    /// first leg, with its margin, must be coverable by the input exchange.
    async fn max_eth_sold(&self, plan: &SwapPlan, exchange_in: Address) -> UniswapResult<U256> {
        let exchange_out = self.exchange_address(plan.token_out).await?;
        let eth_reserve_out = self.gateway.get_balance(exchange_out).await?;
        let token_reserve_out = self.token_reserve(plan.token_out, exchange_out).await?;
        let eth_needed = constant_product_input(plan.amount, eth_reserve_out, token_reserve_out)?;

        let (numerator, denominator) = ETH_LEG_MARGIN;
        let max_eth_sold = eth_needed
            .checked_mul(U256::from(numerator))
            .map(|scaled| scaled / U256::from(denominator))
            .ok_or_else(|| UniswapError::insufficient_balance(token_reserve_out, plan.amount))?;

        let eth_reserve_in = self.gateway.get_balance(exchange_in).await?;
        if eth_reserve_in <= max_eth_sold {
            return Err(UniswapError::insufficient_balance(eth_reserve_in, max_eth_sold));
        }
        Ok(max_eth_sold)
    }

    /// Reads one exchange price getter, `eth_in` selecting the ETH to token side.
    async fn price(
        &self,
        exchange: Address,
        direction: TradeDirection,
        eth_in: bool,
        amount: U256,
    ) -> UniswapResult<U256> {
        use IUniswapV1Exchange as Ex;
        let gateway = self.gateway.as_ref();
        let price = match (eth_in, direction) {
            (true, TradeDirection::ExactInput) => {
                let call = Ex::getEthToTokenInputPriceCall { eth_sold: amount };
                read_contract(gateway, exchange, call).await?
            }
            (true, TradeDirection::ExactOutput) => {
                let call = Ex::getEthToTokenOutputPriceCall { tokens_bought: amount };
                read_contract(gateway, exchange, call).await?
            }
            (false, TradeDirection::ExactInput) => {
                let call = Ex::getTokenToEthInputPriceCall { tokens_sold: amount };
                read_contract(gateway, exchange, call).await?
            }
            (false, TradeDirection::ExactOutput) => {
                let call = Ex::getTokenToEthOutputPriceCall { eth_bought: amount };
                read_contract(gateway, exchange, call).await?
            }
        };
        Ok(price)
    }
}

#[async_trait]
impl Protocol for V1Protocol {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V1
    }

    async fn weth_address(&self) -> UniswapResult<Address> {
        Err(UniswapError::UnsupportedOperation(
            "Uniswap V1 trades native ETH and has no wrapped token".to_string(),
        ))
    }

    #[instrument(skip(self), err)]
    async fn quote(&self, request: &QuoteRequest) -> UniswapResult<Quote> {
        if request.route.is_some() {
            return Err(UniswapError::UnsupportedOperation(
                "custom routes are not supported by Uniswap V1".to_string(),
            ));
        }
        let (token_in, token_out) = (request.token_in, request.token_out);
        let direction = request.direction;

        let (amount, route) = match Topology::of(token_in, token_out)? {
            Topology::EthToToken => {
                let exchange = self.exchange_address(token_out).await?;
                let amount = self.price(exchange, direction, true, request.amount).await?;
                (amount, vec![ETH_ADDRESS, token_out])
            }
            Topology::TokenToEth => {
                let exchange = self.exchange_address(token_in).await?;
                let amount = self.price(exchange, direction, false, request.amount).await?;
                (amount, vec![token_in, ETH_ADDRESS])
            }
            // no token pools on V1, chain the two ETH legs
            Topology::TokenToToken => {
                let exchange_in = self.exchange_address(token_in).await?;
                let exchange_out = self.exchange_address(token_out).await?;
                let amount = match direction {
                    TradeDirection::ExactInput => {
                        let eth = self.price(exchange_in, direction, false, request.amount).await?;
                        self.price(exchange_out, direction, true, eth).await?
                    }
                    TradeDirection::ExactOutput => {
                        let eth = self.price(exchange_out, direction, true, request.amount).await?;
                        self.price(exchange_in, direction, false, eth).await?
                    }
                };
                (amount, vec![token_in, ETH_ADDRESS, token_out])
            }
        };

        tracing::debug!("V1 {direction} quote for {} along {route:?}: {amount}", request.amount);
        Ok(Quote {
            amount,
            direction,
            route,
        })
    }

    async fn spender(&self, token: Address) -> UniswapResult<Address> {
        self.exchange_address(token).await
    }

    async fn build_swap(&self, plan: &SwapPlan) -> UniswapResult<ContractCall> {
        if plan.fee_on_transfer {
            return Err(UniswapError::UnsupportedOperation(
                "fee on transfer not supported by Uniswap v1".to_string(),
            ));
        }
        use IUniswapV1Exchange as Ex;
        let deadline = plan.deadline;
        let recipient = plan.recipient;

        let call = match (Topology::of(plan.token_in, plan.token_out)?, plan.direction) {
            (Topology::EthToToken, TradeDirection::ExactInput) => {
                let exchange = self.exchange_address(plan.token_out).await?;
                let min_tokens = plan.limit;
                match recipient {
                    None => ContractCall::payable(
                        exchange,
                        &Ex::ethToTokenSwapInputCall { min_tokens, deadline },
                        plan.amount,
                    ),
                    Some(recipient) => ContractCall::payable(
                        exchange,
                        &Ex::ethToTokenTransferInputCall { min_tokens, deadline, recipient },
                        plan.amount,
                    ),
                }
            }
            (Topology::EthToToken, TradeDirection::ExactOutput) => {
                let exchange = self.exchange_address(plan.token_out).await?;
                let tokens_bought = plan.amount;
                match recipient {
                    None => ContractCall::payable(
                        exchange,
                        &Ex::ethToTokenSwapOutputCall { tokens_bought, deadline },
                        plan.limit,
                    ),
                    Some(recipient) => ContractCall::payable(
                        exchange,
                        &Ex::ethToTokenTransferOutputCall { tokens_bought, deadline, recipient },
                        plan.limit,
                    ),
                }
            }
            (Topology::TokenToEth, TradeDirection::ExactInput) => {
                let exchange = self.exchange_address(plan.token_in).await?;
                let (tokens_sold, min_eth) = (plan.amount, plan.limit);
                match recipient {
                    None => ContractCall::new(
                        exchange,
                        &Ex::tokenToEthSwapInputCall { tokens_sold, min_eth, deadline },
                    ),
                    Some(recipient) => ContractCall::new(
                        exchange,
                        &Ex::tokenToEthTransferInputCall { tokens_sold, min_eth, deadline, recipient },
                    ),
                }
            }
            (Topology::TokenToEth, TradeDirection::ExactOutput) => {
                let exchange = self.exchange_address(plan.token_in).await?;
                let (eth_bought, max_tokens) = (plan.amount, plan.limit);
                match recipient {
                    None => ContractCall::new(
                        exchange,
                        &Ex::tokenToEthSwapOutputCall { eth_bought, max_tokens, deadline },
                    ),
                    Some(recipient) => ContractCall::new(
                        exchange,
                        &Ex::tokenToEthTransferOutputCall { eth_bought, max_tokens, deadline, recipient },
                    ),
                }
            }
            (Topology::TokenToToken, TradeDirection::ExactInput) => {
                let exchange = self.exchange_address(plan.token_in).await?;
                let token_addr = plan.token_out;
                let (tokens_sold, min_tokens_bought) = (plan.amount, plan.limit);
                // the output guard protects the trade, any ETH amount is accepted in between
                let min_eth_bought = U256::from(1);
                match recipient {
                    None => ContractCall::new(
                        exchange,
                        &Ex::tokenToTokenSwapInputCall {
                            tokens_sold,
                            min_tokens_bought,
                            min_eth_bought,
                            deadline,
                            token_addr,
                        },
                    ),
                    Some(recipient) => ContractCall::new(
                        exchange,
                        &Ex::tokenToTokenTransferInputCall {
                            tokens_sold,
                            min_tokens_bought,
                            min_eth_bought,
                            deadline,
                            recipient,
                            token_addr,
                        },
                    ),
                }
            }
            (Topology::TokenToToken, TradeDirection::ExactOutput) => {
                let exchange = self.exchange_address(plan.token_in).await?;
                let max_eth_sold = self.max_eth_sold(plan, exchange).await?;
                let token_addr = plan.token_out;
                let (tokens_bought, max_tokens_sold) = (plan.amount, plan.limit);
                match recipient {
                    None => ContractCall::new(
                        exchange,
                        &Ex::tokenToTokenSwapOutputCall {
                            tokens_bought,
                            max_tokens_sold,
                            max_eth_sold,
                            deadline,
                            token_addr,
                        },
                    ),
                    Some(recipient) => ContractCall::new(
                        exchange,
                        &Ex::tokenToTokenTransferOutputCall {
                            tokens_bought,
                            max_tokens_sold,
                            max_eth_sold,
                            deadline,
                            recipient,
                            token_addr,
                        },
                    ),
                }
            }
        };

        Ok(call)
    }
}
