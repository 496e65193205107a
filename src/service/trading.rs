use std::sync::Arc;

use alloy::primitives::{Address, U256};
use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{Json, ServerHandler, tool, tool_handler, tool_router};
use tracing::instrument;

use crate::service::types::{
    GetBalanceRequest, GetBalanceResponse, GetBalanceResult, GetPoolStateResponse,
    GetPoolStateResult, GetPoolTvlResponse, GetPoolTvlResult, GetQuoteRequest, GetQuoteResponse,
    GetQuoteResult, PoolRequest, QuoteSide, SwapTokensRequest, SwapTokensResponse,
    SwapTokensResult,
};
use crate::service::utils::{format_balance, format_percent, parse_amount, parse_slippage_percent};
use crate::service::{ServiceError, ServiceResult};
use crate::uniswap::address::{format, parse};
use crate::uniswap::tick_math::sqrt_price_to_price;
use crate::uniswap::trade::SwapRequest;
use crate::uniswap::{ETH_ADDRESS, ProtocolVersion, Token, Uniswap};

pub struct UniswapTradingService {
    tool_router: ToolRouter<Self>,
    uniswap: Arc<Uniswap>,
    default_wallet: Option<Address>,
}

// MCP Tool Layer
#[tool_router]
impl UniswapTradingService {
    /// `default_wallet` is queried by balance requests that name no wallet
    /// when the client has no signer of its own.
    pub fn new(uniswap: Arc<Uniswap>, default_wallet: Option<Address>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            uniswap,
            default_wallet,
        }
    }

    #[instrument(skip(self))]
    #[tool(description = "Query ETH and ERC20 token balances")]
    pub async fn get_balance(
        &self,
        Parameters(req): Parameters<GetBalanceRequest>,
    ) -> Json<GetBalanceResult> {
        match self.get_balance_impl(req).await {
            Ok(response) => Json(GetBalanceResult::Success(response)),
            Err(e) => {
                tracing::error!("Failed to get balance: {e}");
                Json(GetBalanceResult::Error { error: e })
            }
        }
    }

    #[instrument(skip(self))]
    #[tool(
        description = "Quote a Uniswap trade on the configured version: output for an exact input, or input for an exact output"
    )]
    pub async fn get_quote(
        &self,
        Parameters(req): Parameters<GetQuoteRequest>,
    ) -> Json<GetQuoteResult> {
        match self.get_quote_impl(req).await {
            Ok(response) => Json(GetQuoteResult::Success(response)),
            Err(e) => {
                tracing::error!("Failed to get quote: {e}");
                Json(GetQuoteResult::Error { error: e })
            }
        }
    }

    #[instrument(skip(self))]
    #[tool(
        description = "Sign and submit a Uniswap swap from the configured wallet. Returns the transaction hash without waiting for it to be mined."
    )]
    pub async fn swap_tokens(
        &self,
        Parameters(req): Parameters<SwapTokensRequest>,
    ) -> Json<SwapTokensResult> {
        match self.swap_tokens_impl(req).await {
            Ok(response) => Json(SwapTokensResult::Success(response)),
            Err(e) => {
                tracing::error!("Failed to swap: {e}");
                Json(SwapTokensResult::Error { error: e })
            }
        }
    }

    #[instrument(skip(self))]
    #[tool(description = "Estimate the total value locked in a Uniswap V3 pool")]
    pub async fn get_pool_tvl(
        &self,
        Parameters(req): Parameters<PoolRequest>,
    ) -> Json<GetPoolTvlResult> {
        match self.get_pool_tvl_impl(req).await {
            Ok(response) => Json(GetPoolTvlResult::Success(response)),
            Err(e) => {
                tracing::error!("Failed to get pool TVL: {e}");
                Json(GetPoolTvlResult::Error { error: e })
            }
        }
    }

    #[instrument(skip(self))]
    #[tool(description = "Read the current price, tick and liquidity of a Uniswap V3 pool")]
    pub async fn get_pool_state(
        &self,
        Parameters(req): Parameters<PoolRequest>,
    ) -> Json<GetPoolStateResult> {
        match self.get_pool_state_impl(req).await {
            Ok(response) => Json(GetPoolStateResult::Success(response)),
            Err(e) => {
                tracing::error!("Failed to get pool state: {e}");
                Json(GetPoolStateResult::Error { error: e })
            }
        }
    }
}

// Business Logic - Core implementation
impl UniswapTradingService {
    fn resolve_token(&self, input: &str) -> ServiceResult<Address> {
        self.uniswap.resolve(input).map_err(|_| {
            ServiceError::TokenNotFound(format!(
                "{input} is neither a token address nor one of {:?}",
                self.uniswap.tokens().supported_tokens()
            ))
        })
    }

    fn parse_address(input: &str) -> ServiceResult<Address> {
        Ok(parse(input)?)
    }

    async fn token(&self, address: Address) -> ServiceResult<Token> {
        Ok(self.uniswap.get_token(address).await?)
    }

    #[instrument(skip(self), err)]
    async fn get_balance_impl(&self, req: GetBalanceRequest) -> ServiceResult<GetBalanceResponse> {
        let owner = match req.wallet_address.as_deref() {
            Some(wallet) => Self::parse_address(wallet)?,
            None => self
                .uniswap
                .address()
                .or(self.default_wallet)
                .ok_or_else(|| {
                    ServiceError::InvalidArgument("wallet_address is required".to_string())
                })?,
        };
        let token = match req.token.as_deref() {
            Some(token) => self.resolve_token(token)?,
            None => ETH_ADDRESS,
        };

        tracing::info!("Querying {token} balance for address: {owner}");
        let metadata = self.token(token).await?;
        let balance = self.uniswap.get_balance(token, Some(owner)).await?;

        Ok(GetBalanceResponse {
            balance: balance.to_string(),
            formatted_balance: format_balance(balance, metadata.decimals),
            decimals: metadata.decimals,
            symbol: metadata.symbol,
        })
    }

    #[instrument(skip(self), err)]
    async fn get_quote_impl(&self, req: GetQuoteRequest) -> ServiceResult<GetQuoteResponse> {
        let token_in = self.token(self.resolve_token(&req.from_token)?).await?;
        let token_out = self.token(self.resolve_token(&req.to_token)?).await?;

        let (amount_in, amount_out, quote) = match req.side {
            QuoteSide::ExactInput => {
                let amount = parse_amount(&req.amount, token_in.decimals)?;
                let quote = self
                    .uniswap
                    .get_price_input(token_in.address, token_out.address, amount, req.fee, None)
                    .await?;
                (amount, quote.amount, quote)
            }
            QuoteSide::ExactOutput => {
                let amount = parse_amount(&req.amount, token_out.decimals)?;
                let quote = self
                    .uniswap
                    .get_price_output(token_in.address, token_out.address, amount, req.fee, None)
                    .await?;
                (quote.amount, amount, quote)
            }
        };

        let price_impact = if self.uniswap.version() == ProtocolVersion::V1 {
            None
        } else {
            self.price_impact(&token_in, &token_out, amount_in, req.fee).await
        };

        Ok(GetQuoteResponse {
            amount_in: format_balance(amount_in, token_in.decimals),
            amount_out: format_balance(amount_out, token_out.decimals),
            quoted_raw: quote.amount.to_string(),
            route: quote.route.into_iter().map(format).collect(),
            price_impact,
            uniswap_version: self.uniswap.version().to_string(),
        })
    }

    /// Best effort, a quote is still useful without it.
    async fn price_impact(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: U256,
        fee: Option<u32>,
    ) -> Option<String> {
        match self
            .uniswap
            .estimate_price_impact(token_in.address, token_out.address, amount_in, fee, None)
            .await
        {
            Ok(impact) => Some(format_percent(impact)),
            Err(e) => {
                tracing::warn!(
                    "Could not estimate price impact of {token_in} -> {token_out}: {e}"
                );
                None
            }
        }
    }

    #[instrument(skip(self), err)]
    async fn swap_tokens_impl(&self, req: SwapTokensRequest) -> ServiceResult<SwapTokensResponse> {
        let token_in = self.token(self.resolve_token(&req.from_token)?).await?;
        let token_out = self.token(self.resolve_token(&req.to_token)?).await?;
        let fixed_decimals = match req.side {
            QuoteSide::ExactInput => token_in.decimals,
            QuoteSide::ExactOutput => token_out.decimals,
        };
        let amount = parse_amount(&req.amount, fixed_decimals)?;
        let slippage = req
            .slippage_tolerance
            .as_deref()
            .map(parse_slippage_percent)
            .transpose()?;
        let recipient = req.recipient.as_deref().map(Self::parse_address).transpose()?;

        let request = SwapRequest {
            token_in: token_in.address,
            token_out: token_out.address,
            amount,
            recipient,
            fee: req.fee,
            slippage,
            route: None,
            fee_on_transfer: req.fee_on_transfer,
        };
        let hash = match req.side {
            QuoteSide::ExactInput => self.uniswap.make_trade(request).await?,
            QuoteSide::ExactOutput => self.uniswap.make_trade_output(request).await?,
        };

        tracing::info!("Submitted swap {token_in} -> {token_out}: {hash}");
        Ok(SwapTokensResponse {
            transaction_hash: hash.to_string(),
            amount_raw: amount.to_string(),
            from_address: self.uniswap.address().map(format).unwrap_or_default(),
            uniswap_version: self.uniswap.version().to_string(),
        })
    }

    /// Pool named by address, or found from its tokens and fee with ETH as WETH.
    async fn pool_address(&self, req: &PoolRequest) -> ServiceResult<Address> {
        if let Some(pool) = req.pool_address.as_deref() {
            return Self::parse_address(pool);
        }

        let (Some(token_a), Some(token_b)) = (req.token_a.as_deref(), req.token_b.as_deref())
        else {
            return Err(ServiceError::InvalidArgument(
                "pool_address or both token_a and token_b are required".to_string(),
            ));
        };
        let mut tokens = [self.resolve_token(token_a)?, self.resolve_token(token_b)?];
        for token in tokens.iter_mut() {
            if *token == ETH_ADDRESS {
                *token = self.uniswap.get_weth_address().await?;
            }
        }

        Ok(self
            .uniswap
            .get_pool_instance(tokens[0], tokens[1], req.fee)
            .await?)
    }

    #[instrument(skip(self), err)]
    async fn get_pool_tvl_impl(&self, req: PoolRequest) -> ServiceResult<GetPoolTvlResponse> {
        let pool = self.pool_address(&req).await?;
        let immutables = self.uniswap.get_pool_immutables(pool).await?;
        let tvl = self.uniswap.get_tvl_in_pool(pool).await?;

        Ok(GetPoolTvlResponse {
            pool_address: format(pool),
            token0: format(immutables.token0),
            token1: format(immutables.token1),
            token0_locked: tvl.token0,
            token1_locked: tvl.token1,
        })
    }

    #[instrument(skip(self), err)]
    async fn get_pool_state_impl(&self, req: PoolRequest) -> ServiceResult<GetPoolStateResponse> {
        let pool = self.pool_address(&req).await?;
        let immutables = self.uniswap.get_pool_immutables(pool).await?;
        let state = self.uniswap.get_pool_state(pool).await?;

        Ok(GetPoolStateResponse {
            pool_address: format(pool),
            token0: format(immutables.token0),
            token1: format(immutables.token1),
            fee: immutables.fee,
            tick_spacing: immutables.tick_spacing,
            liquidity: state.liquidity.to_string(),
            sqrt_price_x96: state.sqrt_price_x96.to_string(),
            tick: state.tick,
            price: sqrt_price_to_price(state.sqrt_price_x96),
            unlocked: state.unlocked,
        })
    }
}

#[tool_handler]
impl ServerHandler for UniswapTradingService {}
