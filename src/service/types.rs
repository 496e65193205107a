use rmcp::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::service::ServiceError;

// Response types that include error handling
#[derive(Debug, JsonSchema, Serialize)]
#[serde(untagged)]
pub enum GetBalanceResult {
    Success(GetBalanceResponse),
    Error { error: ServiceError },
}

#[derive(Debug, JsonSchema, Serialize)]
#[serde(untagged)]
pub enum GetQuoteResult {
    Success(GetQuoteResponse),
    Error { error: ServiceError },
}

#[derive(Debug, JsonSchema, Serialize)]
#[serde(untagged)]
pub enum SwapTokensResult {
    Success(SwapTokensResponse),
    Error { error: ServiceError },
}

#[derive(Debug, JsonSchema, Serialize)]
#[serde(untagged)]
pub enum GetPoolTvlResult {
    Success(GetPoolTvlResponse),
    Error { error: ServiceError },
}

#[derive(Debug, JsonSchema, Serialize)]
#[serde(untagged)]
pub enum GetPoolStateResult {
    Success(GetPoolStateResponse),
    Error { error: ServiceError },
}

#[derive(Debug, JsonSchema, Serialize, Deserialize)]
pub struct GetBalanceRequest {
    /// Wallet address to query. Defaults to the configured wallet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    /// Token symbol (e.g., "USDC") or contract address. If not provided, returns ETH balance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, JsonSchema, Serialize)]
pub struct GetBalanceResponse {
    /// Raw balance value
    pub balance: String,
    /// Balance formatted with proper decimals
    pub formatted_balance: String,
    /// Token decimals
    pub decimals: u8,
    /// Token symbol (ETH or token symbol)
    pub symbol: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, JsonSchema, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSide {
    /// `amount` is what is sold
    #[default]
    ExactInput,
    /// `amount` is what is bought
    ExactOutput,
}

#[derive(Debug, JsonSchema, Serialize, Deserialize)]
pub struct GetQuoteRequest {
    /// Token sold, symbol or address ("ETH" for the native coin)
    pub from_token: String,
    /// Token bought, symbol or address
    pub to_token: String,
    /// Amount in human-readable units of the fixed side (e.g., "1.5")
    pub amount: String,
    /// Which side `amount` fixes, defaults to exact_input
    #[serde(default)]
    pub side: QuoteSide,
    /// Pool fee in hundredths of a bip (100, 500, 3000, 10000). Required on V3
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<u32>,
}

#[derive(Debug, JsonSchema, Serialize)]
pub struct GetQuoteResponse {
    /// Amount sold, formatted
    pub amount_in: String,
    /// Amount bought, formatted
    pub amount_out: String,
    /// Raw quoted amount on the side that was not fixed
    pub quoted_raw: String,
    /// Token addresses the trade passes through
    pub route: Vec<String>,
    /// Estimated price impact in percent, when the pool allows estimating it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_impact: Option<String>,
    /// Uniswap version that produced the quote
    pub uniswap_version: String,
}

#[derive(Debug, JsonSchema, Serialize, Deserialize)]
pub struct SwapTokensRequest {
    /// Source token symbol or address (e.g., "ETH", "WETH", or "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2")
    pub from_token: String,

    /// Destination token symbol or address (e.g., "USDC", "DAI", or "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")
    pub to_token: String,

    /// Amount in human-readable format (e.g., "1" for 1 ETH, "100.5" for 100.5 USDC).
    /// Sold amount for exact_input, bought amount for exact_output
    pub amount: String,

    /// Which side `amount` fixes, defaults to exact_input
    #[serde(default)]
    pub side: QuoteSide,

    /// Optional slippage tolerance in percent (e.g., "0.5" for 0.5%). Defaults to the configured tolerance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage_tolerance: Option<String>,

    /// Pool fee in hundredths of a bip. Required on V3
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<u32>,

    /// Optional recipient of the bought tokens, defaults to the wallet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,

    /// Use the V2 router functions for tokens taking a fee on transfer
    #[serde(default)]
    pub fee_on_transfer: bool,
}

#[derive(Debug, JsonSchema, Serialize)]
pub struct SwapTokensResponse {
    /// Hash of the submitted transaction, not yet mined
    pub transaction_hash: String,
    /// Fixed amount of the trade, raw
    pub amount_raw: String,
    /// Address that sent the transaction
    pub from_address: String,
    /// Uniswap version that executes the trade
    pub uniswap_version: String,
}

#[derive(Debug, JsonSchema, Serialize, Deserialize)]
pub struct PoolRequest {
    /// Pool address. When absent the pool is looked up from the tokens and fee
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_address: Option<String>,
    /// First token, symbol or address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_a: Option<String>,
    /// Second token, symbol or address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_b: Option<String>,
    /// Pool fee in hundredths of a bip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<u32>,
}

#[derive(Debug, JsonSchema, Serialize)]
pub struct GetPoolTvlResponse {
    pub pool_address: String,
    pub token0: String,
    pub token1: String,
    /// Whole token0 locked in the pool
    pub token0_locked: f64,
    /// Whole token1 locked in the pool
    pub token1_locked: f64,
}

#[derive(Debug, JsonSchema, Serialize)]
pub struct GetPoolStateResponse {
    pub pool_address: String,
    pub token0: String,
    pub token1: String,
    pub fee: u32,
    pub tick_spacing: i32,
    /// In-range liquidity
    pub liquidity: String,
    pub sqrt_price_x96: String,
    pub tick: i32,
    /// token1 per token0 in raw units
    pub price: f64,
    pub unlocked: bool,
}
