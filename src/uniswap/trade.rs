//! Exact input and exact output swaps: checks, guard computation and submission.

use std::sync::Arc;

use alloy::primitives::{Address, B256, U256};
use rust_decimal::Decimal;
use tracing::instrument;

use super::approval::ApprovalManager;
use super::fee::{FeeTier, validate_fee_tier};
use super::protocol::{Protocol, Quote, QuoteRequest, SwapPlan, TradeDirection, balance_of};
use super::token_registry::ETH_ADDRESS;
use super::tx_builder::TxBuilder;
use super::{UniswapError, UniswapResult, deadline};
use crate::repository::ContractGateway;

/// A swap as requested by a caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwapRequest {
    pub token_in: Address,
    pub token_out: Address,
    /// Input for an exact input swap, output for an exact output swap.
    pub amount: U256,
    pub recipient: Option<Address>,
    pub fee: Option<u32>,
    /// Tolerated price movement as a fraction, the configured default when absent.
    pub slippage: Option<Decimal>,
    /// Explicit hop path, V2 only.
    pub route: Option<Vec<Address>>,
    /// Use the V2 router variants for tokens taking a fee on transfer.
    pub fee_on_transfer: bool,
}

/// Checks slippage lies in `[0, 1)`.
pub fn validate_slippage(slippage: Decimal) -> UniswapResult<Decimal> {
    if slippage.is_sign_negative() || slippage >= Decimal::ONE {
        return Err(UniswapError::InvalidArgument(format!(
            "Slippage must be at least 0 and below 1, got {slippage}"
        )));
    }
    Ok(slippage)
}

/// `slippage` as an integer fraction `numerator / 10^scale`.
fn slippage_fraction(slippage: Decimal) -> UniswapResult<(U256, U256)> {
    let slippage = validate_slippage(slippage)?;
    let numerator = U256::from(slippage.mantissa().unsigned_abs());
    let denominator = U256::from(10).pow(U256::from(slippage.scale()));
    Ok((numerator, denominator))
}

fn guard_overflow(quoted: U256) -> UniswapError {
    UniswapError::InvalidArgument(format!("Quoted amount {quoted} is too large to guard"))
}

/// Smallest acceptable output, `floor((1 - slippage) * quoted_out)`.
pub fn minimum_output(quoted_out: U256, slippage: Decimal) -> UniswapResult<U256> {
    let (numerator, denominator) = slippage_fraction(slippage)?;
    let scaled = quoted_out
        .checked_mul(denominator - numerator)
        .ok_or_else(|| guard_overflow(quoted_out))?;
    Ok(scaled / denominator)
}

/// Largest acceptable input, `ceil((1 + slippage) * quoted_cost)`.
pub fn maximum_input(quoted_cost: U256, slippage: Decimal) -> UniswapResult<U256> {
    let (numerator, denominator) = slippage_fraction(slippage)?;
    let scaled = quoted_cost
        .checked_mul(denominator + numerator)
        .ok_or_else(|| guard_overflow(quoted_cost))?;
    let max_in = scaled / denominator;
    if (scaled % denominator).is_zero() {
        Ok(max_in)
    } else {
        Ok(max_in + U256::from(1))
    }
}

/// Runs trades for the client's signer on its protocol version.
///
/// Everything before the broadcast is checked locally, so a failed check never
/// costs gas. Submitted swaps are not awaited.
pub struct TradeExecutor {
    gateway: Arc<dyn ContractGateway>,
    protocol: Arc<dyn Protocol>,
    approvals: Arc<ApprovalManager>,
    tx: Arc<TxBuilder>,
    default_slippage: Decimal,
}

impl TradeExecutor {
    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        protocol: Arc<dyn Protocol>,
        approvals: Arc<ApprovalManager>,
        tx: Arc<TxBuilder>,
        default_slippage: Decimal,
    ) -> Self {
        Self {
            gateway,
            protocol,
            approvals,
            tx,
            default_slippage,
        }
    }

    /// Sells exactly `request.amount` of `token_in`.
    #[instrument(skip(self), err)]
    pub async fn swap_exact_input(&self, request: SwapRequest) -> UniswapResult<B256> {
        self.swap(request, TradeDirection::ExactInput).await
    }

    /// Buys exactly `request.amount` of `token_out`.
    #[instrument(skip(self), err)]
    pub async fn swap_exact_output(&self, request: SwapRequest) -> UniswapResult<B256> {
        self.swap(request, TradeDirection::ExactOutput).await
    }

    async fn swap(&self, request: SwapRequest, direction: TradeDirection) -> UniswapResult<B256> {
        if request.token_in == request.token_out {
            return Err(UniswapError::InvalidArgument(format!(
                "Input and output token are both {}",
                request.token_in
            )));
        }
        let fee = validate_fee_tier(request.fee, self.protocol.version())?;
        let slippage = validate_slippage(request.slippage.unwrap_or(self.default_slippage))?;
        let sender = self.tx.address();

        let (quote, limit) = match direction {
            TradeDirection::ExactInput => {
                self.check_balance(request.token_in, sender, request.amount).await?;
                let quote = self.quote(&request, direction, fee).await?;
                let min_out = minimum_output(quote.amount, slippage)?;
                (quote, min_out)
            }
            TradeDirection::ExactOutput => {
                let quote = self.quote(&request, direction, fee).await?;
                let max_in = maximum_input(quote.amount, slippage)?;
                self.check_balance(request.token_in, sender, max_in).await?;
                (quote, max_in)
            }
        };

        tracing::debug!(
            "{direction} swap of {} {} for {}: quoted {}, guard {limit}",
            request.amount,
            request.token_in,
            request.token_out,
            quote.amount
        );
        let plan = SwapPlan {
            token_in: request.token_in,
            token_out: request.token_out,
            direction,
            amount: request.amount,
            limit,
            fee,
            route: quote.route,
            sender,
            recipient: request.recipient,
            deadline: deadline(),
            fee_on_transfer: request.fee_on_transfer,
        };
        // building the call only reads, so a rejected plan leaves no approval behind
        let call = self.protocol.build_swap(&plan).await?;

        if request.token_in != ETH_ADDRESS {
            let spender = self.protocol.spender(request.token_in).await?;
            self.approvals.ensure_approved(request.token_in, spender).await?;
        }

        self.tx.send(call.to, call.data, call.value, None).await
    }

    async fn check_balance(&self, token: Address, owner: Address, need: U256) -> UniswapResult<()> {
        let balance = balance_of(self.gateway.as_ref(), token, owner).await?;
        if balance < need {
            return Err(UniswapError::insufficient_balance(balance, need));
        }
        Ok(())
    }

    async fn quote(
        &self,
        request: &SwapRequest,
        direction: TradeDirection,
        fee: FeeTier,
    ) -> UniswapResult<Quote> {
        self.protocol
            .quote(&QuoteRequest {
                token_in: request.token_in,
                token_out: request.token_out,
                amount: request.amount,
                direction,
                fee,
                route: request.route.clone(),
            })
            .await
    }
}
