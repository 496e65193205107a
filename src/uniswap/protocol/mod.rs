//! Version-specific pricing and swap call construction.
//!
//! One [`Protocol`] implementation exists per Uniswap generation. A client picks
//! its implementation once at construction and every quote and trade goes
//! through it.

pub mod v1;
pub mod v2;
pub mod v3;

use std::fmt;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::fee::FeeTier;
use super::token_registry::ETH_ADDRESS;
use super::version::ProtocolVersion;
use super::{UniswapError, UniswapResult};
use crate::repository::contract::IERC20;
use crate::repository::{ContractGateway, read_contract};

pub use v1::V1Protocol;
pub use v2::V2Protocol;
pub use v3::V3Protocol;

/// Which side of a trade the caller fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeDirection {
    /// The input amount is fixed, the output is quoted.
    ExactInput,
    /// The output amount is fixed, the required input is quoted.
    ExactOutput,
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExactInput => write!(f, "exact input"),
            Self::ExactOutput => write!(f, "exact output"),
        }
    }
}

/// Whether the native coin sits on either side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    EthToToken,
    TokenToEth,
    TokenToToken,
}

impl Topology {
    pub fn of(token_in: Address, token_out: Address) -> UniswapResult<Self> {
        match (token_in == ETH_ADDRESS, token_out == ETH_ADDRESS) {
            (true, true) => Err(UniswapError::InvalidArgument(
                "Cannot trade ETH for ETH".to_string(),
            )),
            (true, false) => Ok(Self::EthToToken),
            (false, true) => Ok(Self::TokenToEth),
            (false, false) => Ok(Self::TokenToToken),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub token_in: Address,
    pub token_out: Address,
    /// Input amount for [`TradeDirection::ExactInput`], output amount otherwise.
    pub amount: U256,
    pub direction: TradeDirection,
    pub fee: FeeTier,
    /// Explicit hop path, derived from the tokens when absent.
    pub route: Option<Vec<Address>>,
}

/// Result of a quote, in the smallest unit of the quoted token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Output for an exact input, required input for an exact output.
    pub amount: U256,
    pub direction: TradeDirection,
    /// Tokens the trade passes through, first is the input and last the output.
    pub route: Vec<Address>,
}

/// Everything needed to encode one swap call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapPlan {
    pub token_in: Address,
    pub token_out: Address,
    pub direction: TradeDirection,
    /// The fixed side of the trade.
    pub amount: U256,
    /// Minimum output for an exact input, maximum input for an exact output.
    pub limit: U256,
    pub fee: FeeTier,
    pub route: Vec<Address>,
    pub sender: Address,
    pub recipient: Option<Address>,
    pub deadline: U256,
    pub fee_on_transfer: bool,
}

impl SwapPlan {
    /// Where the output goes, the sender unless a recipient was given.
    pub fn beneficiary(&self) -> Address {
        self.recipient.unwrap_or(self.sender)
    }
}

/// An encoded contract call ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
}

impl ContractCall {
    pub fn new<C: SolCall>(to: Address, call: &C) -> Self {
        Self::payable(to, call, U256::ZERO)
    }

    pub fn payable<C: SolCall>(to: Address, call: &C, value: U256) -> Self {
        Self {
            to,
            data: Bytes::from(call.abi_encode()),
            value,
        }
    }
}

/// Pricing and swap encoding of one protocol generation.
#[async_trait]
pub trait Protocol: Send + Sync {
    fn version(&self) -> ProtocolVersion;

    /// Address of the wrapped native token the router trades in place of ETH.
    async fn weth_address(&self) -> UniswapResult<Address>;

    /// Quotes a trade against current on-chain state.
    async fn quote(&self, request: &QuoteRequest) -> UniswapResult<Quote>;

    /// Contract that pulls `token` from the trader and therefore needs an allowance.
    async fn spender(&self, token: Address) -> UniswapResult<Address>;

    /// Encodes the swap described by `plan`.
    async fn build_swap(&self, plan: &SwapPlan) -> UniswapResult<ContractCall>;
}

/// Native or ERC20 balance of `owner`.
pub async fn balance_of(
    gateway: &dyn ContractGateway,
    token: Address,
    owner: Address,
) -> UniswapResult<U256> {
    if token == ETH_ADDRESS {
        return Ok(gateway.get_balance(owner).await?);
    }
    Ok(read_contract(gateway, token, IERC20::balanceOfCall { account: owner }).await?)
}

fn overflow(quantity: &str) -> UniswapError {
    UniswapError::InvalidArgument(format!("Arithmetic overflow computing {quantity}"))
}

/// Output of a 0.3% fee constant-product pool paying `reserve_out` for `amount_in`.
///
/// `amount_in * 997 * reserve_out / (reserve_in * 1000 + amount_in * 997)`
pub fn constant_product_output(
    amount_in: U256,
    reserve_in: U256,
    reserve_out: U256,
) -> UniswapResult<U256> {
    let amount_in_with_fee = amount_in
        .checked_mul(U256::from(997))
        .ok_or_else(|| overflow("input with fee"))?;
    let numerator = amount_in_with_fee
        .checked_mul(reserve_out)
        .ok_or_else(|| overflow("output numerator"))?;
    let denominator = reserve_in
        .checked_mul(U256::from(1000))
        .and_then(|d| d.checked_add(amount_in_with_fee))
        .ok_or_else(|| overflow("output denominator"))?;

    if denominator.is_zero() {
        return Err(UniswapError::InvalidArgument(
            "Pool has no liquidity".to_string(),
        ));
    }
    Ok(numerator / denominator)
}

/// Input a 0.3% fee constant-product pool needs to pay out `amount_out`.
///
/// Fails with `InsufficientBalance` when the pool holds no more than `amount_out`.
pub fn constant_product_input(
    amount_out: U256,
    reserve_in: U256,
    reserve_out: U256,
) -> UniswapResult<U256> {
    if reserve_out <= amount_out {
        return Err(UniswapError::insufficient_balance(reserve_out, amount_out));
    }

    let numerator = amount_out
        .checked_mul(reserve_in)
        .and_then(|n| n.checked_mul(U256::from(1000)))
        .ok_or_else(|| overflow("input numerator"))?;
    let denominator = (reserve_out - amount_out)
        .checked_mul(U256::from(997))
        .ok_or_else(|| overflow("input denominator"))?;

    Ok(numerator / denominator + U256::from(1))
}

/// Checks that a caller supplied route starts at `token_in`, ends at
/// `token_out` and never repeats a token in consecutive hops.
pub(crate) fn validate_route(
    route: &[Address],
    token_in: Address,
    token_out: Address,
) -> UniswapResult<()> {
    if route.len() < 2 {
        return Err(UniswapError::InvalidArgument(format!(
            "Route needs at least two tokens, got {}",
            route.len()
        )));
    }
    if route.first() != Some(&token_in) || route.last() != Some(&token_out) {
        return Err(UniswapError::InvalidArgument(format!(
            "Route must start at {token_in} and end at {token_out}"
        )));
    }
    if route.windows(2).any(|hop| hop[0] == hop[1]) {
        return Err(UniswapError::InvalidArgument(
            "Route repeats a token in consecutive hops".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAI: Address = Address::repeat_byte(0xda);
    const USDC: Address = Address::repeat_byte(0xc0);

    #[test]
    fn test_topology_of_pairs() {
        assert_eq!(Topology::of(ETH_ADDRESS, DAI).unwrap(), Topology::EthToToken);
        assert_eq!(Topology::of(DAI, ETH_ADDRESS).unwrap(), Topology::TokenToEth);
        assert_eq!(Topology::of(DAI, USDC).unwrap(), Topology::TokenToToken);
        assert!(Topology::of(ETH_ADDRESS, ETH_ADDRESS).is_err());
    }

    #[test]
    fn test_constant_product_matches_pair_formula() {
        let reserve_dai = U256::from(1_000_000u64) * U256::from(10).pow(U256::from(18));
        let reserve_weth = U256::from(500u64) * U256::from(10).pow(U256::from(18));
        let one_dai = U256::from(10).pow(U256::from(18));

        let out = constant_product_output(one_dai, reserve_dai, reserve_weth).unwrap();
        assert_eq!(out, U256::from(498_499_502_995_995u64));

        // the output is floored, so buying it back may cost a little less
        let cost = constant_product_input(out, reserve_dai, reserve_weth).unwrap();
        let diff = if cost > one_dai { cost - one_dai } else { one_dai - cost };
        assert!(diff < U256::from(10).pow(U256::from(12)));
    }

    #[test]
    fn test_constant_product_input_beyond_reserve() {
        let err = constant_product_input(U256::from(100), U256::from(1000), U256::from(100))
            .unwrap_err();
        assert!(matches!(
            err,
            UniswapError::InsufficientBalance { have, need }
                if have == U256::from(100) && need == U256::from(100)
        ));
    }

    #[test]
    fn test_constant_product_output_empty_pool() {
        assert!(constant_product_output(U256::ZERO, U256::ZERO, U256::from(5)).is_err());
        assert!(constant_product_output(U256::MAX, U256::from(1), U256::from(1)).is_err());
    }

    #[test]
    fn test_validate_route() {
        let weth = Address::repeat_byte(0xee);

        assert!(validate_route(&[DAI, weth, USDC], DAI, USDC).is_ok());
        assert!(validate_route(&[DAI, USDC], DAI, USDC).is_ok());
        assert!(validate_route(&[DAI], DAI, DAI).is_err());
        assert!(validate_route(&[USDC, weth, DAI], DAI, USDC).is_err());
        assert!(validate_route(&[DAI, DAI, USDC], DAI, USDC).is_err());
    }

    #[test]
    fn test_beneficiary_defaults_to_sender() {
        let sender = Address::repeat_byte(1);
        let mut plan = SwapPlan {
            token_in: DAI,
            token_out: USDC,
            direction: TradeDirection::ExactInput,
            amount: U256::from(1),
            limit: U256::ZERO,
            fee: FeeTier::Tier3000,
            route: vec![DAI, USDC],
            sender,
            recipient: None,
            deadline: U256::ZERO,
            fee_on_transfer: false,
        };
        assert_eq!(plan.beneficiary(), sender);

        plan.recipient = Some(Address::repeat_byte(2));
        assert_eq!(plan.beneficiary(), Address::repeat_byte(2));
    }
}
