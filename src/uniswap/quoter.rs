//! Input and output quotes on the client's protocol version.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use tracing::instrument;

use super::fee::validate_fee_tier;
use super::protocol::{Protocol, Quote, QuoteRequest, TradeDirection};
use super::{UniswapError, UniswapResult};

/// Stateless quoting front end, every quote re-reads on-chain state.
pub struct PriceQuoter {
    protocol: Arc<dyn Protocol>,
}

impl PriceQuoter {
    pub fn new(protocol: Arc<dyn Protocol>) -> Self {
        Self { protocol }
    }

    /// Output of `token_out` received for `amount_in` of `token_in`.
    #[instrument(skip(self), err)]
    pub async fn quote_given_input(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        fee: Option<u32>,
        route: Option<Vec<Address>>,
    ) -> UniswapResult<Quote> {
        self.quote(token_in, token_out, amount_in, TradeDirection::ExactInput, fee, route)
            .await
    }

    /// Input of `token_in` needed to receive `amount_out` of `token_out`.
    #[instrument(skip(self), err)]
    pub async fn quote_given_output(
        &self,
        token_in: Address,
        token_out: Address,
        amount_out: U256,
        fee: Option<u32>,
        route: Option<Vec<Address>>,
    ) -> UniswapResult<Quote> {
        self.quote(token_in, token_out, amount_out, TradeDirection::ExactOutput, fee, route)
            .await
    }

    pub async fn quote(
        &self,
        token_in: Address,
        token_out: Address,
        amount: U256,
        direction: TradeDirection,
        fee: Option<u32>,
        route: Option<Vec<Address>>,
    ) -> UniswapResult<Quote> {
        let fee = validate_fee_tier(fee, self.protocol.version())?;
        if token_in == token_out {
            return Err(UniswapError::InvalidArgument(format!(
                "Cannot quote {token_in} against itself"
            )));
        }

        let request = QuoteRequest {
            token_in,
            token_out,
            amount,
            direction,
            fee,
            route,
        };
        self.protocol.quote(&request).await
    }
}
