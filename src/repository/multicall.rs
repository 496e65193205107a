//! Batched read calls through a Multicall2 aggregator contract.

use alloy::primitives::{Address, Bytes};
use alloy::sol_types::SolCall;
use tracing::instrument;

use super::contract::IMulticall2;
use super::{ContractGateway, RepoResult, RepositoryError, read_contract};

/// A single call in a multicall batch.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Call {
    /// The contract to call.
    pub target: Address,
    /// Selector followed by the ABI-encoded arguments.
    pub data: Bytes,
}

impl Call {
    pub fn new<C: SolCall>(target: Address, call: &C) -> Self {
        Self {
            target,
            data: Bytes::from(call.abi_encode()),
        }
    }
}

/// Executes `calls` in one `aggregate` request and returns the raw return data
/// of every call, in order.
///
/// `aggregate` reverts as a whole when any inner call fails, so a single bad
/// call fails the batch.
#[instrument(skip(gateway, calls), fields(batch = calls.len()), err)]
pub async fn aggregate(
    gateway: &dyn ContractGateway,
    multicall: Address,
    calls: Vec<Call>,
) -> RepoResult<Vec<Bytes>> {
    if calls.is_empty() {
        return Ok(Vec::new());
    }
    let expected = calls.len();

    let request = IMulticall2::aggregateCall {
        calls: calls
            .into_iter()
            .map(|call| IMulticall2::Call {
                target: call.target,
                callData: call.data,
            })
            .collect(),
    };

    let result = read_contract(gateway, multicall, request).await?;
    if result.returnData.len() != expected {
        return Err(RepositoryError::ParseError(format!(
            "Multicall returned {} results for {expected} calls",
            result.returnData.len()
        )));
    }

    Ok(result.returnData)
}

/// Like [`aggregate`] but decodes every result as the return type of `C`.
pub async fn aggregate_decoded<C: SolCall + Send + Sync>(
    gateway: &dyn ContractGateway,
    multicall: Address,
    target: Address,
    calls: &[C],
) -> RepoResult<Vec<C::Return>> {
    let batch = calls.iter().map(|call| Call::new(target, call)).collect();

    aggregate(gateway, multicall, batch)
        .await?
        .iter()
        .map(|data| {
            C::abi_decode_returns(data).map_err(|e| {
                RepositoryError::ParseError(format!("Failed to decode {}: {e}", C::SIGNATURE))
            })
        })
        .collect()
}
