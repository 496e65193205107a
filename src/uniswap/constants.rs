use alloy::primitives::{Address, address};
use serde::Deserialize;

use super::{UniswapError, UniswapResult};

pub const MAINNET: u64 = 1;
pub const ROPSTEN: u64 = 3;
pub const RINKEBY: u64 = 4;
pub const GOERLI: u64 = 5;
pub const OPTIMISM: u64 = 10;
pub const KOVAN: u64 = 42;
pub const BINANCE: u64 = 56;
pub const BINANCE_TESTNET: u64 = 97;
pub const XDAI: u64 = 100;
pub const POLYGON: u64 = 137;
pub const FANTOM: u64 = 250;
pub const ARBITRUM: u64 = 42161;
pub const ARBITRUM_TESTNET: u64 = 421611;

/// See https://chainid.network/chains/
pub fn network_name(chain_id: u64) -> Option<&'static str> {
    let name = match chain_id {
        MAINNET => "mainnet",
        ROPSTEN => "ropsten",
        RINKEBY => "rinkeby",
        GOERLI => "goerli",
        OPTIMISM => "optimism",
        KOVAN => "kovan",
        BINANCE => "binance",
        BINANCE_TESTNET => "binance_testnet",
        XDAI => "xdai",
        POLYGON => "polygon",
        FANTOM => "fantom",
        ARBITRUM => "arbitrum",
        ARBITRUM_TESTNET => "arbitrum_testnet",
        _ => return None,
    };
    Some(name)
}

const V2_FACTORY: Address = address!("0x5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f");
const V2_ROUTER: Address = address!("0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D");

// v3 periphery is deployed at the same addresses on every supported network
const V3_FACTORY: Address = address!("0x1F98431c8aD98523631AE4a59f267346ea31F984");
const V3_SWAP_ROUTER: Address = address!("0xE592427A0AEce92De3Edee1F18E0157C05861564");
const V3_QUOTER_V2: Address = address!("0x61fFE014bA17989E743c5F6cB21bF9697530B21e");
const V3_POSITION_MANAGER: Address = address!("0xC36442b4a4522E871399CD717aBDD847Ab11FE88");

const MULTICALL2: Address = address!("0x5BA1e12693Dc8F9c48aAD8770482f4739bEeD696");
const MULTICALL2_ARBITRUM: Address = address!("0x50075F151ABC5B6B448b1272A0a1cFb5CFA25828");

const V4_STATE_VIEW: Address = address!("0x7fFE42C4a5DEeA5b0feC41C94C136Cf115597227");

/// Addresses of the contracts the client talks to on one network.
///
/// Built-in per chain, every field can be overridden from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContractAddresses {
    pub v1_factory: Option<Address>,
    pub v2_factory: Option<Address>,
    pub v2_router: Option<Address>,
    pub v3_factory: Option<Address>,
    pub v3_router: Option<Address>,
    pub v3_quoter: Option<Address>,
    pub v3_position_manager: Option<Address>,
    pub v4_state_view: Option<Address>,
    pub multicall: Option<Address>,
}

impl ContractAddresses {
    pub fn for_chain(chain_id: u64) -> Self {
        let v1_factory = match chain_id {
            MAINNET => Some(address!("0xc0a47dFe034B400B47bDaD5FecDa2621de6c4d95")),
            ROPSTEN => Some(address!("0x9c83dCE8CA20E9aAF9D3efc003b2ea62aBC08351")),
            RINKEBY => Some(address!("0xf5D915570BC477f9B8D6C0E980aA81757A3AaC36")),
            KOVAN => Some(address!("0xD3E51Ef092B2845f10401a0159B2B96e8B6c3D30")),
            GOERLI => Some(address!("0x6Ce570d02D73d4c384b46135E87f8C592A8c86dA")),
            _ => None,
        };

        let (v2_factory, v2_router) = match chain_id {
            MAINNET | ROPSTEN | RINKEBY | GOERLI => (Some(V2_FACTORY), Some(V2_ROUTER)),
            XDAI => (
                Some(address!("0xA818b4F111Ccac7AA31D0BCc0806d64F2E0737D7")),
                Some(address!("0x1C232F01118CB8B424793ae03F870aa7D0ac7f77")),
            ),
            BINANCE => (
                Some(address!("0xcA143Ce32Fe78f1f7019d7d551a6402fC5350c73")),
                Some(address!("0x10ED43C718714eb63d5aA57B78B54704E256024E")),
            ),
            BINANCE_TESTNET => (
                Some(address!("0x6725F303b657a9451d8BA641348b6761A6CC7a17")),
                Some(address!("0xD99D1c33F9fC3444f8101754aBC46c52416550D1")),
            ),
            _ => (None, None),
        };

        let has_v3 = matches!(
            chain_id,
            MAINNET | ROPSTEN | RINKEBY | GOERLI | KOVAN | OPTIMISM | POLYGON | ARBITRUM
        );

        let multicall = match chain_id {
            ARBITRUM => Some(MULTICALL2_ARBITRUM),
            MAINNET | ROPSTEN | RINKEBY | GOERLI | KOVAN => Some(MULTICALL2),
            _ => None,
        };

        Self {
            v1_factory,
            v2_factory,
            v2_router,
            v3_factory: has_v3.then_some(V3_FACTORY),
            v3_router: has_v3.then_some(V3_SWAP_ROUTER),
            v3_quoter: has_v3.then_some(V3_QUOTER_V2),
            v3_position_manager: has_v3.then_some(V3_POSITION_MANAGER),
            v4_state_view: (chain_id == MAINNET).then_some(V4_STATE_VIEW),
            multicall,
        }
    }

    /// Returns `self` with every address set in `overrides` replaced.
    pub fn merge(self, overrides: &ContractAddresses) -> Self {
        Self {
            v1_factory: overrides.v1_factory.or(self.v1_factory),
            v2_factory: overrides.v2_factory.or(self.v2_factory),
            v2_router: overrides.v2_router.or(self.v2_router),
            v3_factory: overrides.v3_factory.or(self.v3_factory),
            v3_router: overrides.v3_router.or(self.v3_router),
            v3_quoter: overrides.v3_quoter.or(self.v3_quoter),
            v3_position_manager: overrides.v3_position_manager.or(self.v3_position_manager),
            v4_state_view: overrides.v4_state_view.or(self.v4_state_view),
            multicall: overrides.multicall.or(self.multicall),
        }
    }
}

/// Unwraps an optional table entry, naming the missing contract in the error.
pub(crate) fn require(address: Option<Address>, contract: &str) -> UniswapResult<Address> {
    address.ok_or_else(|| {
        UniswapError::InvalidArgument(format!(
            "No {contract} address known for this network, set it under uniswap.contracts"
        ))
    })
}
