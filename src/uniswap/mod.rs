//! Quoting, trading and liquidity reads against Uniswap v1 to v4 deployments.

pub mod address;
pub mod approval;
pub mod cache;
pub mod client;
pub mod constants;
pub mod error;
pub mod fee;
pub mod liquidity;
pub mod positions;
pub mod price;
pub mod protocol;
pub mod quoter;
pub mod tick_math;
pub mod token_registry;
pub mod trade;
pub mod tx_builder;
pub mod v4;
pub mod version;

use alloy::primitives::U256;

pub use client::{Token, Uniswap, UniswapSettings};
pub use error::UniswapError;
pub use fee::FeeTier;
pub use protocol::{Quote, TradeDirection};
pub use token_registry::{ETH_ADDRESS, TokenRegistry};
pub use version::ProtocolVersion;

pub type UniswapResult<T> = std::result::Result<T, UniswapError>;

/// Seconds a submitted swap or liquidity call stays valid.
pub const DEADLINE_SECS: i64 = 600;

/// Deadline for a call submitted now, the same ten minutes the Uniswap interface uses.
pub fn deadline() -> U256 {
    U256::from(chrono::Utc::now().timestamp() + DEADLINE_SECS)
}
