pub mod app;
pub mod config;
pub mod middleware;
pub mod repository;
pub mod service;
pub mod uniswap;

pub use app::build_app;

// Re-export commonly used types for tests
pub use service::{
    GetBalanceRequest, GetBalanceResponse, GetQuoteRequest, GetQuoteResponse, PoolRequest,
    SwapTokensRequest, SwapTokensResponse, UniswapTradingService,
};
pub use uniswap::{ProtocolVersion, Uniswap, UniswapError, UniswapSettings};
