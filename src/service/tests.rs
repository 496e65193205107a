use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256, address};
use alloy::sol_types::{SolCall, SolValue};
use rmcp::handler::server::wrapper::Parameters;
use tokio::time::{Duration, sleep};

use crate::config::Config;
use crate::repository::MockContractGateway;
use crate::repository::contract::IERC20;
use crate::service::error::ServiceError;
use crate::service::trading::UniswapTradingService;
use crate::service::types::{
    GetBalanceRequest, GetBalanceResult, GetPoolStateResult, GetQuoteRequest, GetQuoteResult,
    PoolRequest, QuoteSide, SwapTokensRequest, SwapTokensResult,
};
use crate::uniswap::constants::MAINNET;
use crate::uniswap::protocol::v2::tests::{DAI, FACTORY, router_call};
use crate::uniswap::{ProtocolVersion, Uniswap, UniswapSettings};

// Vitalik Buterin's address
const WALLET_ADDRESS: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

fn service(gateway: MockContractGateway, version: ProtocolVersion) -> UniswapTradingService {
    let settings = UniswapSettings {
        version,
        ..Default::default()
    };
    let uniswap = Uniswap::new(Arc::new(gateway), MAINNET, None, settings).unwrap();
    UniswapTradingService::new(Arc::new(uniswap), None)
}

/// DAI metadata, V2 router quotes and no V2 pairs.
fn dai_gateway() -> MockContractGateway {
    let mut gateway = MockContractGateway::new();
    gateway.expect_call().returning(|to, data| {
        if to == DAI {
            let encoded = if data[..4] == IERC20::nameCall::SELECTOR {
                "Dai Stablecoin".to_string().abi_encode()
            } else if data[..4] == IERC20::symbolCall::SELECTOR {
                "DAI".to_string().abi_encode()
            } else if data[..4] == IERC20::decimalsCall::SELECTOR {
                U256::from(18).abi_encode()
            } else {
                U256::from(2_500_000_000_000_000_000u64).abi_encode()
            };
            return Ok(Bytes::from(encoded));
        }
        if to == FACTORY {
            return Ok(Bytes::from(Address::ZERO.abi_encode()));
        }
        Ok(router_call(&to, &data).unwrap())
    });
    gateway
}

#[tokio::test]
async fn test_get_balance_formats_eth() {
    let mut gateway = MockContractGateway::new();
    gateway
        .expect_get_balance()
        .withf(|owner| *owner == address!("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"))
        .times(1)
        .returning(|_| Ok(U256::from(1_500_000_000_000_000_000u64)));
    let service = service(gateway, ProtocolVersion::V2);

    let params = Parameters(GetBalanceRequest {
        wallet_address: Some(WALLET_ADDRESS.to_string()),
        token: None,
    });
    match service.get_balance(params).await.0 {
        GetBalanceResult::Success(resp) => {
            assert_eq!(resp.formatted_balance, "1.5");
            assert_eq!(resp.symbol, "ETH");
            assert_eq!(resp.decimals, 18);
        }
        GetBalanceResult::Error { error } => panic!("Expected success but got error: {error}"),
    }
}

#[tokio::test]
async fn test_get_balance_resolves_token_symbol() {
    let service = service(dai_gateway(), ProtocolVersion::V2);

    let params = Parameters(GetBalanceRequest {
        wallet_address: Some(WALLET_ADDRESS.to_string()),
        token: Some("dai".to_string()),
    });
    match service.get_balance(params).await.0 {
        GetBalanceResult::Success(resp) => {
            assert_eq!(resp.symbol, "DAI");
            assert_eq!(resp.formatted_balance, "2.5");
        }
        GetBalanceResult::Error { error } => panic!("Expected success but got error: {error}"),
    }
}

#[tokio::test]
async fn test_get_balance_without_wallet_is_an_error() {
    let mut gateway = MockContractGateway::new();
    gateway.expect_get_balance().never();
    let service = service(gateway, ProtocolVersion::V2);

    let params = Parameters(GetBalanceRequest {
        wallet_address: None,
        token: None,
    });
    let result = service.get_balance(params).await.0;
    assert!(matches!(
        result,
        GetBalanceResult::Error {
            error: ServiceError::InvalidArgument(_)
        }
    ));
}

#[tokio::test]
async fn test_get_balance_with_invalid_address_should_return_error() {
    let service = service(MockContractGateway::new(), ProtocolVersion::V2);

    let params = Parameters(GetBalanceRequest {
        wallet_address: Some("invalid_address".to_string()),
        token: None,
    });
    let result = service.get_balance(params).await.0;
    assert!(matches!(
        result,
        GetBalanceResult::Error {
            error: ServiceError::InvalidAddress(_)
        }
    ));
}

#[tokio::test]
async fn test_get_quote_converts_human_amounts() {
    let service = service(dai_gateway(), ProtocolVersion::V2);

    let params = Parameters(GetQuoteRequest {
        from_token: "DAI".to_string(),
        to_token: "ETH".to_string(),
        amount: "1".to_string(),
        side: QuoteSide::ExactInput,
        fee: None,
    });
    match service.get_quote(params).await.0 {
        GetQuoteResult::Success(resp) => {
            assert_eq!(resp.amount_in, "1");
            assert_eq!(resp.quoted_raw, "498499502995995");
            assert_eq!(resp.amount_out, "0.000498499502995995");
            assert_eq!(resp.route.len(), 2);
            assert_eq!(resp.uniswap_version, "V2");
            // no pair to read a spot price from
            assert_eq!(resp.price_impact.as_deref(), Some("100.0000"));
        }
        GetQuoteResult::Error { error } => panic!("Expected success but got error: {error}"),
    }
}

#[tokio::test]
async fn test_get_quote_with_unknown_symbol() {
    let service = service(MockContractGateway::new(), ProtocolVersion::V2);

    let params = Parameters(GetQuoteRequest {
        from_token: "NOPE".to_string(),
        to_token: "ETH".to_string(),
        amount: "1".to_string(),
        side: QuoteSide::ExactInput,
        fee: None,
    });
    let result = service.get_quote(params).await.0;
    assert!(matches!(
        result,
        GetQuoteResult::Error {
            error: ServiceError::TokenNotFound(_)
        }
    ));
}

#[tokio::test]
async fn test_swap_without_wallet_is_refused() {
    let mut gateway = dai_gateway();
    gateway.expect_send_raw_transaction().never();
    let service = service(gateway, ProtocolVersion::V2);

    let params = Parameters(SwapTokensRequest {
        from_token: "ETH".to_string(),
        to_token: "DAI".to_string(),
        amount: "0.1".to_string(),
        side: QuoteSide::ExactInput,
        slippage_tolerance: Some("0.5".to_string()),
        fee: None,
        recipient: None,
        fee_on_transfer: false,
    });
    let result = service.swap_tokens(params).await.0;
    assert!(matches!(
        result,
        SwapTokensResult::Error {
            error: ServiceError::WalletNotConfigured(_)
        }
    ));
}

#[tokio::test]
async fn test_pool_state_requires_v3() {
    let service = service(MockContractGateway::new(), ProtocolVersion::V2);

    let params = Parameters(PoolRequest {
        pool_address: Some("0x88e6A0c2dDD26FEEb64F039a2c41296FcB3f5640".to_string()),
        token_a: None,
        token_b: None,
        fee: None,
    });
    let result = service.get_pool_state(params).await.0;
    assert!(matches!(
        result,
        GetPoolStateResult::Error {
            error: ServiceError::UnsupportedOperation(_)
        }
    ));
}

#[tokio::test]
async fn test_pool_lookup_needs_tokens_or_address() {
    let service = service(MockContractGateway::new(), ProtocolVersion::V3);

    let params = Parameters(PoolRequest {
        pool_address: None,
        token_a: Some("USDC".to_string()),
        token_b: None,
        fee: Some(500),
    });
    let result = service.get_pool_state(params).await.0;
    assert!(matches!(
        result,
        GetPoolStateResult::Error {
            error: ServiceError::InvalidArgument(_)
        }
    ));
}

/// Helper function to build a service against the node of the test configuration
async fn live_service(version: ProtocolVersion) -> UniswapTradingService {
    let config = Config::from_yaml("config/test.yaml").await.unwrap();
    let mut settings = config.uniswap.settings();
    settings.version = version;
    let uniswap = Uniswap::connect(&config.rpc.url, None, settings).await.unwrap();
    UniswapTradingService::new(Arc::new(uniswap), None)
}

/// Add delay between tests to avoid rate limiting
async fn avoid_rate_limit() {
    sleep(Duration::from_millis(500)).await;
}

#[tokio::test]
#[serial_test::serial]
#[ignore]
async fn test_get_balance_with_erc20_token_should_work() {
    avoid_rate_limit().await;
    let service = live_service(ProtocolVersion::V2).await;
    let params = Parameters(GetBalanceRequest {
        wallet_address: Some(WALLET_ADDRESS.to_string()),
        token: Some("USDT".to_string()),
    });

    match service.get_balance(params).await.0 {
        GetBalanceResult::Success(resp) => {
            assert_eq!(resp.symbol, "USDT");
            assert_eq!(resp.decimals, 6);
        }
        GetBalanceResult::Error { error } => panic!("Expected success but got error: {error}"),
    }
}

#[tokio::test]
#[serial_test::serial]
#[ignore]
async fn test_v3_quote_eth_to_usdc_should_work() {
    avoid_rate_limit().await;
    let service = live_service(ProtocolVersion::V3).await;
    let params = Parameters(GetQuoteRequest {
        from_token: "ETH".to_string(),
        to_token: "USDC".to_string(),
        amount: "1".to_string(),
        side: QuoteSide::ExactInput,
        fee: Some(500),
    });

    match service.get_quote(params).await.0 {
        GetQuoteResult::Success(resp) => {
            let usdc: f64 = resp.amount_out.parse().unwrap();
            assert!(usdc > 100.0 && usdc < 100_000.0, "ETH should trade for a sane amount of USDC");
        }
        GetQuoteResult::Error { error } => panic!("Expected success but got error: {error}"),
    }
}

#[tokio::test]
#[serial_test::serial]
#[ignore]
async fn test_v3_pool_state_by_tokens_should_work() {
    avoid_rate_limit().await;
    let service = live_service(ProtocolVersion::V3).await;
    let params = Parameters(PoolRequest {
        pool_address: None,
        token_a: Some("ETH".to_string()),
        token_b: Some("USDC".to_string()),
        fee: Some(500),
    });

    match service.get_pool_state(params).await.0 {
        GetPoolStateResult::Success(resp) => {
            assert_eq!(resp.pool_address, "0x88e6A0c2dDD26FEEb64F039a2c41296FcB3f5640");
            assert_eq!(resp.fee, 500);
            assert_eq!(resp.tick_spacing, 10);
            assert!(resp.unlocked);
        }
        GetPoolStateResult::Error { error } => panic!("Expected success but got error: {error}"),
    }
}
