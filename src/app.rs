use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use rmcp::transport::SseServer;
use rmcp::transport::sse_server::SseServerConfig;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::middleware::trace::http_trace_layer;
use crate::service::UniswapTradingService;
use crate::uniswap::Uniswap;
use crate::uniswap::address::parse;

/// Connects to the configured node once and serves every MCP session from
/// the same client, so nonces and lookups are shared between sessions.
pub async fn build_app(
    cancellation_token: CancellationToken,
    config: Config,
) -> anyhow::Result<Router> {
    let addr = config.server_uri().parse()?;

    let uniswap = Uniswap::connect(
        &config.rpc.url,
        config.wallet.private_key(),
        config.uniswap.settings(),
    )
    .await?;
    let uniswap = Arc::new(uniswap);
    let default_wallet = config.wallet.address.as_deref().map(parse).transpose()?;

    let sse_config = SseServerConfig {
        bind: addr,
        sse_path: "/sse".to_string(),
        post_path: "/message".to_string(),
        ct: cancellation_token,
        sse_keep_alive: Some(Duration::from_secs(15)),
    };

    let (sse_server, sse_router) = SseServer::new(sse_config);

    let uniswap_service = move || UniswapTradingService::new(uniswap.clone(), default_wallet);

    sse_server.with_service(uniswap_service);

    let app = Router::new()
        .route("/health", get(|| async move { StatusCode::OK }))
        .nest("/uniswap", sse_router)
        .layer(http_trace_layer());

    Ok(app)
}
