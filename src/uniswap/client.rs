//! The client facade: one signer, one network, one protocol version.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use alloy::providers::ProviderBuilder;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use super::address;
use super::approval::ApprovalManager;
use super::cache::LookupCache;
use super::constants::{ContractAddresses, network_name, require};
use super::fee::validate_fee_tier;
use super::liquidity::{LiquidityAggregator, PoolImmutables, PoolState, PoolTvl};
use super::positions::{PositionManager, liquidity_positions};
use super::price::{PriceEstimator, fee_maker, fee_taker};
use super::protocol::v1::V1Protocol;
use super::protocol::v2::V2Protocol;
use super::protocol::v3::V3Protocol;
use super::protocol::{Protocol, Quote, balance_of};
use super::quoter::PriceQuoter;
use super::token_registry::{ETH_ADDRESS, TokenRegistry};
use super::trade::{SwapRequest, TradeExecutor, validate_slippage};
use super::tx_builder::{GasPolicy, TxBuilder};
use super::v4::{V4Slot0, V4StateReader};
use super::version::ProtocolVersion::{V1, V2, V3};
use super::version::{ProtocolVersion, ensure_supported};
use super::{UniswapError, UniswapResult, deadline};
use crate::repository::contract::{IERC20, PoolKey};
use crate::repository::{
    AlloyContractGateway, ContractGateway, TxReceipt, read_contract, wait_for_receipt,
};

/// ERC20 metadata of a token, or the native coin for [`ETH_ADDRESS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Token {
    pub fn ether() -> Self {
        Self {
            address: ETH_ADDRESS,
            name: "Ether".to_string(),
            symbol: "ETH".to_string(),
            decimals: 18,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.symbol, address::format(self.address))
    }
}

/// Reads the name, symbol and decimals of `token`.
///
/// Fails with `InvalidToken` when any of the three calls fails, which is also
/// what happens for addresses without code.
pub async fn load_token(gateway: &dyn ContractGateway, token: Address) -> UniswapResult<Token> {
    if token == ETH_ADDRESS {
        return Ok(Token::ether());
    }

    let invalid = |e: crate::repository::RepositoryError| {
        UniswapError::InvalidToken(format!("{token}: {e}"))
    };
    let name = read_contract(gateway, token, IERC20::nameCall {})
        .await
        .map_err(invalid)?;
    let symbol = read_contract(gateway, token, IERC20::symbolCall {})
        .await
        .map_err(invalid)?;
    let decimals = read_contract(gateway, token, IERC20::decimalsCall {})
        .await
        .map_err(invalid)?;

    Ok(Token {
        address: token,
        name,
        symbol,
        decimals,
    })
}

/// Tunables of a [`Uniswap`] client.
#[derive(Debug, Clone)]
pub struct UniswapSettings {
    pub version: ProtocolVersion,
    /// Used by trades that do not name their own slippage.
    pub default_slippage: Decimal,
    pub gas_policy: GasPolicy,
    /// Longest wait for an approval or liquidity transaction to be mined.
    pub receipt_timeout: Duration,
    /// Pause after a mined approval before the trade that needs it.
    pub settle_delay: Duration,
    pub cache_capacity: u64,
    /// Replace or complete the built-in contract table of the network.
    pub contracts: ContractAddresses,
}

impl Default for UniswapSettings {
    fn default() -> Self {
        Self {
            version: V3,
            default_slippage: Decimal::new(1, 2),
            gas_policy: GasPolicy::default(),
            receipt_timeout: Duration::from_secs(120),
            settle_delay: Duration::from_secs(1),
            cache_capacity: 1024,
            contracts: ContractAddresses::default(),
        }
    }
}

/// State that only exists when the client holds a private key.
struct Wallet {
    tx: Arc<TxBuilder>,
    approvals: Arc<ApprovalManager>,
    trades: TradeExecutor,
}

/// Uniswap client bound to one network and protocol version.
///
/// Built without a private key the client is read-only: quotes, prices, pool
/// reads and balances work, anything that sends a transaction fails with
/// `SignerUnavailable`.
pub struct Uniswap {
    gateway: Arc<dyn ContractGateway>,
    chain_id: u64,
    version: ProtocolVersion,
    contracts: ContractAddresses,
    settings: UniswapSettings,
    registry: TokenRegistry,
    cache: LookupCache,
    protocol: Arc<dyn Protocol>,
    v1: Option<Arc<V1Protocol>>,
    quoter: PriceQuoter,
    prices: PriceEstimator,
    wallet: Option<Wallet>,
}

impl Uniswap {
    /// Connects to the node at `rpc_url` and builds a client for the chain it reports.
    pub async fn connect(
        rpc_url: &str,
        private_key: Option<&str>,
        settings: UniswapSettings,
    ) -> UniswapResult<Self> {
        let url: Url = rpc_url.parse().map_err(|e| {
            UniswapError::InvalidArgument(format!("Invalid RPC URL {rpc_url}: {e}"))
        })?;
        let provider = ProviderBuilder::new().connect_http(url);
        let gateway: Arc<dyn ContractGateway> =
            Arc::new(AlloyContractGateway::new(Arc::new(provider)));

        let chain_id = gateway.get_chain_id().await?;
        Self::new(gateway, chain_id, private_key, settings)
    }

    pub fn new(
        gateway: Arc<dyn ContractGateway>,
        chain_id: u64,
        private_key: Option<&str>,
        settings: UniswapSettings,
    ) -> UniswapResult<Self> {
        // unknown chains are accepted when every address is supplied by the caller
        let network = match network_name(chain_id) {
            Some(name) => name,
            None if settings.contracts != ContractAddresses::default() => "custom network",
            None => {
                return Err(UniswapError::InvalidArgument(format!(
                    "Unknown chain id {chain_id}"
                )));
            }
        };
        let version = settings.version;
        let contracts = ContractAddresses::for_chain(chain_id).merge(&settings.contracts);
        let cache = LookupCache::new(settings.cache_capacity);

        let (protocol, v1): (Arc<dyn Protocol>, _) = match version {
            V1 => {
                let v1 = Arc::new(V1Protocol::new(gateway.clone(), &contracts, cache.clone())?);
                (v1.clone(), Some(v1))
            }
            V2 => (
                Arc::new(V2Protocol::new(gateway.clone(), &contracts, cache.clone())?),
                None,
            ),
            V3 => (
                Arc::new(V3Protocol::new(gateway.clone(), &contracts, cache.clone())?),
                None,
            ),
        };

        let default_slippage = validate_slippage(settings.default_slippage)?;
        let wallet = match private_key {
            Some(key) => {
                let signer: PrivateKeySigner = key.trim().parse().map_err(|e| {
                    UniswapError::InvalidArgument(format!("Invalid private key: {e}"))
                })?;
                let tx = Arc::new(TxBuilder::new(
                    gateway.clone(),
                    signer,
                    chain_id,
                    settings.gas_policy,
                ));
                let approvals = Arc::new(ApprovalManager::new(
                    gateway.clone(),
                    tx.clone(),
                    settings.receipt_timeout,
                    settings.settle_delay,
                ));
                let trades = TradeExecutor::new(
                    gateway.clone(),
                    protocol.clone(),
                    approvals.clone(),
                    tx.clone(),
                    default_slippage,
                );
                tracing::info!(
                    "Trading as {} on {network} with Uniswap {version}",
                    tx.address()
                );
                Some(Wallet {
                    tx,
                    approvals,
                    trades,
                })
            }
            None => {
                tracing::info!(
                    "No private key provided, Uniswap {version} client on {network} is read-only"
                );
                None
            }
        };

        Ok(Self {
            quoter: PriceQuoter::new(protocol.clone()),
            prices: PriceEstimator::new(gateway.clone(), protocol.clone(), contracts, cache.clone()),
            registry: TokenRegistry::for_chain(chain_id),
            gateway,
            chain_id,
            version,
            contracts,
            settings,
            cache,
            protocol,
            v1,
            wallet,
        })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn version(&self) -> ProtocolVersion {
        self.version
    }

    pub fn contracts(&self) -> &ContractAddresses {
        &self.contracts
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.registry
    }

    /// Signer address, `None` for a read-only client.
    pub fn address(&self) -> Option<Address> {
        self.wallet.as_ref().map(|wallet| wallet.tx.address())
    }

    /// Parses an address or looks up a token symbol of this network.
    pub fn resolve(&self, input: &str) -> UniswapResult<Address> {
        address::resolve(input, &self.registry)
    }

    /// Forgets every cached exchange, pool and wrapped-native address.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    fn wallet(&self, operation: &str) -> UniswapResult<&Wallet> {
        self.wallet
            .as_ref()
            .ok_or_else(|| UniswapError::SignerUnavailable(operation.to_string()))
    }

    fn v1(&self, operation: &str) -> UniswapResult<&V1Protocol> {
        ensure_supported(self.version, &[V1], operation)?;
        self.v1
            .as_deref()
            .ok_or_else(|| UniswapError::UnsupportedOperation(operation.to_string()))
    }

    fn liquidity(&self, operation: &str) -> UniswapResult<LiquidityAggregator> {
        ensure_supported(self.version, &[V3], operation)?;
        LiquidityAggregator::new(self.gateway.clone(), &self.contracts, self.cache.clone())
    }

    fn positions(&self, operation: &str) -> UniswapResult<PositionManager> {
        ensure_supported(self.version, &[V3], operation)?;
        let wallet = self.wallet(operation)?;
        PositionManager::new(
            self.gateway.clone(),
            &self.contracts,
            wallet.tx.clone(),
            wallet.approvals.clone(),
            self.settings.receipt_timeout,
        )
    }

    // Tokens and balances

    pub async fn get_token(&self, token: Address) -> UniswapResult<Token> {
        load_token(self.gateway.as_ref(), token).await
    }

    /// Wrapped native token the router trades ETH through.
    pub async fn get_weth_address(&self) -> UniswapResult<Address> {
        ensure_supported(self.version, &[V2, V3], "get_weth_address")?;
        self.protocol.weth_address().await
    }

    /// Balance of `token` (ETH for [`ETH_ADDRESS`]) held by `owner`, the
    /// signer when absent.
    #[instrument(skip(self), err)]
    pub async fn get_balance(&self, token: Address, owner: Option<Address>) -> UniswapResult<U256> {
        let owner = match owner {
            Some(owner) => owner,
            None => self.wallet("get_balance of the signer")?.tx.address(),
        };
        balance_of(self.gateway.as_ref(), token, owner).await
    }

    // Quotes

    /// Amount of `token_out` bought by selling `amount_in` of `token_in`.
    pub async fn get_price_input(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        fee: Option<u32>,
        route: Option<Vec<Address>>,
    ) -> UniswapResult<Quote> {
        self.quoter
            .quote_given_input(token_in, token_out, amount_in, fee, route)
            .await
    }

    /// Amount of `token_in` needed to buy `amount_out` of `token_out`.
    pub async fn get_price_output(
        &self,
        token_in: Address,
        token_out: Address,
        amount_out: U256,
        fee: Option<u32>,
        route: Option<Vec<Address>>,
    ) -> UniswapResult<Quote> {
        self.quoter
            .quote_given_output(token_in, token_out, amount_out, fee, route)
            .await
    }

    // Trades

    /// Sells exactly `request.amount` of the input token, returning the
    /// transaction hash without waiting for it to be mined.
    pub async fn make_trade(&self, request: SwapRequest) -> UniswapResult<B256> {
        self.wallet("make_trade")?
            .trades
            .swap_exact_input(request)
            .await
    }

    /// Buys exactly `request.amount` of the output token.
    pub async fn make_trade_output(&self, request: SwapRequest) -> UniswapResult<B256> {
        self.wallet("make_trade_output")?
            .trades
            .swap_exact_output(request)
            .await
    }

    /// Grants `spender` an allowance on the signer's `token`, unlimited when
    /// `amount` is absent, and waits for it to be mined.
    pub async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: Option<U256>,
    ) -> UniswapResult<TxReceipt> {
        self.wallet("approve")?
            .approvals
            .approve(token, spender, amount)
            .await
    }

    // V1 exchanges

    pub async fn get_ex_eth_balance(&self, token: Address) -> UniswapResult<U256> {
        self.v1("get_ex_eth_balance")?.ex_eth_balance(token).await
    }

    pub async fn get_ex_token_balance(&self, token: Address) -> UniswapResult<U256> {
        self.v1("get_ex_token_balance")?.ex_token_balance(token).await
    }

    /// Tokens per ETH held by the exchange of `token`.
    pub async fn get_exchange_rate(&self, token: Address) -> UniswapResult<f64> {
        self.v1("get_exchange_rate")?.exchange_rate(token).await
    }

    /// Deposits `max_eth` and the matching amount of `token` into its exchange.
    #[instrument(skip(self), err)]
    pub async fn add_liquidity(
        &self,
        token: Address,
        max_eth: U256,
        min_liquidity: Option<U256>,
    ) -> UniswapResult<TxReceipt> {
        let v1 = self.v1("add_liquidity")?;
        let wallet = self.wallet("add_liquidity")?;
        let exchange = v1.exchange_address(token).await?;
        wallet.approvals.ensure_approved(token, exchange).await?;

        let min_liquidity = min_liquidity.unwrap_or(U256::from(1));
        let call = v1
            .add_liquidity_call(token, max_eth, min_liquidity, deadline())
            .await?;
        self.send_and_wait(wallet, call.to, call.data, call.value).await
    }

    /// Burns `amount` liquidity tokens of the exchange of `token`.
    #[instrument(skip(self), err)]
    pub async fn remove_liquidity(&self, token: Address, amount: U256) -> UniswapResult<TxReceipt> {
        let v1 = self.v1("remove_liquidity")?;
        let wallet = self.wallet("remove_liquidity")?;
        let exchange = v1.exchange_address(token).await?;
        wallet.approvals.ensure_approved(token, exchange).await?;

        let call = v1.remove_liquidity_call(token, amount, deadline()).await?;
        self.send_and_wait(wallet, call.to, call.data, call.value).await
    }

    async fn send_and_wait(
        &self,
        wallet: &Wallet,
        to: Address,
        data: alloy::primitives::Bytes,
        value: U256,
    ) -> UniswapResult<TxReceipt> {
        let hash = wallet.tx.send(to, data, value, None).await?;
        let receipt =
            wait_for_receipt(self.gateway.as_ref(), hash, self.settings.receipt_timeout).await?;
        if !receipt.status {
            return Err(UniswapError::TransactionReverted(hash));
        }
        Ok(receipt)
    }

    // V3 pools

    pub async fn get_pool_instance(
        &self,
        token_a: Address,
        token_b: Address,
        fee: Option<u32>,
    ) -> UniswapResult<Address> {
        let fee = validate_fee_tier(fee, self.version)?;
        self.liquidity("get_pool_instance")?
            .get_pool_instance(token_a, token_b, fee)
            .await
    }

    pub async fn get_pool_immutables(&self, pool: Address) -> UniswapResult<PoolImmutables> {
        self.liquidity("get_pool_immutables")?
            .get_pool_immutables(pool)
            .await
    }

    pub async fn get_pool_state(&self, pool: Address) -> UniswapResult<PoolState> {
        self.liquidity("get_pool_state")?.get_pool_state(pool).await
    }

    /// Token amounts locked in `pool`, in whole tokens.
    pub async fn get_tvl_in_pool(&self, pool: Address) -> UniswapResult<PoolTvl> {
        self.liquidity("get_tvl_in_pool")?.get_tvl_in_pool(pool).await
    }

    /// Position token ids held by `owner`, the signer when absent.
    pub async fn get_liquidity_positions(&self, owner: Option<Address>) -> UniswapResult<Vec<U256>> {
        ensure_supported(self.version, &[V3], "get_liquidity_positions")?;
        let owner = match owner {
            Some(owner) => owner,
            None => self.wallet("get_liquidity_positions of the signer")?.tx.address(),
        };
        let manager = require(self.contracts.v3_position_manager, "Uniswap V3 position manager")?;
        liquidity_positions(self.gateway.as_ref(), manager, owner).await
    }

    pub async fn mint_liquidity(
        &self,
        pool: Address,
        amount0: U256,
        amount1: U256,
        tick_lower: i32,
        tick_upper: i32,
        deadline_at: Option<U256>,
    ) -> UniswapResult<TxReceipt> {
        self.positions("mint_liquidity")?
            .mint_liquidity(pool, amount0, amount1, tick_lower, tick_upper, deadline_at)
            .await
    }

    pub async fn close_position(
        &self,
        token_id: U256,
        amount0_min: U256,
        amount1_min: U256,
        deadline_at: Option<U256>,
    ) -> UniswapResult<TxReceipt> {
        self.positions("close_position")?
            .close_position(token_id, amount0_min, amount1_min, deadline_at)
            .await
    }

    // Prices and fees

    /// Spot price of one whole `token_in` in whole `token_out`.
    pub async fn get_raw_price(
        &self,
        token_in: Address,
        token_out: Address,
        fee: Option<u32>,
    ) -> UniswapResult<f64> {
        ensure_supported(self.version, &[V2, V3], "get_raw_price")?;
        let fee = validate_fee_tier(fee, self.version)?;
        self.prices.get_raw_price(token_in, token_out, fee).await
    }

    pub async fn estimate_price_impact(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        fee: Option<u32>,
        route: Option<Vec<Address>>,
    ) -> UniswapResult<f64> {
        ensure_supported(self.version, &[V2, V3], "estimate_price_impact")?;
        let fee = validate_fee_tier(fee, self.version)?;
        self.prices
            .estimate_price_impact(token_in, token_out, amount_in, fee, route)
            .await
    }

    pub fn get_fee_maker(&self) -> UniswapResult<f64> {
        ensure_supported(self.version, &[V1, V2], "get_fee_maker")?;
        Ok(fee_maker())
    }

    pub fn get_fee_taker(&self) -> UniswapResult<f64> {
        ensure_supported(self.version, &[V1, V2], "get_fee_taker")?;
        Ok(fee_taker())
    }

    // V4 reads

    pub async fn get_v4_slot0(&self, key: &PoolKey) -> UniswapResult<V4Slot0> {
        V4StateReader::new(self.gateway.clone(), &self.contracts)?
            .get_slot0(key)
            .await
    }

    pub async fn get_v4_liquidity(&self, key: &PoolKey) -> UniswapResult<u128> {
        V4StateReader::new(self.gateway.clone(), &self.contracts)?
            .get_liquidity(key)
            .await
    }
}
