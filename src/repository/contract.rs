use alloy::sol;

// Contract ABIs for the Uniswap v1, v2, v3 and v4 deployments and their helpers
sol! {
    /// ERC20 token standard interface.
    ///
    /// Balance and metadata getters plus the allowance pair used before every trade.
    interface IERC20 {
        /// Returns the token balance of `account` in the token's smallest unit.
        function balanceOf(address account) external view returns (uint256);

        /// Returns the number of decimals used by the token.
        function decimals() external view returns (uint8);

        function symbol() external view returns (string memory);

        function name() external view returns (string memory);

        /// Returns the remaining amount `spender` may transfer on behalf of `owner`.
        function allowance(address owner, address spender) external view returns (uint256);

        /// Sets `amount` as the allowance of `spender` over the caller's tokens.
        function approve(address spender, uint256 amount) external returns (bool);
    }

    /// Uniswap V1 factory, one exchange contract per ERC20 token.
    interface IUniswapV1Factory {
        /// Returns the exchange for `token`, or the zero address when none was created.
        function getExchange(address token) external view returns (address exchange);
    }

    /// Uniswap V1 exchange holding an ETH/token reserve pair.
    ///
    /// The `*Swap*` variants pay out to the caller, the `*Transfer*` variants to `recipient`.
    interface IUniswapV1Exchange {
        function getEthToTokenInputPrice(uint256 eth_sold) external view returns (uint256);
        function getEthToTokenOutputPrice(uint256 tokens_bought) external view returns (uint256);
        function getTokenToEthInputPrice(uint256 tokens_sold) external view returns (uint256);
        function getTokenToEthOutputPrice(uint256 eth_bought) external view returns (uint256);

        function ethToTokenSwapInput(uint256 min_tokens, uint256 deadline) external payable returns (uint256);
        function ethToTokenTransferInput(uint256 min_tokens, uint256 deadline, address recipient) external payable returns (uint256);
        function ethToTokenSwapOutput(uint256 tokens_bought, uint256 deadline) external payable returns (uint256);
        function ethToTokenTransferOutput(uint256 tokens_bought, uint256 deadline, address recipient) external payable returns (uint256);

        function tokenToEthSwapInput(uint256 tokens_sold, uint256 min_eth, uint256 deadline) external returns (uint256);
        function tokenToEthTransferInput(uint256 tokens_sold, uint256 min_eth, uint256 deadline, address recipient) external returns (uint256);
        function tokenToEthSwapOutput(uint256 eth_bought, uint256 max_tokens, uint256 deadline) external returns (uint256);
        function tokenToEthTransferOutput(uint256 eth_bought, uint256 max_tokens, uint256 deadline, address recipient) external returns (uint256);

        function tokenToTokenSwapInput(
            uint256 tokens_sold,
            uint256 min_tokens_bought,
            uint256 min_eth_bought,
            uint256 deadline,
            address token_addr
        ) external returns (uint256);
        function tokenToTokenTransferInput(
            uint256 tokens_sold,
            uint256 min_tokens_bought,
            uint256 min_eth_bought,
            uint256 deadline,
            address recipient,
            address token_addr
        ) external returns (uint256);
        function tokenToTokenSwapOutput(
            uint256 tokens_bought,
            uint256 max_tokens_sold,
            uint256 max_eth_sold,
            uint256 deadline,
            address token_addr
        ) external returns (uint256);
        function tokenToTokenTransferOutput(
            uint256 tokens_bought,
            uint256 max_tokens_sold,
            uint256 max_eth_sold,
            uint256 deadline,
            address recipient,
            address token_addr
        ) external returns (uint256);

        /// Deposits ETH and tokens at the current ratio, minting liquidity tokens.
        function addLiquidity(uint256 min_liquidity, uint256 max_tokens, uint256 deadline) external payable returns (uint256);

        /// Burns liquidity tokens and withdraws ETH and tokens at the current ratio.
        function removeLiquidity(uint256 amount, uint256 min_eth, uint256 min_tokens, uint256 deadline)
            external
            returns (uint256 eth_amount, uint256 token_amount);
    }

    /// Uniswap V2 Pair interface for liquidity pool interactions.
    interface IUniswapV2Pair {
        /// Returns the reserves of both tokens in the pair and the last block timestamp.
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);

        function token0() external view returns (address);

        function token1() external view returns (address);
    }

    /// Uniswap V2 Factory interface for pair discovery.
    interface IUniswapV2Factory {
        /// Returns the pair address for two tokens, or zero address if no pair exists.
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }

    /// Uniswap V2 Router02 interface for path quotes and swaps.
    interface IUniswapV2Router02 {
        /// Given an input amount and a path, returns the amounts produced at every hop.
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);

        /// Given an output amount and a path, returns the amounts required at every hop.
        function getAmountsIn(uint256 amountOut, address[] calldata path) external view returns (uint256[] memory amounts);

        function swapExactETHForTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline)
            external
            payable
            returns (uint256[] memory amounts);

        function swapExactTokensForETH(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline)
            external
            returns (uint256[] memory amounts);

        function swapExactTokensForTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline)
            external
            returns (uint256[] memory amounts);

        function swapETHForExactTokens(uint256 amountOut, address[] calldata path, address to, uint256 deadline)
            external
            payable
            returns (uint256[] memory amounts);

        function swapTokensForExactETH(uint256 amountOut, uint256 amountInMax, address[] calldata path, address to, uint256 deadline)
            external
            returns (uint256[] memory amounts);

        function swapTokensForExactTokens(uint256 amountOut, uint256 amountInMax, address[] calldata path, address to, uint256 deadline)
            external
            returns (uint256[] memory amounts);

        function swapExactETHForTokensSupportingFeeOnTransferTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline)
            external
            payable;

        function swapExactTokensForETHSupportingFeeOnTransferTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline)
            external;

        function swapExactTokensForTokensSupportingFeeOnTransferTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline)
            external;

        /// Returns the factory address.
        function factory() external view returns (address);

        /// Returns the WETH address.
        function WETH() external view returns (address);
    }

    /// Uniswap V3 QuoterV2 interface.
    ///
    /// Quotes are computed by executing the swap and reverting, so these must be
    /// invoked through `eth_call` only.
    interface IQuoterV2 {
        struct QuoteExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amountIn;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        struct QuoteExactOutputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amount;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        function quoteExactInputSingle(QuoteExactInputSingleParams calldata params)
            external
            returns (
                uint256 amountOut,
                uint160 sqrtPriceX96After,
                uint32 initializedTicksCrossed,
                uint256 gasEstimate
            );

        function quoteExactOutputSingle(QuoteExactOutputSingleParams calldata params)
            external
            returns (
                uint256 amountIn,
                uint160 sqrtPriceX96After,
                uint32 initializedTicksCrossed,
                uint256 gasEstimate
            );
    }

    /// Uniswap V3 SwapRouter interface for executing single-hop swaps.
    interface ISwapRouter {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        struct ExactOutputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountOut;
            uint256 amountInMaximum;
            uint160 sqrtPriceLimitX96;
        }

        /// Swaps `amountIn` of one token for as much as possible of another token.
        function exactInputSingle(ExactInputSingleParams calldata params)
            external
            payable
            returns (uint256 amountOut);

        /// Swaps as little as possible of one token for `amountOut` of another token.
        function exactOutputSingle(ExactOutputSingleParams calldata params)
            external
            payable
            returns (uint256 amountIn);

        /// Executes several encoded router calls in a single transaction.
        function multicall(bytes[] calldata data) external payable returns (bytes[] memory results);

        /// Unwraps the router's WETH9 balance and sends it as ETH to `recipient`.
        function unwrapWETH9(uint256 amountMinimum, address recipient) external payable;

        /// Refunds any ETH left on the router to the caller.
        function refundETH() external payable;

        function WETH9() external view returns (address);

        function factory() external view returns (address);
    }

    interface IUniswapV3Factory {
        /// Returns the pool for a token pair and fee, or the zero address.
        function getPool(address tokenA, address tokenB, uint24 fee) external view returns (address pool);
    }

    /// Uniswap V3 pool state and immutables.
    interface IUniswapV3Pool {
        function factory() external view returns (address);
        function token0() external view returns (address);
        function token1() external view returns (address);
        function fee() external view returns (uint24);
        function tickSpacing() external view returns (int24);
        function maxLiquidityPerTick() external view returns (uint128);

        function liquidity() external view returns (uint128);

        function slot0()
            external
            view
            returns (
                uint160 sqrtPriceX96,
                int24 tick,
                uint16 observationIndex,
                uint16 observationCardinality,
                uint16 observationCardinalityNext,
                uint8 feeProtocol,
                bool unlocked
            );

        /// Sets the starting price of a freshly created pool.
        function initialize(uint160 sqrtPriceX96) external;

        /// Returns 256 packed initialized-tick flags for one word of the bitmap.
        function tickBitmap(int16 wordPosition) external view returns (uint256);

        function ticks(int24 tick)
            external
            view
            returns (
                uint128 liquidityGross,
                int128 liquidityNet,
                uint256 feeGrowthOutside0X128,
                uint256 feeGrowthOutside1X128,
                int56 tickCumulativeOutside,
                uint160 secondsPerLiquidityOutsideX128,
                uint32 secondsOutside,
                bool initialized
            );
    }

    /// Uniswap V3 NonfungiblePositionManager, positions are ERC721 tokens.
    interface INonfungiblePositionManager {
        struct MintParams {
            address token0;
            address token1;
            uint24 fee;
            int24 tickLower;
            int24 tickUpper;
            uint256 amount0Desired;
            uint256 amount1Desired;
            uint256 amount0Min;
            uint256 amount1Min;
            address recipient;
            uint256 deadline;
        }

        struct DecreaseLiquidityParams {
            uint256 tokenId;
            uint128 liquidity;
            uint256 amount0Min;
            uint256 amount1Min;
            uint256 deadline;
        }

        struct CollectParams {
            uint256 tokenId;
            address recipient;
            uint128 amount0Max;
            uint128 amount1Max;
        }

        function mint(MintParams calldata params)
            external
            payable
            returns (uint256 tokenId, uint128 liquidity, uint256 amount0, uint256 amount1);

        function decreaseLiquidity(DecreaseLiquidityParams calldata params)
            external
            payable
            returns (uint256 amount0, uint256 amount1);

        function collect(CollectParams calldata params) external payable returns (uint256 amount0, uint256 amount1);

        function burn(uint256 tokenId) external payable;

        function positions(uint256 tokenId)
            external
            view
            returns (
                uint96 nonce,
                address operator,
                address token0,
                address token1,
                uint24 fee,
                int24 tickLower,
                int24 tickUpper,
                uint128 liquidity,
                uint256 feeGrowthInside0LastX128,
                uint256 feeGrowthInside1LastX128,
                uint128 tokensOwed0,
                uint128 tokensOwed1
            );

        function balanceOf(address owner) external view returns (uint256);

        function tokenOfOwnerByIndex(address owner, uint256 index) external view returns (uint256);
    }

    /// Multicall2 aggregator, executes a batch of static calls in one request.
    interface IMulticall2 {
        struct Call {
            address target;
            bytes callData;
        }

        function aggregate(Call[] calldata calls) external returns (uint256 blockNumber, bytes[] memory returnData);
    }

    /// Identifies a Uniswap V4 pool inside the singleton PoolManager.
    struct PoolKey {
        address currency0;
        address currency1;
        uint24 fee;
        int24 tickSpacing;
        address hooks;
    }

    /// Uniswap V4 StateView lens over PoolManager storage.
    interface IStateView {
        function getSlot0(bytes32 poolId)
            external
            view
            returns (uint160 sqrtPriceX96, int24 tick, uint24 protocolFee, uint24 lpFee);

        function getLiquidity(bytes32 poolId) external view returns (uint128 liquidity);
    }
}
