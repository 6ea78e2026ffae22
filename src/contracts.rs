//! Contract Definitions
//!
//! Solidity interfaces used by the on-chain quote source, defined with
//! alloy's `sol!` macro. `#[sol(rpc)]` generates instance types that make
//! calls through any alloy Provider.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use alloy::sol;

// ── Uniswap V3 QuoterV2 ───────────────────────────────────────────────

sol! {
    #[sol(rpc)]
    interface IQuoterV2 {
        struct QuoteExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amountIn;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        function quoteExactInputSingle(QuoteExactInputSingleParams memory params) external returns (uint256 amountOut, uint160 sqrtPriceX96After, uint32 initializedTicksCrossed, uint256 gasEstimate);
    }
}
