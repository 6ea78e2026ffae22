//! On-chain Quote Source
//!
//! Quotes each hop with a `QuoterV2.quoteExactInputSingle` eth_call against
//! the venue's quoter contract, one HTTP provider per market. The quoter
//! simulates the swap and reverts on missing pools, which surfaces here as
//! an error and becomes `QuoteUnavailable` upstream.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use alloy::primitives::{Address, Uint, U160, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::info;

use super::quoter::{QuoteRequest, QuoteSource};
use crate::config::MarketConfig;
use crate::contracts::IQuoterV2;

/// Convert a u32 fee tier to the uint24 used by the quoter ABI.
/// Fee tiers are range-checked at config load.
fn fee_to_u24(fee: u32) -> Uint<24, 1> {
    Uint::from_limbs([fee as u64])
}

struct MarketEndpoint {
    provider: DynProvider,
    /// Venue name -> quoter contract
    quoters: HashMap<String, Address>,
}

pub struct RpcQuoteSource {
    markets: HashMap<String, MarketEndpoint>,
}

impl RpcQuoteSource {
    pub fn new(markets: &[MarketConfig]) -> Result<Self> {
        let mut endpoints = HashMap::new();
        for market in markets {
            let url = market
                .rpc_url
                .parse()
                .with_context(|| format!("Invalid RPC URL for market {}", market.id))?;
            let provider = ProviderBuilder::new().connect_http(url).erased();
            let quoters = market
                .venues
                .iter()
                .map(|v| (v.name.clone(), v.quoter))
                .collect();
            info!("Market {}: {} venue quoter(s)", market.id, market.venues.len());
            endpoints.insert(market.id.clone(), MarketEndpoint { provider, quoters });
        }
        Ok(Self { markets: endpoints })
    }

    fn endpoint(&self, market: &str) -> Result<&MarketEndpoint> {
        self.markets
            .get(market)
            .ok_or_else(|| anyhow!("unknown market {}", market))
    }
}

#[async_trait]
impl QuoteSource for RpcQuoteSource {
    async fn quote(&self, request: QuoteRequest<'_>) -> Result<U256> {
        let endpoint = self.endpoint(request.market)?;
        let quoter_address = endpoint
            .quoters
            .get(request.venue)
            .copied()
            .ok_or_else(|| anyhow!("unknown venue {} on {}", request.venue, request.market))?;

        let quoter = IQuoterV2::new(quoter_address, endpoint.provider.clone());
        let params = IQuoterV2::QuoteExactInputSingleParams {
            tokenIn: request.asset_in.address,
            tokenOut: request.asset_out.address,
            amountIn: request.amount_in,
            fee: fee_to_u24(request.fee_tier),
            sqrtPriceLimitX96: U160::ZERO,
        };

        let result = quoter
            .quoteExactInputSingle(params)
            .call()
            .await
            .context("quoteExactInputSingle reverted")?;
        Ok(result.amountOut)
    }

    async fn check_connectivity(&self, market: &str) -> Result<()> {
        let endpoint = self.endpoint(market)?;
        endpoint
            .provider
            .get_block_number()
            .await
            .context("eth_blockNumber failed")?;
        Ok(())
    }
}
