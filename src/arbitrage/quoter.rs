//! Quote Source Abstraction
//!
//! `QuoteSource` is the external price lookup (on-chain quoter contracts in
//! production, scripted mocks in tests). `DeadlineQuoter` wraps any source
//! with a per-call deadline and folds errors, reverts and timeouts into a
//! single `QuoteUnavailable` outcome.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use alloy::primitives::U256;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use crate::config::Asset;
use crate::error::EngineError;

/// Parameters of a single exact-input quote
#[derive(Debug, Clone, Copy)]
pub struct QuoteRequest<'a> {
    pub market: &'a str,
    pub venue: &'a str,
    pub asset_in: &'a Asset,
    pub asset_out: &'a Asset,
    pub amount_in: U256,
    pub fee_tier: u32,
}

/// Price-quote provider
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Output amount for swapping `amount_in` along one hop.
    async fn quote(&self, request: QuoteRequest<'_>) -> Result<U256>;

    /// Connectivity probe for a market. Defaults to always reachable.
    async fn check_connectivity(&self, _market: &str) -> Result<()> {
        Ok(())
    }
}

/// Quote source with a structured deadline on every call
#[derive(Clone)]
pub struct DeadlineQuoter {
    source: Arc<dyn QuoteSource>,
    timeout: Duration,
}

impl DeadlineQuoter {
    pub fn new(source: Arc<dyn QuoteSource>, timeout: Duration) -> Self {
        Self { source, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn quote(&self, request: QuoteRequest<'_>) -> Result<U256, EngineError> {
        match tokio::time::timeout(self.timeout, self.source.quote(request)).await {
            Ok(Ok(amount)) if !amount.is_zero() => Ok(amount),
            Ok(Ok(_)) => Err(self.unavailable(&request, "zero output")),
            Ok(Err(e)) => Err(self.unavailable(&request, &e.to_string())),
            Err(_) => Err(self.unavailable(&request, "deadline exceeded")),
        }
    }

    pub async fn check_connectivity(&self, market: &str) -> Result<(), EngineError> {
        match tokio::time::timeout(self.timeout, self.source.check_connectivity(market)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(EngineError::MarketUnreachable {
                market: market.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(EngineError::MarketUnreachable {
                market: market.to_string(),
                reason: format!("no response within {}ms", self.timeout.as_millis()),
            }),
        }
    }

    fn unavailable(&self, request: &QuoteRequest<'_>, reason: &str) -> EngineError {
        trace!(
            "quote miss {} {} {}->{} fee {}: {}",
            request.market,
            request.venue,
            request.asset_in.symbol,
            request.asset_out.symbol,
            request.fee_tier,
            reason
        );
        EngineError::QuoteUnavailable(format!(
            "{}->{} fee {} on {}: {}",
            request.asset_in.symbol, request.asset_out.symbol, request.fee_tier, request.venue, reason
        ))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy::primitives::Address;
    use anyhow::anyhow;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Route key: (venue, asset_in, asset_out, fee_tier, amount_in)
    type QuoteKey = (String, String, String, u32, U256);

    #[derive(Clone, Copy)]
    pub(crate) enum Scripted {
        Amount(U256),
        Hang,
        Fail,
    }

    /// Scripted quote source. Unscripted requests fall back to a fixed
    /// multiplier (in bps) of the input, or fail when none is set.
    #[derive(Default)]
    pub(crate) struct MockQuoteSource {
        quotes: Mutex<HashMap<QuoteKey, Scripted>>,
        fallback_bps: Option<u64>,
        unreachable: Mutex<Vec<String>>,
        pub(crate) calls: Mutex<usize>,
    }

    impl MockQuoteSource {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Every unscripted hop returns `amount_in * bps / 10000`
        pub(crate) fn with_fallback_bps(bps: u64) -> Self {
            Self { fallback_bps: Some(bps), ..Self::default() }
        }

        pub(crate) fn script(
            &self,
            venue: &str,
            asset_in: &str,
            asset_out: &str,
            fee_tier: u32,
            amount_in: u64,
            outcome: Scripted,
        ) {
            let key = (
                venue.to_string(),
                asset_in.to_string(),
                asset_out.to_string(),
                fee_tier,
                U256::from(amount_in),
            );
            self.quotes.lock().unwrap().insert(key, outcome);
        }

        pub(crate) fn set_unreachable(&self, market: &str) {
            self.unreachable.lock().unwrap().push(market.to_string());
        }
    }

    #[async_trait]
    impl QuoteSource for MockQuoteSource {
        async fn quote(&self, request: QuoteRequest<'_>) -> Result<U256> {
            *self.calls.lock().unwrap() += 1;
            let key = (
                request.venue.to_string(),
                request.asset_in.symbol.clone(),
                request.asset_out.symbol.clone(),
                request.fee_tier,
                request.amount_in,
            );
            let scripted = self.quotes.lock().unwrap().get(&key).copied();
            match scripted {
                Some(Scripted::Amount(out)) => Ok(out),
                Some(Scripted::Fail) => Err(anyhow!("execution reverted")),
                Some(Scripted::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(anyhow!("unreachable"))
                }
                None => match self.fallback_bps {
                    Some(bps) => Ok(request.amount_in * U256::from(bps) / U256::from(10_000u64)),
                    None => Err(anyhow!("no liquidity")),
                },
            }
        }

        async fn check_connectivity(&self, market: &str) -> Result<()> {
            if self.unreachable.lock().unwrap().iter().any(|m| m == market) {
                return Err(anyhow!("connection refused"));
            }
            Ok(())
        }
    }

    pub(crate) fn asset(symbol: &str, decimals: u8, stable: bool) -> Asset {
        Asset {
            symbol: symbol.to_string(),
            address: Address::ZERO,
            decimals,
            stable,
            usd_price: None,
        }
    }

    #[tokio::test]
    async fn test_deadline_turns_hang_into_unavailable() {
        let mock = MockQuoteSource::new();
        mock.script("uni", "USDC", "USDT", 100, 1_000, Scripted::Hang);
        let quoter = DeadlineQuoter::new(Arc::new(mock), Duration::from_millis(20));

        let usdc = asset("USDC", 6, true);
        let usdt = asset("USDT", 6, true);
        let request = QuoteRequest {
            market: "base",
            venue: "uni",
            asset_in: &usdc,
            asset_out: &usdt,
            amount_in: U256::from(1_000u64),
            fee_tier: 100,
        };
        let err = quoter.quote(request).await.unwrap_err();
        assert!(matches!(err, EngineError::QuoteUnavailable(_)));
        assert!(err.to_string().contains("deadline exceeded"));
    }

    #[tokio::test]
    async fn test_errors_and_zero_outputs_are_unavailable() {
        let mock = MockQuoteSource::new();
        mock.script("uni", "USDC", "USDT", 100, 1_000, Scripted::Fail);
        mock.script("uni", "USDC", "USDT", 500, 1_000, Scripted::Amount(U256::ZERO));
        mock.script("uni", "USDC", "USDT", 3000, 1_000, Scripted::Amount(U256::from(998u64)));
        let quoter = DeadlineQuoter::new(Arc::new(mock), Duration::from_secs(3));

        let usdc = asset("USDC", 6, true);
        let usdt = asset("USDT", 6, true);
        let request = |fee_tier| QuoteRequest {
            market: "base",
            venue: "uni",
            asset_in: &usdc,
            asset_out: &usdt,
            amount_in: U256::from(1_000u64),
            fee_tier,
        };
        assert!(quoter.quote(request(100)).await.is_err());
        assert!(quoter.quote(request(500)).await.is_err());
        assert_eq!(quoter.quote(request(3000)).await.unwrap(), U256::from(998u64));
    }

    #[tokio::test]
    async fn test_connectivity_maps_to_market_unreachable() {
        let mock = MockQuoteSource::new();
        mock.set_unreachable("polygon");
        let quoter = DeadlineQuoter::new(Arc::new(mock), Duration::from_secs(1));

        assert!(quoter.check_connectivity("base").await.is_ok());
        let err = quoter.check_connectivity("polygon").await.unwrap_err();
        assert!(matches!(err, EngineError::MarketUnreachable { .. }));
    }
}
