//! Profit Model
//!
//! Pure functions turning a route's input/output amounts, an estimated
//! execution cost and a minimum threshold into a profitability verdict.
//! All amount arithmetic stays in raw integer units; USD values are only
//! derived for display and for converting USD costs into raw units.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use alloy::primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Result of evaluating one route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfitVerdict {
    pub gross_profit: i128,
    pub net_profit: i128,
    pub is_profitable: bool,
}

/// `output - input` as a signed raw amount, saturating at the i128 bounds.
pub fn signed_delta(output: U256, input: U256) -> i128 {
    if output >= input {
        let diff = (output - input).saturating_to::<u128>();
        i128::try_from(diff).unwrap_or(i128::MAX)
    } else {
        let diff = (input - output).saturating_to::<u128>();
        i128::try_from(diff).map(|d| -d).unwrap_or(i128::MIN)
    }
}

/// Evaluate a round trip in raw units of the route's profit asset.
///
/// `gross = output - input`, `net = gross - cost`, profitable iff `net > threshold`.
pub fn evaluate(input: U256, output: U256, estimated_cost: i128, min_profit_threshold: i128) -> ProfitVerdict {
    let gross_profit = signed_delta(output, input);
    let net_profit = gross_profit.saturating_sub(estimated_cost);
    ProfitVerdict {
        gross_profit,
        net_profit,
        is_profitable: net_profit > min_profit_threshold,
    }
}

/// Gross spread in basis points of the input amount.
pub fn spread_bps(gross_profit: i128, input: U256) -> f64 {
    let input = input.saturating_to::<u128>();
    if input == 0 {
        return 0.0;
    }
    gross_profit as f64 * 10_000.0 / input as f64
}

/// Conversion rate between raw units of one asset and USD
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Valuation {
    pub decimals: u8,
    /// USD value of one whole token
    pub usd_per_unit: Decimal,
}

impl Valuation {
    pub fn new(decimals: u8, usd_per_unit: Decimal) -> Self {
        Self { decimals, usd_per_unit }
    }

    /// Stable-value asset pegged at 1 USD
    pub fn stable(decimals: u8) -> Self {
        Self::new(decimals, Decimal::ONE)
    }

    /// USD value of a signed raw amount. Amounts outside Decimal range saturate.
    pub fn to_usd(&self, raw: i128) -> Decimal {
        let saturated = if raw < 0 { Decimal::MIN } else { Decimal::MAX };
        Decimal::try_from_i128_with_scale(raw, self.decimals as u32)
            .ok()
            .and_then(|whole| whole.checked_mul(self.usd_per_unit))
            .unwrap_or(saturated)
    }

    /// Raw amount worth `usd`, rounded up so costs and thresholds are never understated.
    pub fn from_usd_ceil(&self, usd: Decimal) -> i128 {
        if self.usd_per_unit.is_zero() {
            return i128::MAX;
        }
        let mut tokens = match usd.checked_div(self.usd_per_unit) {
            Some(t) => t,
            None => return i128::MAX,
        };
        for _ in 0..self.decimals {
            tokens = match tokens.checked_mul(Decimal::TEN) {
                Some(t) => t,
                None => return i128::MAX,
            };
        }
        tokens
            .round_dp_with_strategy(0, RoundingStrategy::AwayFromZero)
            .to_i128()
            .unwrap_or(i128::MAX)
    }

    /// Whole tokens represented by a raw unsigned amount
    pub fn whole_units(&self, raw: U256) -> Decimal {
        let raw = raw.saturating_to::<u128>().min(i128::MAX as u128) as i128;
        Decimal::try_from_i128_with_scale(raw, self.decimals as u32).unwrap_or(Decimal::MAX)
    }
}
