// Core data structures shared by scanners, dispatcher and stats

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Strategy scanners we support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    IntraVenue,     // Round trip across fee tiers of one venue
    CrossVenue,     // Forward leg on one venue, return leg on another
    Triangular,     // A -> B -> C -> A loops
    StableToStable, // Stable pairs only
    CreditLine,     // Borrowed notional, repaid with a fee
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::IntraVenue,
        StrategyKind::CrossVenue,
        StrategyKind::Triangular,
        StrategyKind::StableToStable,
        StrategyKind::CreditLine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::IntraVenue => "intra_venue",
            StrategyKind::CrossVenue => "cross_venue",
            StrategyKind::Triangular => "triangular",
            StrategyKind::StableToStable => "stable_to_stable",
            StrategyKind::CreditLine => "credit_line",
        }
    }

    /// Position in `ALL`, used for fixed-size per-strategy tables.
    pub fn index(&self) -> usize {
        match self {
            StrategyKind::IntraVenue => 0,
            StrategyKind::CrossVenue => 1,
            StrategyKind::Triangular => 2,
            StrategyKind::StableToStable => 3,
            StrategyKind::CreditLine => 4,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = EngineError;

    /// Accepts snake, kebab and camel spellings ("stable_to_stable", "stable-to-stable", "stableToStable").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(|c| c.to_lowercase())
            .collect();
        match normalized.as_str() {
            "intravenue" | "intra" => Ok(StrategyKind::IntraVenue),
            "crossvenue" | "cross" => Ok(StrategyKind::CrossVenue),
            "triangular" | "tri" => Ok(StrategyKind::Triangular),
            "stabletostable" | "stable" => Ok(StrategyKind::StableToStable),
            "creditline" | "flashloan" | "flash" => Ok(StrategyKind::CreditLine),
            _ => Err(EngineError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Raw token amounts are rendered as decimal strings in JSON
pub(crate) fn serialize_amount<S: Serializer>(amount: &U256, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(amount)
}

/// One swap inside a route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hop {
    pub venue: String,
    pub asset_in: String,
    pub asset_out: String,
    /// Fee tier in hundredths of a basis point (500 = 0.05%)
    pub fee_tier: u32,
    #[serde(serialize_with = "serialize_amount")]
    pub amount_in: U256,
    #[serde(serialize_with = "serialize_amount")]
    pub amount_out: U256,
}

impl Hop {
    /// "0.05%" style label for a fee tier
    pub fn fee_label(fee_tier: u32) -> String {
        let pct = Decimal::new(fee_tier as i64, 4).normalize();
        format!("{}%", pct)
    }
}

/// Candidate trade discovered during one scan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    pub market: String,
    pub strategy: StrategyKind,
    /// Human-readable route, e.g. "WETH -0.05%-> USDC -0.3%-> WETH"
    pub route: String,
    /// Asset the route starts and ends in; profit is denominated in it
    pub profit_asset: String,
    #[serde(serialize_with = "serialize_amount")]
    pub amount_in: U256,
    #[serde(serialize_with = "serialize_amount")]
    pub amount_out: U256,
    pub hops: Vec<Hop>,

    // Raw profit figures in smallest units of `profit_asset`
    pub gross_profit_raw: i128,
    pub estimated_cost_raw: i128,
    pub net_profit_raw: i128,

    // Same figures valued in USD
    pub gross_profit_usd: Decimal,
    pub estimated_cost_usd: Decimal,
    pub net_profit_usd: Decimal,

    pub spread_bps: f64,
    pub is_profitable: bool,
    pub found_at: DateTime<Utc>,
}

/// Terminal status of a dispatch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    Succeeded,
    Failed,
}

/// Outcome of one execution attempt (trade history entry)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchRecord {
    pub id: String,
    pub market: String,
    pub strategy: StrategyKind,
    pub route: String,
    pub expected_profit_usd: Decimal,
    pub realized_profit_usd: Decimal,
    pub realized_cost_usd: Decimal,
    pub status: DispatchStatus,
    /// Execution backend reference (transaction hash or bundle id)
    pub reference: Option<String>,
    pub error: Option<String>,
    pub execution_time_ms: u64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_parse_spellings() {
        assert_eq!("triangular".parse::<StrategyKind>().unwrap(), StrategyKind::Triangular);
        assert_eq!("stable-to-stable".parse::<StrategyKind>().unwrap(), StrategyKind::StableToStable);
        assert_eq!("crossVenue".parse::<StrategyKind>().unwrap(), StrategyKind::CrossVenue);
        assert_eq!("flash_loan".parse::<StrategyKind>().unwrap(), StrategyKind::CreditLine);
        assert!(matches!(
            "sandwich".parse::<StrategyKind>(),
            Err(EngineError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_strategy_round_trips_through_as_str() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.as_str().parse::<StrategyKind>().unwrap(), kind);
            assert_eq!(StrategyKind::ALL[kind.index()], kind);
        }
    }

    #[test]
    fn test_fee_labels() {
        assert_eq!(Hop::fee_label(100), "0.01%");
        assert_eq!(Hop::fee_label(500), "0.05%");
        assert_eq!(Hop::fee_label(3000), "0.3%");
        assert_eq!(Hop::fee_label(10000), "1%");
    }

    #[test]
    fn test_hop_amounts_serialize_as_decimal_strings() {
        let hop = Hop {
            venue: "uniswap".into(),
            asset_in: "WETH".into(),
            asset_out: "USDC".into(),
            fee_tier: 500,
            amount_in: U256::from(1_000_000_000_000_000_000u128),
            amount_out: U256::from(3_500_000_000u64),
        };
        let json = serde_json::to_value(&hop).unwrap();
        assert_eq!(json["amount_in"], "1000000000000000000");
        assert_eq!(json["amount_out"], "3500000000");
    }
}
