//! Execution Cost Estimation
//!
//! Scanners ask a `CostModel` for the expected USD cost of executing a route.
//! Two models ship: flat per-strategy estimates and a gas-based estimate
//! scaled by hop count and the market's native asset price.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{CostModelKind, CostSettings};
use crate::types::StrategyKind;

/// Estimated cost of executing a route, in USD
pub trait CostModel: Send + Sync {
    fn estimate_usd(&self, strategy: StrategyKind, hops: usize, native_usd: Decimal) -> Decimal;
}

/// Fixed USD cost per strategy
#[derive(Debug, Clone)]
pub struct FixedCostModel {
    per_strategy: HashMap<StrategyKind, Decimal>,
    fallback: Decimal,
}

impl FixedCostModel {
    pub fn new(per_strategy: HashMap<StrategyKind, Decimal>) -> Self {
        let fallback = per_strategy.values().copied().max().unwrap_or(Decimal::ZERO);
        Self { per_strategy, fallback }
    }

    /// Same cost for every strategy
    pub fn uniform(cost_usd: Decimal) -> Self {
        Self::new(StrategyKind::ALL.iter().map(|k| (*k, cost_usd)).collect())
    }
}

impl CostModel for FixedCostModel {
    fn estimate_usd(&self, strategy: StrategyKind, _hops: usize, _native_usd: Decimal) -> Decimal {
        self.per_strategy.get(&strategy).copied().unwrap_or(self.fallback)
    }
}

/// gas = base_gas + gas_per_hop * hops; cost = gas * gas_price * native price
#[derive(Debug, Clone)]
pub struct GasCostModel {
    pub gas_price_gwei: Decimal,
    pub base_gas: u64,
    pub gas_per_hop: u64,
}

/// 1 gwei = 1e-9 native units
const GWEI: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

impl CostModel for GasCostModel {
    fn estimate_usd(&self, _strategy: StrategyKind, hops: usize, native_usd: Decimal) -> Decimal {
        let gas = self.base_gas.saturating_add(self.gas_per_hop.saturating_mul(hops as u64));
        Decimal::from(gas)
            .checked_mul(self.gas_price_gwei)
            .and_then(|g| g.checked_mul(GWEI))
            .and_then(|native| native.checked_mul(native_usd))
            .unwrap_or(Decimal::MAX)
    }
}

/// Build the configured cost model
pub fn from_settings(settings: &CostSettings) -> Arc<dyn CostModel> {
    match settings.model {
        CostModelKind::Fixed => Arc::new(FixedCostModel::new(settings.per_strategy.clone())),
        CostModelKind::Gas => Arc::new(GasCostModel {
            gas_price_gwei: settings.gas_price_gwei,
            base_gas: settings.base_gas,
            gas_per_hop: settings.gas_per_hop,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fixed_costs_per_strategy() {
        let mut costs = HashMap::new();
        costs.insert(StrategyKind::IntraVenue, dec!(0.05));
        costs.insert(StrategyKind::Triangular, dec!(0.12));
        let model = FixedCostModel::new(costs);

        assert_eq!(model.estimate_usd(StrategyKind::IntraVenue, 2, dec!(3500)), dec!(0.05));
        assert_eq!(model.estimate_usd(StrategyKind::Triangular, 3, dec!(3500)), dec!(0.12));
        // unlisted strategies use the most expensive estimate
        assert_eq!(model.estimate_usd(StrategyKind::CreditLine, 2, dec!(3500)), dec!(0.12));
    }

    #[test]
    fn test_gas_cost_scales_with_hops_and_price() {
        let model = GasCostModel {
            gas_price_gwei: dec!(30),
            base_gas: 50_000,
            gas_per_hop: 100_000,
        };
        // 250k gas * 30 gwei = 0.0075 ETH = $26.25 at $3500
        assert_eq!(model.estimate_usd(StrategyKind::IntraVenue, 2, dec!(3500)), dec!(26.25));
        assert!(
            model.estimate_usd(StrategyKind::Triangular, 3, dec!(3500))
                > model.estimate_usd(StrategyKind::IntraVenue, 2, dec!(3500))
        );
    }
}
