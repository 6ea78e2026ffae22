//! Candidate Space Generators
//!
//! Each scanner walks a finite cross product of (amount, fee tier, route)
//! parameters. The spaces are built here as restartable iterators so the
//! enumeration can be tested on its own, without any quote source.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use alloy::primitives::U256;

use crate::config::MarketConfig;

/// Amount plus outward and return fee tier of a two-leg round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTrip {
    pub amount: U256,
    pub fee_out: u32,
    pub fee_back: u32,
}

/// Ordered fee tier pairs. With `distinct`, pairs using the same tier twice are skipped.
pub fn fee_pairs(tiers: &[u32], distinct: bool) -> impl Iterator<Item = (u32, u32)> + Clone + '_ {
    tiers.iter().enumerate().flat_map(move |(i, &a)| {
        tiers
            .iter()
            .enumerate()
            .filter(move |(j, _)| !distinct || i != *j)
            .map(move |(_, &b)| (a, b))
    })
}

/// amounts × ordered fee pairs
pub fn round_trips<'a>(
    amounts: &'a [U256],
    tiers: &'a [u32],
    distinct: bool,
) -> impl Iterator<Item = RoundTrip> + Clone + 'a {
    amounts.iter().flat_map(move |&amount| {
        fee_pairs(tiers, distinct).map(move |(fee_out, fee_back)| RoundTrip { amount, fee_out, fee_back })
    })
}

/// Round trips over an explicit, curated list of fee pairs
pub fn curated_round_trips<'a>(
    amounts: &'a [U256],
    pairs: &'a [(u32, u32)],
) -> impl Iterator<Item = RoundTrip> + Clone + 'a {
    amounts.iter().flat_map(move |&amount| {
        pairs
            .iter()
            .map(move |&(fee_out, fee_back)| RoundTrip { amount, fee_out, fee_back })
    })
}

/// amounts × single fee tier, used where both legs share a tier
pub fn amount_tiers<'a>(amounts: &'a [U256], tiers: &'a [u32]) -> impl Iterator<Item = (U256, u32)> + Clone + 'a {
    amounts
        .iter()
        .flat_map(move |&amount| tiers.iter().map(move |&fee| (amount, fee)))
}

/// Three-asset loop A -> B -> C -> A
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriangleLoop {
    pub start: String,
    pub second: String,
    pub third: String,
}

/// Loop catalogue for a market: the base asset through every ordered pair
/// of distinct intermediates that the market actually defines. Missing
/// intermediates are skipped.
pub fn triangle_loops(market: &MarketConfig) -> Vec<TriangleLoop> {
    let Some(tri) = market.triangular.as_ref() else {
        return Vec::new();
    };
    let present: Vec<&String> = tri
        .intermediates
        .iter()
        .filter(|s| **s != market.base_asset && market.asset(s).is_some())
        .collect();

    let mut loops = Vec::new();
    for (i, second) in present.iter().enumerate() {
        for (j, third) in present.iter().enumerate() {
            if i == j {
                continue;
            }
            loops.push(TriangleLoop {
                start: market.base_asset.clone(),
                second: (*second).clone(),
                third: (*third).clone(),
            });
        }
    }
    loops
}

/// Fee tiers for the three hops of a loop. The cross product is truncated
/// to `limit` entries, lowest tiers first.
pub fn fee_triplets(tiers: &[u32], limit: usize) -> impl Iterator<Item = [u32; 3]> + Clone + '_ {
    tiers
        .iter()
        .flat_map(move |&a| {
            tiers
                .iter()
                .flat_map(move |&b| tiers.iter().map(move |&c| [a, b, c]))
        })
        .take(limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::{sample_env, SAMPLE};
    use crate::config::EngineConfig;

    fn amounts(values: &[u64]) -> Vec<U256> {
        values.iter().map(|v| U256::from(*v)).collect()
    }

    #[test]
    fn test_distinct_fee_pairs_skip_same_tier() {
        let pairs: Vec<_> = fee_pairs(&[100, 500, 3000], true).collect();
        assert_eq!(pairs.len(), 6);
        assert!(pairs.iter().all(|(a, b)| a != b));
        assert_eq!(pairs[0], (100, 500));
    }

    #[test]
    fn test_all_fee_pairs_include_same_tier() {
        let pairs: Vec<_> = fee_pairs(&[100, 500], false).collect();
        assert_eq!(pairs, vec![(100, 100), (100, 500), (500, 100), (500, 500)]);
    }

    #[test]
    fn test_round_trips_are_restartable() {
        let amts = amounts(&[1_000, 2_000]);
        let tiers = [500, 3000];
        let space = round_trips(&amts, &tiers, true);
        let first: Vec<_> = space.clone().collect();
        let second: Vec<_> = space.collect();
        assert_eq!(first.len(), 4);
        assert_eq!(first, second);
        assert_eq!(
            first[0],
            RoundTrip { amount: U256::from(1_000u64), fee_out: 500, fee_back: 3000 }
        );
    }

    #[test]
    fn test_single_tier_has_no_distinct_pairs() {
        let amts = amounts(&[1_000]);
        assert_eq!(round_trips(&amts, &[500], true).count(), 0);
    }

    #[test]
    fn test_curated_round_trips() {
        let amts = amounts(&[1, 5]);
        let pairs = [(500, 3000), (3000, 500)];
        let trips: Vec<_> = curated_round_trips(&amts, &pairs).collect();
        assert_eq!(trips.len(), 4);
        assert_eq!(trips[3].amount, U256::from(5u64));
        assert_eq!((trips[3].fee_out, trips[3].fee_back), (3000, 500));
    }

    #[test]
    fn test_amount_tiers() {
        let amts = amounts(&[1, 2]);
        let space: Vec<_> = amount_tiers(&amts, &[100, 500, 3000]).collect();
        assert_eq!(space.len(), 6);
        assert_eq!(space[5], (U256::from(2u64), 3000));
    }

    #[test]
    fn test_triangle_loops_only_use_present_assets() {
        let config = EngineConfig::from_toml_str(SAMPLE, sample_env).unwrap();
        let loops = triangle_loops(&config.markets[0]);
        // cbETH is not defined in the market, leaving USDC and USDbC
        assert_eq!(loops.len(), 2);
        assert!(loops.iter().all(|l| l.start == "WETH"));
        assert!(loops.iter().any(|l| l.second == "USDC" && l.third == "USDbC"));
        assert!(loops.iter().any(|l| l.second == "USDbC" && l.third == "USDC"));
    }

    #[test]
    fn test_fee_triplets_bounded() {
        let tiers = [100, 500, 3000];
        assert_eq!(fee_triplets(&tiers, 100).count(), 27);
        let bounded: Vec<_> = fee_triplets(&tiers, 4).collect();
        assert_eq!(bounded.len(), 4);
        assert_eq!(bounded[0], [100, 100, 100]);
        assert_eq!(bounded[3], [100, 500, 100]);
    }
}
