//! Configuration management
//!
//! Loads the engine and market definitions from a TOML file, resolves
//! secrets from the environment (.env via dotenv) and validates everything
//! once into strongly typed structs. Anything missing or inconsistent is a
//! fatal `EngineError::Configuration`.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use alloy::primitives::{Address, U256};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::EngineError;
use crate::types::StrategyKind;

// ── Raw TOML layout ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    #[serde(default)]
    engine: RawEngine,
    #[serde(default)]
    costs: RawCosts,
    executor: Option<RawExecutor>,
    #[serde(rename = "market", default)]
    markets: Vec<RawMarket>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawEngine {
    #[serde(default = "default_scan_interval")]
    scan_interval_ms: u64,
    #[serde(default = "default_cooldown")]
    cooldown_ms: u64,
    cooldown_backoff_max_ms: Option<u64>,
    #[serde(default = "default_min_profit")]
    min_profit_usd: Decimal,
    #[serde(default = "default_top_n")]
    top_n: usize,
    #[serde(default = "default_quote_timeout")]
    quote_timeout_ms: u64,
    #[serde(default = "default_true")]
    dry_run: bool,
    #[serde(default = "default_trade_history")]
    trade_history: usize,
    #[serde(default = "default_activity_log")]
    activity_log: usize,
}

impl Default for RawEngine {
    fn default() -> Self {
        Self {
            scan_interval_ms: default_scan_interval(),
            cooldown_ms: default_cooldown(),
            cooldown_backoff_max_ms: None,
            min_profit_usd: default_min_profit(),
            top_n: default_top_n(),
            quote_timeout_ms: default_quote_timeout(),
            dry_run: true,
            trade_history: default_trade_history(),
            activity_log: default_activity_log(),
        }
    }
}

fn default_scan_interval() -> u64 { 2000 }
fn default_cooldown() -> u64 { 30_000 }
fn default_min_profit() -> Decimal { Decimal::new(10, 2) }
fn default_top_n() -> usize { 20 }
fn default_quote_timeout() -> u64 { 3000 }
fn default_true() -> bool { true }
fn default_trade_history() -> usize { 50 }
fn default_activity_log() -> usize { 100 }

#[derive(Debug, Clone, Deserialize)]
struct RawCosts {
    #[serde(default = "default_cost_model")]
    model: String,
    #[serde(default = "default_intra_cost")]
    intra_venue: Decimal,
    #[serde(default = "default_cross_cost")]
    cross_venue: Decimal,
    #[serde(default = "default_triangular_cost")]
    triangular: Decimal,
    #[serde(default = "default_intra_cost")]
    stable_to_stable: Decimal,
    #[serde(default = "default_cross_cost")]
    credit_line: Decimal,
    #[serde(default = "default_gas_price")]
    gas_price_gwei: Decimal,
    #[serde(default = "default_base_gas")]
    base_gas: u64,
    #[serde(default = "default_gas_per_hop")]
    gas_per_hop: u64,
}

impl Default for RawCosts {
    fn default() -> Self {
        Self {
            model: default_cost_model(),
            intra_venue: default_intra_cost(),
            cross_venue: default_cross_cost(),
            triangular: default_triangular_cost(),
            stable_to_stable: default_intra_cost(),
            credit_line: default_cross_cost(),
            gas_price_gwei: default_gas_price(),
            base_gas: default_base_gas(),
            gas_per_hop: default_gas_per_hop(),
        }
    }
}

fn default_cost_model() -> String { "fixed".to_string() }
fn default_intra_cost() -> Decimal { Decimal::new(5, 2) }
fn default_cross_cost() -> Decimal { Decimal::new(8, 2) }
fn default_triangular_cost() -> Decimal { Decimal::new(12, 2) }
fn default_gas_price() -> Decimal { Decimal::new(30, 0) }
fn default_base_gas() -> u64 { 90_000 }
fn default_gas_per_hop() -> u64 { 80_000 }

#[derive(Debug, Clone, Deserialize)]
struct RawExecutor {
    endpoint: String,
    #[serde(default = "default_api_key_env")]
    api_key_env: String,
    #[serde(default = "default_executor_timeout")]
    timeout_ms: u64,
}

fn default_api_key_env() -> String { "EXECUTOR_API_KEY".to_string() }
fn default_executor_timeout() -> u64 { 60_000 }

#[derive(Debug, Clone, Deserialize)]
struct RawMarket {
    id: String,
    rpc_url: Option<String>,
    rpc_url_env: Option<String>,
    base_asset: String,
    quote_asset: String,
    fee_tiers: Vec<u32>,
    price_fee_tier: Option<u32>,
    native_usd_fallback: Decimal,
    #[serde(default)]
    strategies: Vec<String>,
    #[serde(default)]
    amounts: Vec<Decimal>,
    #[serde(rename = "asset")]
    assets: Vec<RawAsset>,
    #[serde(rename = "venue")]
    venues: Vec<RawVenue>,
    cross_venue: Option<RawCrossVenue>,
    triangular: Option<RawTriangular>,
    stable_to_stable: Option<RawStable>,
    credit_line: Option<RawCreditLine>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawAsset {
    symbol: String,
    address: String,
    decimals: u8,
    #[serde(default)]
    stable: bool,
    usd_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawVenue {
    name: String,
    quoter: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RawCrossVenue {
    amounts: Vec<Decimal>,
    quote_amounts: Vec<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawTriangular {
    amounts: Vec<Decimal>,
    intermediates: Vec<String>,
    fee_tiers: Option<Vec<u32>>,
    #[serde(default = "default_max_fee_combos")]
    max_fee_combos: usize,
}

fn default_max_fee_combos() -> usize { 8 }

#[derive(Debug, Clone, Deserialize)]
struct RawStable {
    pairs: Vec<(String, String)>,
    amounts: Vec<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawCreditLine {
    amounts: Vec<Decimal>,
    fee_pairs: Vec<(u32, u32)>,
    #[serde(default = "default_credit_fee_bps")]
    fee_bps: u32,
}

fn default_credit_fee_bps() -> u32 { 5 }

// ── Validated configuration ──────────────────────────────────────────

/// Token known to a market
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
    pub stable: bool,
    pub usd_price: Option<Decimal>,
}

/// Quoting venue (exchange) inside a market
#[derive(Debug, Clone, PartialEq)]
pub struct Venue {
    pub name: String,
    pub quoter: Address,
}

#[derive(Debug, Clone)]
pub struct CrossVenueConfig {
    /// Candidate amounts in base asset units
    pub amounts: Vec<U256>,
    /// Candidate amounts in quote asset units (quote-first direction)
    pub quote_amounts: Vec<U256>,
}

#[derive(Debug, Clone)]
pub struct TriangularConfig {
    pub amounts: Vec<U256>,
    /// Assets eligible for the middle of a loop; absent ones are ignored
    pub intermediates: Vec<String>,
    pub fee_tiers: Vec<u32>,
    /// Cap on fee triplets tried per loop and amount
    pub max_fee_combos: usize,
}

/// Stable pair with candidate notionals in the first asset's units
#[derive(Debug, Clone)]
pub struct StablePair {
    pub first: String,
    pub second: String,
    pub amounts: Vec<U256>,
}

#[derive(Debug, Clone)]
pub struct StableConfig {
    pub pairs: Vec<StablePair>,
}

#[derive(Debug, Clone)]
pub struct CreditLineConfig {
    pub amounts: Vec<U256>,
    pub fee_pairs: Vec<(u32, u32)>,
    /// Borrowing fee in basis points of the borrowed amount
    pub fee_bps: u32,
}

/// One configured market, immutable for the process lifetime
#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub id: String,
    pub rpc_url: String,
    pub assets: HashMap<String, Asset>,
    pub base_asset: String,
    pub quote_asset: String,
    /// First venue is the primary one
    pub venues: Vec<Venue>,
    pub fee_tiers: Vec<u32>,
    pub price_fee_tier: u32,
    pub native_usd_fallback: Decimal,
    pub strategies: Vec<StrategyKind>,
    /// Candidate amounts in base asset units
    pub amounts: Vec<U256>,
    pub cross_venue: Option<CrossVenueConfig>,
    pub triangular: Option<TriangularConfig>,
    pub stable_to_stable: Option<StableConfig>,
    pub credit_line: Option<CreditLineConfig>,
}

impl MarketConfig {
    pub fn asset(&self, symbol: &str) -> Option<&Asset> {
        self.assets.get(symbol)
    }

    pub fn primary_venue(&self) -> &Venue {
        // validated non-empty at load
        &self.venues[0]
    }

    pub fn alternate_venues(&self) -> &[Venue] {
        &self.venues[1..]
    }

    pub fn supports(&self, strategy: StrategyKind) -> bool {
        self.strategies.contains(&strategy)
    }

    pub fn base(&self) -> &Asset {
        &self.assets[&self.base_asset]
    }

    pub fn quote(&self) -> &Asset {
        &self.assets[&self.quote_asset]
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub scan_interval: Duration,
    pub cooldown: Duration,
    pub cooldown_backoff_max: Option<Duration>,
    pub min_profit_usd: Decimal,
    pub top_n: usize,
    pub quote_timeout: Duration,
    pub dry_run: bool,
    pub trade_history: usize,
    pub activity_log: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostModelKind {
    Fixed,
    Gas,
}

#[derive(Debug, Clone)]
pub struct CostSettings {
    pub model: CostModelKind,
    pub per_strategy: HashMap<StrategyKind, Decimal>,
    pub gas_price_gwei: Decimal,
    pub base_gas: u64,
    pub gas_per_hop: u64,
}

#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub engine: EngineSettings,
    pub costs: CostSettings,
    pub executor: Option<ExecutorSettings>,
    pub markets: Vec<MarketConfig>,
}

impl EngineConfig {
    /// Load configuration from a TOML file, resolving secrets from the
    /// process environment (after loading `.env`).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        dotenv::dotenv().ok();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            EngineError::config(format!(
                "failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_toml_str(&content, |key| std::env::var(key).ok())
    }

    /// Parse and validate a TOML document. `env` resolves variable names
    /// referenced by `*_env` keys.
    pub fn from_toml_str<F>(content: &str, env: F) -> Result<Self, EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| EngineError::config(format!("failed to parse TOML configuration: {}", e)))?;
        raw.validate(&env)
    }
}

impl RawConfig {
    fn validate(self, env: &dyn Fn(&str) -> Option<String>) -> Result<EngineConfig, EngineError> {
        let engine = self.engine.validate()?;
        let costs = self.costs.validate()?;

        let executor = match self.executor {
            Some(raw) => {
                if raw.endpoint.trim().is_empty() {
                    return Err(EngineError::config("executor.endpoint is empty"));
                }
                let api_key = env(&raw.api_key_env).filter(|k| !k.is_empty()).ok_or_else(|| {
                    EngineError::config(format!("executor API key {} not set", raw.api_key_env))
                })?;
                Some(ExecutorSettings {
                    endpoint: raw.endpoint,
                    api_key,
                    timeout: Duration::from_millis(raw.timeout_ms),
                })
            }
            None => None,
        };

        if self.markets.is_empty() {
            return Err(EngineError::config("no [[market]] configured"));
        }

        let mut seen = HashSet::new();
        let mut markets = Vec::with_capacity(self.markets.len());
        for raw in self.markets {
            if !seen.insert(raw.id.clone()) {
                return Err(EngineError::config(format!("duplicate market id '{}'", raw.id)));
            }
            markets.push(raw.validate(env)?);
        }

        Ok(EngineConfig { engine, costs, executor, markets })
    }
}

impl RawEngine {
    fn validate(self) -> Result<EngineSettings, EngineError> {
        if self.top_n == 0 {
            return Err(EngineError::config("engine.top_n must be at least 1"));
        }
        if self.trade_history == 0 || self.activity_log == 0 {
            return Err(EngineError::config("history bounds must be at least 1"));
        }
        if self.quote_timeout_ms == 0 {
            return Err(EngineError::config("engine.quote_timeout_ms must be positive"));
        }
        if self.min_profit_usd.is_sign_negative() {
            return Err(EngineError::config("engine.min_profit_usd must not be negative"));
        }
        if let Some(max) = self.cooldown_backoff_max_ms {
            if max < self.cooldown_ms {
                return Err(EngineError::config(
                    "engine.cooldown_backoff_max_ms must be >= cooldown_ms",
                ));
            }
        }

        Ok(EngineSettings {
            scan_interval: Duration::from_millis(self.scan_interval_ms),
            cooldown: Duration::from_millis(self.cooldown_ms),
            cooldown_backoff_max: self.cooldown_backoff_max_ms.map(Duration::from_millis),
            min_profit_usd: self.min_profit_usd,
            top_n: self.top_n,
            quote_timeout: Duration::from_millis(self.quote_timeout_ms),
            dry_run: self.dry_run,
            trade_history: self.trade_history,
            activity_log: self.activity_log,
        })
    }
}

impl RawCosts {
    fn validate(self) -> Result<CostSettings, EngineError> {
        let model = match self.model.to_lowercase().as_str() {
            "fixed" => CostModelKind::Fixed,
            "gas" => CostModelKind::Gas,
            other => {
                return Err(EngineError::config(format!(
                    "unknown cost model '{}' (expected fixed or gas)",
                    other
                )))
            }
        };

        let per_strategy: HashMap<StrategyKind, Decimal> = [
            (StrategyKind::IntraVenue, self.intra_venue),
            (StrategyKind::CrossVenue, self.cross_venue),
            (StrategyKind::Triangular, self.triangular),
            (StrategyKind::StableToStable, self.stable_to_stable),
            (StrategyKind::CreditLine, self.credit_line),
        ]
        .into_iter()
        .collect();

        if per_strategy.values().any(|c| c.is_sign_negative()) || self.gas_price_gwei.is_sign_negative() {
            return Err(EngineError::config("costs must not be negative"));
        }

        Ok(CostSettings {
            model,
            per_strategy,
            gas_price_gwei: self.gas_price_gwei,
            base_gas: self.base_gas,
            gas_per_hop: self.gas_per_hop,
        })
    }
}

impl RawMarket {
    fn validate(self, env: &dyn Fn(&str) -> Option<String>) -> Result<MarketConfig, EngineError> {
        let id = self.id;
        let err = |msg: String| EngineError::config(format!("market '{}': {}", id, msg));

        let rpc_url = match (self.rpc_url, self.rpc_url_env) {
            (Some(url), _) if !url.is_empty() => url,
            (_, Some(var)) => env(&var)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| err(format!("RPC endpoint variable {} not set", var)))?,
            _ => return Err(err("no rpc_url or rpc_url_env".to_string())),
        };

        let mut assets = HashMap::new();
        for raw in self.assets {
            let address = Address::from_str(&raw.address)
                .map_err(|e| err(format!("asset {} has invalid address: {}", raw.symbol, e)))?;
            if raw.decimals > 36 {
                return Err(err(format!("asset {} has unsupported decimals {}", raw.symbol, raw.decimals)));
            }
            let asset = Asset {
                symbol: raw.symbol.clone(),
                address,
                decimals: raw.decimals,
                stable: raw.stable,
                usd_price: raw.usd_price,
            };
            if assets.insert(raw.symbol.clone(), asset).is_some() {
                return Err(err(format!("duplicate asset {}", raw.symbol)));
            }
        }

        let require_asset = |symbol: &str| -> Result<&Asset, EngineError> {
            assets
                .get(symbol)
                .ok_or_else(|| err(format!("asset {} is not defined", symbol)))
        };
        let base_decimals = require_asset(&self.base_asset)?.decimals;
        let quote_decimals = require_asset(&self.quote_asset)?.decimals;
        if self.base_asset == self.quote_asset {
            return Err(err("base_asset and quote_asset must differ".to_string()));
        }

        if self.venues.is_empty() {
            return Err(err("at least one [[market.venue]] is required".to_string()));
        }
        let mut venues = Vec::with_capacity(self.venues.len());
        for raw in self.venues {
            let quoter = Address::from_str(&raw.quoter)
                .map_err(|e| err(format!("venue {} has invalid quoter address: {}", raw.name, e)))?;
            venues.push(Venue { name: raw.name, quoter });
        }

        if self.fee_tiers.is_empty() {
            return Err(err("fee_tiers is empty".to_string()));
        }
        check_fee_tiers(&self.fee_tiers).map_err(err)?;
        let price_fee_tier = self.price_fee_tier.unwrap_or(self.fee_tiers[0]);
        check_fee_tiers(&[price_fee_tier]).map_err(err)?;

        if !self.native_usd_fallback.is_sign_positive() || self.native_usd_fallback.is_zero() {
            return Err(err("native_usd_fallback must be positive".to_string()));
        }

        let mut strategies = Vec::new();
        for name in &self.strategies {
            let kind = StrategyKind::from_str(name).map_err(|e| err(e.to_string()))?;
            if !strategies.contains(&kind) {
                strategies.push(kind);
            }
        }

        let amounts = to_raw_amounts(&self.amounts, base_decimals).map_err(err)?;
        if strategies.contains(&StrategyKind::IntraVenue) && amounts.is_empty() {
            return Err(err("intra_venue needs candidate amounts".to_string()));
        }

        let cross_venue = match self.cross_venue {
            Some(raw) => Some(CrossVenueConfig {
                amounts: to_raw_amounts(&raw.amounts, base_decimals).map_err(err)?,
                quote_amounts: to_raw_amounts(&raw.quote_amounts, quote_decimals).map_err(err)?,
            }),
            None => None,
        };
        if strategies.contains(&StrategyKind::CrossVenue) {
            if venues.len() < 2 {
                return Err(err("cross_venue needs at least two venues".to_string()));
            }
            if cross_venue.is_none() {
                return Err(err("cross_venue enabled without [market.cross_venue]".to_string()));
            }
        }

        let triangular = match self.triangular {
            Some(raw) => {
                let fee_tiers = raw.fee_tiers.unwrap_or_else(|| self.fee_tiers.clone());
                check_fee_tiers(&fee_tiers).map_err(err)?;
                if raw.max_fee_combos == 0 {
                    return Err(err("triangular.max_fee_combos must be at least 1".to_string()));
                }
                Some(TriangularConfig {
                    amounts: to_raw_amounts(&raw.amounts, base_decimals).map_err(err)?,
                    intermediates: raw.intermediates,
                    fee_tiers,
                    max_fee_combos: raw.max_fee_combos,
                })
            }
            None => None,
        };
        if strategies.contains(&StrategyKind::Triangular) && triangular.is_none() {
            return Err(err("triangular enabled without [market.triangular]".to_string()));
        }

        let stable_to_stable = match self.stable_to_stable {
            Some(raw) => {
                let mut pairs = Vec::with_capacity(raw.pairs.len());
                for (first, second) in raw.pairs {
                    let decimals = require_asset(&first)?.decimals;
                    require_asset(&second)?;
                    pairs.push(StablePair {
                        amounts: to_raw_amounts(&raw.amounts, decimals).map_err(err)?,
                        first,
                        second,
                    });
                }
                Some(StableConfig { pairs })
            }
            None => None,
        };
        if strategies.contains(&StrategyKind::StableToStable) && stable_to_stable.is_none() {
            return Err(err("stable_to_stable enabled without [market.stable_to_stable]".to_string()));
        }

        let credit_line = match self.credit_line {
            Some(raw) => {
                if raw.fee_bps > 10_000 {
                    return Err(err("credit_line.fee_bps exceeds 10000".to_string()));
                }
                for (fee_in, fee_out) in &raw.fee_pairs {
                    check_fee_tiers(&[*fee_in, *fee_out]).map_err(err)?;
                }
                Some(CreditLineConfig {
                    amounts: to_raw_amounts(&raw.amounts, base_decimals).map_err(err)?,
                    fee_pairs: raw.fee_pairs,
                    fee_bps: raw.fee_bps,
                })
            }
            None => None,
        };
        if strategies.contains(&StrategyKind::CreditLine) && credit_line.is_none() {
            return Err(err("credit_line enabled without [market.credit_line]".to_string()));
        }

        Ok(MarketConfig {
            id: id.clone(),
            rpc_url,
            assets,
            base_asset: self.base_asset,
            quote_asset: self.quote_asset,
            venues,
            fee_tiers: self.fee_tiers,
            price_fee_tier,
            native_usd_fallback: self.native_usd_fallback,
            strategies,
            amounts,
            cross_venue,
            triangular,
            stable_to_stable,
            credit_line,
        })
    }
}

/// Fee tiers travel on-chain as uint24
fn check_fee_tiers(tiers: &[u32]) -> Result<(), String> {
    match tiers.iter().find(|t| **t == 0 || **t > 0xFF_FFFF) {
        Some(bad) => Err(format!("fee tier {} out of range", bad)),
        None => Ok(()),
    }
}

/// Convert a human amount ("0.01" WETH) into smallest units.
pub fn to_raw_units(amount: Decimal, decimals: u8) -> Result<U256, String> {
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(format!("amount {} must be positive", amount));
    }
    let mut scaled = amount;
    for _ in 0..decimals {
        scaled = scaled
            .checked_mul(Decimal::TEN)
            .ok_or_else(|| format!("amount {} overflows at {} decimals", amount, decimals))?;
    }
    let raw = scaled
        .trunc()
        .to_u128()
        .ok_or_else(|| format!("amount {} is not representable", amount))?;
    if raw == 0 {
        return Err(format!("amount {} rounds to zero at {} decimals", amount, decimals));
    }
    Ok(U256::from(raw))
}

fn to_raw_amounts(amounts: &[Decimal], decimals: u8) -> Result<Vec<U256>, String> {
    amounts.iter().map(|a| to_raw_units(*a, decimals)).collect()
}
