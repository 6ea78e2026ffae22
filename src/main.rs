//! Opportunity discovery engine binary
//!
//! Loads the TOML configuration, wires the on-chain quote source and the
//! optional HTTP execution backend into the engine, and serves the control
//! surface. SIGINT/SIGTERM stop the scan loop cooperatively before exit.
//!
//! Usage:
//!   arb-engine --config config/engine.toml --listen 0.0.0.0:8080 --autostart
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use anyhow::{Context, Result};
use arb_engine::arbitrage::costs;
use arb_engine::arbitrage::{ExecutionMechanism, HttpExecutionMechanism, RpcQuoteSource};
use arb_engine::{api, Engine, EngineConfig};
use clap::Parser;
use futures::StreamExt;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Opportunity discovery & selection engine
#[derive(Parser)]
#[command(name = "arb-engine")]
struct Args {
    /// Path to the TOML configuration
    #[arg(short, long, env = "ENGINE_CONFIG", default_value = "config/engine.toml")]
    config: PathBuf,

    /// Control surface listen address
    #[arg(short, long, env = "ENGINE_LISTEN", default_value = "127.0.0.1:8080")]
    listen: String,

    /// Start in live mode (requires an [executor] section)
    #[arg(long)]
    live: bool,

    /// Start the scan loop immediately instead of waiting for POST /api/start
    #[arg(long)]
    autostart: bool,

    /// Emit logs as JSON lines
    #[arg(long, env = "ENGINE_JSON_LOGS")]
    json_logs: bool,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        fmt().json().with_env_filter(filter).with_target(false).init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    info!("===========================================");
    info!("   Opportunity Discovery Engine");
    info!("===========================================");
    info!("Config file: {}", args.config.display());

    let config = match EngineConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Refusing to start: {}", e);
            return Err(e.into());
        }
    };

    for market in &config.markets {
        let strategies: Vec<&str> = market.strategies.iter().map(|s| s.as_str()).collect();
        info!(
            "Market {}: {}/{} | {} venue(s) | fee tiers {:?} | strategies {:?}",
            market.id,
            market.base_asset,
            market.quote_asset,
            market.venues.len(),
            market.fee_tiers,
            strategies
        );
    }
    info!(
        "Scan interval {}ms | cooldown {}ms | min profit ${} | top {}",
        config.engine.scan_interval.as_millis(),
        config.engine.cooldown.as_millis(),
        config.engine.min_profit_usd,
        config.engine.top_n
    );

    let source = Arc::new(RpcQuoteSource::new(&config.markets).context("Failed to build quote source")?);
    let executor: Option<Arc<dyn ExecutionMechanism>> = match &config.executor {
        Some(settings) => {
            info!("Execution backend: {}", settings.endpoint);
            Some(Arc::new(
                HttpExecutionMechanism::new(settings, config.engine.min_profit_usd)
                    .context("Failed to build execution backend")?,
            ))
        }
        None => {
            warn!("No [executor] configured - engine will run in DRY RUN mode only");
            None
        }
    };

    let engine = Engine::new(
        &config.engine,
        config.markets,
        costs::from_settings(&config.costs),
        source,
        executor,
    );

    if args.autostart || args.live {
        let dry_run = if args.live { Some(false) } else { None };
        engine.start(dry_run).await.context("Failed to start scan loop")?;
    }

    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("Failed to bind {}", args.listen))?;
    info!("🚀 Control surface running at http://{}/api", args.listen);

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handlers")?;
    let handle = signals.handle();
    let shutdown_engine = engine.clone();
    let shutdown = async move {
        if let Some(sig) = signals.next().await {
            info!("Received signal {} - shutting down", sig);
        }
        if let Ok(stats) = shutdown_engine.stop().await {
            info!("Final stats: {}", stats.summary());
        }
    };

    axum::serve(listener, api::router(engine))
        .with_graceful_shutdown(shutdown)
        .await
        .context("Control surface failed")?;

    handle.close();
    info!("Engine exited");
    Ok(())
}
