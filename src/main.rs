//! Price Terminal - Entry Point
//!
//! Wires the quote store, the three feeds and the renderer, then runs
//! until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml if present (defaults otherwise) + validate
//! 2. Init tracing (JSON structured logging on stderr)
//! 3. Create the shared QuoteStore and Prometheus metrics
//! 4. Spawn Binance, Coinbase and Chainlink under the FeedSupervisor
//! 5. Spawn health/metrics server when enabled
//! 6. Spawn the TerminalRenderer redraw loop
//! 7. Wait for SIGINT -> broadcast shutdown -> join -> exit

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

use price_terminal::adapters::chain::{ChainlinkPoller, JsonRpcClient};
use price_terminal::adapters::feeds::{BinanceFeed, CoinbaseFeed, FeedSupervisor, RestartPolicy};
use price_terminal::adapters::metrics::{FeedMetrics, HealthServer, HealthState};
use price_terminal::adapters::terminal::TerminalRenderer;
use price_terminal::config;
use price_terminal::domain::QuoteStore;
use price_terminal::ports::QuoteSink;

/// Upper bound on waiting for tasks after shutdown is broadcast.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration (file optional) ────────────────
    let config = config::loader::load_or_default("config.toml")
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging on stderr ─────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(&config.terminal.log_level)
            }),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        assets = ?config.terminal.assets,
        metrics = config.metrics.enabled,
        "Starting price terminal"
    );

    // ── 3. Shared state ─────────────────────────────────────
    let store = Arc::new(QuoteStore::new());
    let sink: Arc<dyn QuoteSink> = Arc::clone(&store) as Arc<dyn QuoteSink>;
    let metrics = Arc::new(FeedMetrics::new().context("Failed to register metrics")?);
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 4. Feeds under supervision ──────────────────────────
    let mut supervisor = FeedSupervisor::new(shutdown_tx.clone(), Arc::clone(&metrics));
    let assets = config.terminal.assets.clone();

    supervisor.spawn(
        Arc::new(BinanceFeed::new(
            config.binance.clone(),
            &assets,
            Arc::clone(&sink),
            Arc::clone(&metrics),
        )),
        RestartPolicy::FixedDelay(config.binance.timing.reconnect_delay()),
    );

    supervisor.spawn(
        Arc::new(CoinbaseFeed::new(
            config.coinbase.clone(),
            &assets,
            Arc::clone(&sink),
            Arc::clone(&metrics),
        )),
        RestartPolicy::FixedDelay(config.coinbase.timing.reconnect_delay()),
    );

    let oracle_feeds: Vec<_> = config
        .chainlink
        .feeds
        .iter()
        .filter(|f| assets.contains(&f.asset))
        .cloned()
        .collect();
    if !oracle_feeds.is_empty() {
        let rpc = JsonRpcClient::new(&config.chainlink.rpc_url, config.chainlink.request_timeout())
            .context("Failed to create JSON-RPC client")?;
        supervisor.spawn(
            Arc::new(ChainlinkPoller::new(
                Arc::new(rpc),
                oracle_feeds,
                config.chainlink.poll_interval(),
                Arc::clone(&sink),
                Arc::clone(&metrics),
            )),
            RestartPolicy::FixedDelay(config.chainlink.poll_interval()),
        );
    }

    // ── 5. Health/metrics server (optional) ─────────────────
    let health_handle = config.metrics.enabled.then(|| {
        let server = HealthServer::new(
            HealthState {
                feeds: supervisor.health(),
                metrics: Arc::clone(&metrics),
            },
            config.metrics.bind_address.clone(),
        );
        let rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = server.run(rx).await {
                error!(error = %e, "Health server failed");
            }
        })
    });

    // ── 6. Renderer ─────────────────────────────────────────
    let renderer = TerminalRenderer::stdout(Arc::clone(&store), config.clone());
    let renderer_rx = shutdown_tx.subscribe();
    let renderer_handle = tokio::spawn(async move {
        if let Err(e) = renderer.run(renderer_rx).await {
            error!(error = %e, "Renderer failed");
        }
    });

    info!("All tasks spawned, terminal is running");

    // ── 7. Wait for SIGINT ──────────────────────────────────
    signal::ctrl_c()
        .await
        .context("Failed to listen for SIGINT")?;
    info!("SIGINT received, shutting down");

    let _ = shutdown_tx.send(());

    let _ = tokio::time::timeout(SHUTDOWN_GRACE, renderer_handle).await;
    supervisor.join(SHUTDOWN_GRACE).await;
    if let Some(handle) = health_handle {
        let _ = tokio::time::timeout(SHUTDOWN_GRACE, handle).await;
    }

    println!("\n{}Terminal closed.", price_terminal::adapters::terminal::render::RESET);
    info!("Shutdown complete");
    Ok(())
}
