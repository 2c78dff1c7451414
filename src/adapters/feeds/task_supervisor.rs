//! Feed Task Supervisor - Lifecycle Management for Feed Connections
//!
//! Runs every `PriceFeed` in its own tokio task and restarts dropped
//! sessions under a `RestartPolicy`. Feeds never share a task, so a
//! failing feed cannot stall the others. Uses tokio::select! so the
//! restart delay is cut short by shutdown.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::adapters::metrics::FeedMetrics;
use crate::domain::quote::Source;
use crate::ports::price_feed::{PriceFeed, SessionStatus};

/// How a supervised feed is restarted after its session drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Wait a constant delay, then retry. Unbounded, no backoff.
    FixedDelay(Duration),
}

impl RestartPolicy {
    pub const fn delay(&self) -> Duration {
        match self {
            Self::FixedDelay(d) => *d,
        }
    }
}

/// Tracks the health state of a single feed task.
pub struct FeedHealth {
    /// Feed name for logging.
    name: &'static str,
    source: Source,
    /// Whether a session is currently running.
    active: AtomicBool,
    /// Sessions restarted after a failure.
    reconnects: AtomicU32,
    metrics: Arc<FeedMetrics>,
}

impl FeedHealth {
    pub fn new(name: &'static str, source: Source, metrics: Arc<FeedMetrics>) -> Self {
        Self {
            name,
            source,
            active: AtomicBool::new(false),
            reconnects: AtomicU32::new(0),
            metrics,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn source(&self) -> Source {
        self.source
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn reconnects(&self) -> u32 {
        self.reconnects.load(Ordering::Relaxed)
    }
}

/// Mirrors session state into the health record and the connected gauge.
impl SessionStatus for FeedHealth {
    fn set_connected(&self, connected: bool) {
        self.active.store(connected, Ordering::Relaxed);
        self.metrics.set_connected(self.source, connected);
    }
}

/// Supervises all price feed tasks.
pub struct FeedSupervisor {
    /// Shutdown broadcaster.
    shutdown_tx: broadcast::Sender<()>,
    metrics: Arc<FeedMetrics>,
    health: Vec<Arc<FeedHealth>>,
    handles: Vec<JoinHandle<()>>,
}

impl FeedSupervisor {
    pub fn new(shutdown_tx: broadcast::Sender<()>, metrics: Arc<FeedMetrics>) -> Self {
        Self {
            shutdown_tx,
            metrics,
            health: Vec::new(),
            handles: Vec::new(),
        }
    }

    /// Spawn `feed` in its own task under `policy`.
    #[instrument(skip(self, feed), fields(feed = feed.name()))]
    pub fn spawn(&mut self, feed: Arc<dyn PriceFeed>, policy: RestartPolicy) -> Arc<FeedHealth> {
        let health = Arc::new(FeedHealth::new(
            feed.name(),
            feed.source(),
            Arc::clone(&self.metrics),
        ));
        let shutdown_rx = self.shutdown_tx.subscribe();

        self.handles.push(tokio::spawn(supervise(
            feed,
            policy,
            Arc::clone(&health),
            Arc::clone(&self.metrics),
            shutdown_rx,
        )));
        self.health.push(Arc::clone(&health));

        info!(delay_ms = policy.delay().as_millis() as u64, "Feed task spawned");
        health
    }

    /// Health records for every spawned feed.
    pub fn health(&self) -> Vec<Arc<FeedHealth>> {
        self.health.clone()
    }

    /// Check if at least one feed has a running session (degraded mode OK).
    pub fn is_healthy(&self) -> bool {
        self.health.iter().any(|h| h.is_active())
    }

    /// Check if every feed has a running session.
    pub fn is_fully_healthy(&self) -> bool {
        !self.health.is_empty() && self.health.iter().all(|h| h.is_active())
    }

    /// Wait for all feed tasks to exit, giving up after `grace`.
    pub async fn join(self, grace: Duration) {
        let all = futures_util::future::join_all(self.handles);
        if tokio::time::timeout(grace, all).await.is_err() {
            warn!(grace_ms = grace.as_millis() as u64, "Feed tasks did not stop in time");
        }
    }
}

/// Restart loop for one feed. Returns only on shutdown.
async fn supervise(
    feed: Arc<dyn PriceFeed>,
    policy: RestartPolicy,
    health: Arc<FeedHealth>,
    metrics: Arc<FeedMetrics>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let source = feed.source();

    loop {
        let result = feed.run_session(health.as_ref(), &mut shutdown_rx).await;
        health.set_connected(false);

        match result {
            Ok(()) => {
                info!(feed = feed.name(), "Feed stopped on shutdown");
                return;
            }
            Err(e) => {
                health.reconnects.fetch_add(1, Ordering::Relaxed);
                metrics.reconnected(source);
                warn!(
                    feed = feed.name(),
                    error = %e,
                    delay_ms = policy.delay().as_millis() as u64,
                    "Feed session dropped, restarting after delay"
                );
            }
        }

        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                info!(feed = feed.name(), "Feed stopped on shutdown");
                return;
            }
            _ = tokio::time::sleep(policy.delay()) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;

    /// Fails the first `failures` sessions, then idles until shutdown.
    struct FlakyFeed {
        failures: usize,
        sessions: AtomicUsize,
    }

    #[async_trait]
    impl PriceFeed for FlakyFeed {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn source(&self) -> Source {
            Source::Coinbase
        }

        async fn run_session(
            &self,
            status: &dyn SessionStatus,
            shutdown_rx: &mut broadcast::Receiver<()>,
        ) -> anyhow::Result<()> {
            let n = self.sessions.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                anyhow::bail!("simulated drop {n}");
            }
            status.set_connected(true);
            let _ = shutdown_rx.recv().await;
            Ok(())
        }
    }

    /// Stays inside its session without ever reporting a connection.
    struct ConnectingFeed;

    #[async_trait]
    impl PriceFeed for ConnectingFeed {
        fn name(&self) -> &'static str {
            "connecting"
        }

        fn source(&self) -> Source {
            Source::Binance
        }

        async fn run_session(
            &self,
            _status: &dyn SessionStatus,
            shutdown_rx: &mut broadcast::Receiver<()>,
        ) -> anyhow::Result<()> {
            let _ = shutdown_rx.recv().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_running_session_is_not_connected_until_reported() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let metrics = Arc::new(FeedMetrics::new().unwrap());
        let mut supervisor = FeedSupervisor::new(shutdown_tx.clone(), Arc::clone(&metrics));

        let health = supervisor.spawn(
            Arc::new(ConnectingFeed),
            RestartPolicy::FixedDelay(Duration::from_millis(20)),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!health.is_active());
        assert!(!supervisor.is_healthy());
        assert_eq!(metrics.feed_connected.with_label_values(&["binance"]).get(), 0.0);

        shutdown_tx.send(()).unwrap();
        supervisor.join(Duration::from_secs(1)).await;
    }

    #[test]
    fn test_fixed_delay_policy() {
        let policy = RestartPolicy::FixedDelay(Duration::from_secs(3));
        assert_eq!(policy.delay(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_restarts_after_each_failure() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let metrics = Arc::new(FeedMetrics::new().unwrap());
        let mut supervisor = FeedSupervisor::new(shutdown_tx.clone(), Arc::clone(&metrics));

        let feed = Arc::new(FlakyFeed {
            failures: 2,
            sessions: AtomicUsize::new(0),
        });
        let health = supervisor.spawn(
            Arc::clone(&feed) as Arc<dyn PriceFeed>,
            RestartPolicy::FixedDelay(Duration::from_millis(20)),
        );

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(feed.sessions.load(Ordering::SeqCst), 3);
        assert_eq!(health.reconnects(), 2);
        assert!(health.is_active());
        assert!(supervisor.is_healthy());
        assert!(supervisor.is_fully_healthy());
        assert_eq!(metrics.reconnects.with_label_values(&["coinbase"]).get(), 2);

        shutdown_tx.send(()).unwrap();
        supervisor.join(Duration::from_secs(1)).await;
        assert!(!health.is_active());
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_restart_delay() {
        let (shutdown_tx, _) = broadcast::channel(1);
        let metrics = Arc::new(FeedMetrics::new().unwrap());
        let mut supervisor = FeedSupervisor::new(shutdown_tx.clone(), metrics);

        let feed = Arc::new(FlakyFeed {
            failures: usize::MAX,
            sessions: AtomicUsize::new(0),
        });
        supervisor.spawn(feed, RestartPolicy::FixedDelay(Duration::from_secs(3600)));

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(()).unwrap();

        let started = std::time::Instant::now();
        supervisor.join(Duration::from_secs(5)).await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
