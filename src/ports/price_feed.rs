//! Price Feed Port - Supervised Feed Sessions
//!
//! A feed exposes a single session: connect, stream into its sink,
//! return on failure. Reconnecting is the supervisor's job, so feeds
//! never loop over their own connection errors.

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::quote::Source;

/// Connection state reported by a running session.
///
/// A session starts disconnected and flips to connected only once it
/// is actually delivering data: after connect and subscribe for a
/// stream, after a cycle that wrote a quote for a poller.
pub trait SessionStatus: Send + Sync {
  fn set_connected(&self, connected: bool);
}

/// Long-running price source driven by `FeedSupervisor`.
#[async_trait]
pub trait PriceFeed: Send + Sync + 'static {
  /// Short name used in logs and metrics.
  fn name(&self) -> &'static str;

  /// Source tag for every quote this feed writes.
  fn source(&self) -> Source;

  /// Run one session until it fails or shutdown is signalled.
  ///
  /// `Ok(())` means shutdown was requested. `Err` means the session
  /// dropped (connection closed, socket error, idle timeout) and the
  /// supervisor should restart it after its delay.
  async fn run_session(
    &self,
    status: &dyn SessionStatus,
    shutdown_rx: &mut broadcast::Receiver<()>,
  ) -> anyhow::Result<()>;
}
