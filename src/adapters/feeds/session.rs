//! WebSocket session loop shared by the streaming feeds.
//!
//! One call is one connection lifetime: connect, optionally send a
//! subscribe frame, hand every text frame to the caller, and return
//! an error as soon as the connection is unusable. Single bad
//! messages are the caller's problem and never end the session.

use anyhow::{anyhow, bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::time::{interval_at, sleep_until, Instant};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

use crate::config::StreamTiming;
use crate::ports::price_feed::SessionStatus;

/// Connect to `url` and stream text frames into `on_text` until the
/// connection drops (`Err`) or shutdown is signalled (`Ok`).
///
/// `status` is marked connected once the subscribe frame is out.
pub(crate) async fn stream_text_frames<F>(
    name: &'static str,
    url: &str,
    subscribe: Option<String>,
    timing: &StreamTiming,
    status: &dyn SessionStatus,
    shutdown_rx: &mut broadcast::Receiver<()>,
    mut on_text: F,
) -> Result<()>
where
    F: FnMut(&str),
{
    let connect = tokio::time::timeout(timing.idle_timeout(), connect_async(url));
    let ws_stream = tokio::select! {
        biased;
        _ = shutdown_rx.recv() => return Ok(()),
        res = connect => {
            let (ws_stream, _) = res
                .map_err(|_| anyhow!("{name} connect timed out"))?
                .with_context(|| format!("{name} WebSocket connection failed"))?;
            ws_stream
        }
    };

    let (mut write, mut read) = ws_stream.split();

    if let Some(frame) = subscribe {
        write
            .send(Message::Text(frame))
            .await
            .with_context(|| format!("{name} subscribe failed"))?;
    }

    status.set_connected(true);
    info!(feed = name, "WebSocket connected");

    let mut ping = interval_at(
        Instant::now() + timing.ping_interval(),
        timing.ping_interval(),
    );
    let mut last_frame = Instant::now();

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.recv() => {
                let _ = write.send(Message::Close(None)).await;
                return Ok(());
            }
            _ = sleep_until(last_frame + timing.idle_timeout()) => {
                bail!("{name} received nothing for {:?}", timing.idle_timeout());
            }
            _ = ping.tick() => {
                write
                    .send(Message::Ping(Vec::new()))
                    .await
                    .with_context(|| format!("{name} ping failed"))?;
            }
            msg = read.next() => {
                last_frame = Instant::now();
                match msg {
                    Some(Ok(Message::Text(text))) => on_text(&text),
                    Some(Ok(Message::Close(frame))) => {
                        bail!("{name} closed by server: {frame:?}");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        // Pong is handled automatically by tungstenite
                        debug!(feed = name, len = data.len(), "Ping received");
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        return Err(anyhow!("{name} WebSocket error: {e}"));
                    }
                    None => {
                        bail!("{name} WebSocket stream ended");
                    }
                }
            }
        }
    }
}
