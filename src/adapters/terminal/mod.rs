//! Terminal Adapter - Periodic ANSI Redraw
//!
//! Snapshots the store on a fixed interval, builds a `DashboardView`
//! and writes the rendered frame to stdout. Logs go to stderr, so
//! stdout carries nothing but frames.

pub mod render;

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument};

use crate::config::AppConfig;
use crate::domain::store::QuoteStore;
use crate::usecases::dashboard::DashboardView;

pub use render::{render, CLEAR_SCREEN};

/// Redraws the dashboard until shutdown.
pub struct TerminalRenderer<W: Write + Send> {
    store: Arc<QuoteStore>,
    config: AppConfig,
    out: W,
}

impl TerminalRenderer<std::io::Stdout> {
    pub fn stdout(store: Arc<QuoteStore>, config: AppConfig) -> Self {
        Self::new(store, config, std::io::stdout())
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(store: Arc<QuoteStore>, config: AppConfig, out: W) -> Self {
        Self { store, config, out }
    }

    /// Build the current frame without drawing it.
    pub fn frame(&self) -> DashboardView {
        DashboardView::build(&self.store.snapshot(), &self.config, Local::now())
    }

    /// Draw one frame.
    pub fn draw(&mut self) -> Result<()> {
        let text = render(&self.frame());
        self.out
            .write_all(CLEAR_SCREEN.as_bytes())
            .and_then(|()| self.out.write_all(text.as_bytes()))
            .and_then(|()| self.out.flush())
            .context("Failed to write frame")
    }

    /// Redraw every `refresh_interval` until shutdown. A failed write
    /// skips that frame only.
    #[instrument(skip_all, fields(refresh_ms = self.config.terminal.refresh_ms))]
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let mut ticker = tokio::time::interval(self.config.terminal.refresh_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Renderer started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    info!("Renderer received shutdown signal");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.draw() {
                        debug!(error = %e, "Frame dropped");
                    }
                }
            }
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
