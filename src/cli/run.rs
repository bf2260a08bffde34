//! Run command implementation

use crate::broker::PaperBroker;
use crate::config::Config;
use crate::engine::Engine;
use crate::market::MarketSnapshot;
use crate::signal::TradeSignal;
use crate::trade::{KillSwitchReason, TradeJournal};
use chrono::Utc;
use clap::Args;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// One line of the inbound event stream.
///
/// The feed adapter (out of process) writes these as JSON lines on stdin:
/// market snapshots drive the monitor, signals request entries.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SessionEvent {
    Snapshot(MarketSnapshot),
    Signal(TradeSignal),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the closed-trade journal
    #[arg(long, default_value = "trades.jsonl")]
    pub journal: PathBuf,

    /// Seconds between risk status log lines
    #[arg(long, default_value_t = 60)]
    pub status_interval_secs: u64,
}

impl RunArgs {
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let broker = Arc::new(PaperBroker::new());
        let journal = TradeJournal::open(&self.journal)?;
        let engine = Arc::new(Engine::new(config, broker).with_journal(journal));

        // Pick up any trades already closed today so the risk counters
        // survive a restart
        let recovered = engine
            .recover_from_journal(&self.journal, Utc::now())
            .await?;
        if recovered > 0 {
            tracing::info!(recovered, "Resumed session from journal");
        }

        let mut events = spawn_stdin_feed();
        tracing::info!("Paper trading session started; reading events from stdin");

        let mut status_interval =
            tokio::time::interval(Duration::from_secs(self.status_interval_secs));
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(SessionEvent::Snapshot(snapshot)) => {
                            engine.tick(&snapshot, Utc::now()).await;
                        }
                        Some(SessionEvent::Signal(signal)) => {
                            match engine.try_enter(&signal, Utc::now()).await {
                                Ok(trade_id) => {
                                    tracing::info!(%trade_id, "Entered position");
                                }
                                Err(e) => {
                                    tracing::info!(error = %e, "Entry refused");
                                }
                            }
                        }
                        None => {
                            tracing::info!("Event stream ended; flattening open positions");
                            engine
                                .kill_switch(KillSwitchReason::Manual, Utc::now())
                                .await;
                            break;
                        }
                    }
                }
                _ = status_interval.tick() => {
                    let status = engine.risk_status(Utc::now()).await;
                    let active = engine.active_summary().await;
                    tracing::info!(
                        can_trade = status.can_trade,
                        trades_today = status.trades_today,
                        daily_pnl = %status.daily_pnl,
                        open_positions = active.count,
                        unrealized = %active.total_unrealized_pnl,
                        "Session status"
                    );
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown requested; flattening open positions");
                    let closed = engine
                        .kill_switch(KillSwitchReason::Manual, Utc::now())
                        .await;
                    tracing::info!(closed = closed.len(), "Session ended");
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Parse JSON-line events off stdin on a blocking thread
fn spawn_stdin_feed() -> mpsc::Receiver<SessionEvent> {
    let (tx, rx) = mpsc::channel(64);
    tokio::task::spawn_blocking(move || {
        use std::io::BufRead;
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    tracing::warn!(error = %e, "Event stream read failed");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SessionEvent>(&line) {
                Ok(event) => {
                    if tx.blocking_send(event).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed event line");
                }
            }
        }
    });
    rx
}
