//! Replay command implementation

use crate::trade::TradeJournal;
use chrono::Utc;
use clap::Args;
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Path to the closed-trade journal
    #[arg(long, default_value = "trades.jsonl")]
    pub journal: PathBuf,

    /// Replay the full journal instead of only today
    #[arg(long)]
    pub all: bool,
}

impl ReplayArgs {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let trades = if self.all {
            TradeJournal::replay(&self.journal)?
        } else {
            TradeJournal::replay_day(&self.journal, Utc::now())?
        };

        let total_pnl: Decimal = trades.iter().map(|t| t.realized_pnl).sum();
        let losses = trades.iter().filter(|t| t.is_loss()).count();

        println!("Journal: {}", self.journal.display());
        println!("  Trades: {}", trades.len());
        println!("  Wins: {}", trades.len() - losses);
        println!("  Losses: {}", losses);
        println!("  Net P&L: {}", total_pnl);
        for trade in &trades {
            println!(
                "  {} {} {:?} qty {} entry {} exit {} pnl {} ({})",
                trade.exit_time.format("%H:%M:%S"),
                trade.instrument,
                trade.direction,
                trade.quantity,
                trade.entry_price,
                trade.exit_price,
                trade.realized_pnl,
                trade.reason,
            );
        }

        Ok(())
    }
}
