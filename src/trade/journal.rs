//! Durable closed-trade journal
//!
//! Append-only JSON Lines file. A close is considered final only after its
//! record is flushed to disk, so a restart can rebuild the day's risk
//! counters from the journal.

use super::ClosedTrade;
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Append-only journal of closed trades
pub struct TradeJournal {
    path: PathBuf,
    file: File,
}

impl TradeJournal {
    /// Open (or create) the journal at `path`
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    /// Journal file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one closed trade and flush it to disk before returning
    pub fn append(&mut self, trade: &ClosedTrade) -> anyhow::Result<()> {
        let line = serde_json::to_string(trade)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        self.file.sync_data()?;
        tracing::debug!(trade_id = %trade.trade_id, "Journaled closed trade");
        Ok(())
    }

    /// Read back every record in the journal
    pub fn replay(path: impl AsRef<Path>) -> anyhow::Result<Vec<ClosedTrade>> {
        let file = match File::open(path.as_ref()) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(e.into()),
        };

        let mut trades = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            trades.push(serde_json::from_str(&line)?);
        }
        Ok(trades)
    }

    /// Records whose exit falls on the given trading day
    pub fn replay_day(
        path: impl AsRef<Path>,
        day: DateTime<Utc>,
    ) -> anyhow::Result<Vec<ClosedTrade>> {
        let trades = Self::replay(path)?;
        Ok(trades
            .into_iter()
            .filter(|t| t.exit_time.date_naive() == day.date_naive())
            .collect())
    }
}
