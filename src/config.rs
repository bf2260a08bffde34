//! Configuration types for opt-engine

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub session: SessionConfig,
    pub risk: RiskConfig,
    pub sizing: SizingConfig,
    pub monitor: MonitorConfig,
    pub broker: BrokerConfig,
    pub execution: ExecutionConfig,
    pub telemetry: TelemetryConfig,
}

/// Trading session configuration
///
/// All times are UTC wall-clock times within a single trading day.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Market open time
    pub open_time: NaiveTime,
    /// Market close time
    pub close_time: NaiveTime,
    /// Time at which all open positions are force-exited
    pub force_exit_time: NaiveTime,
    /// Ledger lock duration after a kill-switch activation (minutes)
    #[serde(default = "default_kill_lock_minutes")]
    pub kill_lock_minutes: u64,
}

impl SessionConfig {
    /// Check whether the market is open at the given instant
    pub fn is_market_open(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        let t = now.time();
        t >= self.open_time && t < self.close_time
    }

    /// Check whether the force-exit cutoff has been reached
    pub fn past_force_exit(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        now.time() >= self.force_exit_time
    }
}

/// Risk ledger configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RiskConfig {
    /// Capital risked per trade
    pub risk_per_trade: Decimal,
    /// Maximum completed trades per day
    pub max_trades_per_day: u32,
    /// Maximum cumulative daily loss before the ledger locks
    pub max_daily_loss: Decimal,
    /// Cooldown after a losing exit (minutes)
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: u64,
    /// Consecutive losses before the ledger locks
    #[serde(default = "default_max_consecutive_losses")]
    pub max_consecutive_losses: u32,
    /// Lock duration when a loss threshold trips (minutes)
    #[serde(default = "default_loss_lock_minutes")]
    pub loss_lock_minutes: u64,
    /// Maximum concurrent open positions
    #[serde(default = "default_max_concurrent_positions")]
    pub max_concurrent_positions: usize,
}

/// Position sizing and price calculation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SizingConfig {
    /// Contract lot multiplier (premium points to currency)
    pub lot_multiplier: Decimal,
    /// Minimum stop distance as a fraction of entry price
    pub min_stop_distance_pct: Decimal,
    /// Maximum stop distance as a fraction of entry price
    pub max_stop_distance_pct: Decimal,
    /// Fallback stop distance when no usable structural level exists
    pub fallback_stop_pct: Decimal,
    /// Target distance as a fraction of entry price
    pub target_pct: Decimal,
    /// Minimum signal confidence admitted by the gate
    #[serde(default = "default_min_confidence")]
    pub min_confidence: Decimal,
}

/// Trade monitor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Snapshot age beyond which data is considered stale (seconds)
    #[serde(default = "default_staleness_timeout_secs")]
    pub staleness_timeout_secs: u64,
    /// Maximum acceptable bid/ask spread in premium points
    pub max_spread: Decimal,
    /// Unrealized gain (fraction of entry) that activates the trailing stop
    #[serde(default = "default_trailing_activation_pct")]
    pub trailing_activation_pct: Decimal,
    /// Trailing stop offset behind the mark (fraction of mark)
    #[serde(default = "default_trailing_offset_pct")]
    pub trailing_offset_pct: Decimal,
    /// Gamma below this is treated as exhausted
    pub gamma_exhaustion_floor: Decimal,
    /// Absolute theta above this is treated as a decay spike
    pub theta_spike_ceiling: Decimal,
}

/// Broker call bounds and retry policy
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Timeout for order submission and confirmation (seconds)
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,
    /// Interval between order status polls (milliseconds)
    #[serde(default = "default_status_poll_ms")]
    pub status_poll_ms: u64,
    /// Maximum retry attempts for exit submissions
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff between retries (milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Consecutive broker/coordinator failures before the circuit breaker trips
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

/// Execution engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    pub mode: ExecutionMode,
}

/// Execution mode: paper trading or live
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Paper,
    Live,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    pub metrics_port: u16,
    pub log_level: String,
}

fn default_kill_lock_minutes() -> u64 {
    120
}
fn default_cooldown_minutes() -> u64 {
    15
}
fn default_max_consecutive_losses() -> u32 {
    3
}
fn default_loss_lock_minutes() -> u64 {
    240
}
fn default_max_concurrent_positions() -> usize {
    1
}
fn default_min_confidence() -> Decimal {
    Decimal::new(55, 2) // 0.55
}
fn default_staleness_timeout_secs() -> u64 {
    30
}
fn default_trailing_activation_pct() -> Decimal {
    Decimal::new(5, 2) // 0.05
}
fn default_trailing_offset_pct() -> Decimal {
    Decimal::new(3, 2) // 0.03
}
fn default_confirm_timeout_secs() -> u64 {
    5
}
fn default_status_poll_ms() -> u64 {
    200
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    500
}
fn default_max_consecutive_failures() -> u32 {
    3
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sizing.min_stop_distance_pct > self.sizing.max_stop_distance_pct {
            anyhow::bail!("min_stop_distance_pct exceeds max_stop_distance_pct");
        }
        if self.session.open_time >= self.session.close_time {
            anyhow::bail!("session open_time must precede close_time");
        }
        if self.risk.risk_per_trade <= Decimal::ZERO {
            anyhow::bail!("risk_per_trade must be positive");
        }
        Ok(())
    }
}
