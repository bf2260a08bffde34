//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Open position count
    OpenPositions,
    /// Unrealized P&L across open positions
    UnrealizedPnl,
    /// Realized P&L for the day
    RealizedPnl,
    /// Cumulative losses for the day
    DailyLoss,
    /// Completed trades today
    TradesToday,
}

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Entries refused by the safety gate
    EntriesRejected,
    /// Positions opened
    TradesOpened,
    /// Positions closed
    TradesClosed,
    /// Kill-switch activations
    KillSwitchActivations,
    /// Circuit breaker trips
    BreakerTrips,
}

/// Start the Prometheus exporter on the given port
pub fn init_exporter(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter: {}", e))?;
    Ok(())
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let name = match metric {
        GaugeMetric::OpenPositions => "optengine_open_positions",
        GaugeMetric::UnrealizedPnl => "optengine_unrealized_pnl",
        GaugeMetric::RealizedPnl => "optengine_realized_pnl",
        GaugeMetric::DailyLoss => "optengine_daily_loss",
        GaugeMetric::TradesToday => "optengine_trades_today",
    };
    metrics::gauge!(name).set(value);
}

/// Increment a counter
pub fn inc_counter(metric: CounterMetric) {
    let name = match metric {
        CounterMetric::EntriesRejected => "optengine_entries_rejected_total",
        CounterMetric::TradesOpened => "optengine_trades_opened_total",
        CounterMetric::TradesClosed => "optengine_trades_closed_total",
        CounterMetric::KillSwitchActivations => "optengine_kill_switch_total",
        CounterMetric::BreakerTrips => "optengine_breaker_trips_total",
    };
    metrics::counter!(name).increment(1);
}
