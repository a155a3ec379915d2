//! Configuration types for lob-replay

use serde::Deserialize;
use thiserror::Error;

/// Invalid configuration; fatal at startup, before replay begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub instrument: InstrumentConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub latency: LatencyConfig,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub quoting: QuotingConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Instrument definition.
#[derive(Debug, Clone, Deserialize)]
pub struct InstrumentConfig {
    /// Minimum price increment
    #[serde(default = "default_tick_size")]
    pub tick_size: f64,
    /// Minimum quantity increment
    #[serde(default = "default_lot_size")]
    pub lot_size: f64,
}

/// Replay and accounting parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Simulation-time interval between strategy invocations
    #[serde(default = "default_tick_interval_ns")]
    pub tick_interval_ns: i64,
    /// Capital base for equity and return calculations
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,
    /// Fee rate applied to traded notional
    #[serde(default)]
    pub fee_rate: f64,
}

/// Latency model selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyModelKind {
    #[default]
    Constant,
    Jitter,
}

/// Order-flow and observation delays.
#[derive(Debug, Clone, Deserialize)]
pub struct LatencyConfig {
    #[serde(default)]
    pub model: LatencyModelKind,
    /// Submit/cancel to exchange-ack delay in nanoseconds
    #[serde(default = "default_ack_ns")]
    pub ack_ns: i64,
    /// Extra market-data observation delay past the recorded local
    /// timestamp; zero when the local timestamp already encodes it
    #[serde(default)]
    pub obs_ns: i64,
    /// Uniform jitter bound added on top of the base delays (jitter model)
    #[serde(default)]
    pub jitter_ns: i64,
    /// Seed for the jitter generator; the same seed reproduces identical
    /// delay sequences
    #[serde(default = "default_seed")]
    pub seed: u64,
}

/// Alpha signal parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct SignalConfig {
    /// Book levels aggregated for the imbalance signal
    #[serde(default = "default_depth_levels")]
    pub depth_levels: usize,
    /// Trailing trade count for the trade-flow signal
    #[serde(default = "default_trade_window")]
    pub trade_window: usize,
}

/// Reservation-price quoting parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotingConfig {
    /// Inventory risk aversion
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Spread elasticity
    #[serde(default = "default_k")]
    pub k: f64,
    /// Weight of the micro-price alpha in the forecast
    #[serde(default = "default_alpha_weight")]
    pub alpha_weight: f64,
    /// Weight of the book-imbalance signal in the forecast
    #[serde(default = "default_imbalance_weight")]
    pub imbalance_weight: f64,
    /// Weight of the trade-flow signal in the forecast
    #[serde(default = "default_flow_weight")]
    pub flow_weight: f64,
    /// Mid-price samples for the volatility estimate
    #[serde(default = "default_vol_window")]
    pub vol_window: usize,
    /// Quantity per quote
    #[serde(default = "default_order_qty")]
    pub order_qty: f64,
    /// Inventory bound; quoting pauses on a side that would exceed it
    #[serde(default = "default_max_position")]
    pub max_position: f64,
    /// Minimum move, in ticks, before a live quote is replaced
    #[serde(default = "default_requote_ticks")]
    pub requote_ticks: i64,
}

/// Queue-model parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// Synthetic public depth assumed ahead of an order resting at a price
    /// the book does not display
    #[serde(default)]
    pub assumed_queue_depth: f64,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_tick_size() -> f64 {
    0.1
}
fn default_lot_size() -> f64 {
    0.01
}
fn default_tick_interval_ns() -> i64 {
    100_000_000
}
fn default_initial_capital() -> f64 {
    30_000.0
}
fn default_ack_ns() -> i64 {
    10_000_000
}
fn default_seed() -> u64 {
    42
}
fn default_depth_levels() -> usize {
    1
}
fn default_trade_window() -> usize {
    100
}
fn default_gamma() -> f64 {
    0.1
}
fn default_k() -> f64 {
    1.5
}
fn default_alpha_weight() -> f64 {
    0.3
}
fn default_imbalance_weight() -> f64 {
    0.5
}
fn default_flow_weight() -> f64 {
    0.2
}
fn default_vol_window() -> usize {
    1000
}
fn default_order_qty() -> f64 {
    1.0
}
fn default_max_position() -> f64 {
    10.0
}
fn default_requote_ticks() -> i64 {
    1
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            tick_size: default_tick_size(),
            lot_size: default_lot_size(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ns: default_tick_interval_ns(),
            initial_capital: default_initial_capital(),
            fee_rate: 0.0,
        }
    }
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            model: LatencyModelKind::Constant,
            ack_ns: default_ack_ns(),
            obs_ns: 0,
            jitter_ns: 0,
            seed: default_seed(),
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            depth_levels: default_depth_levels(),
            trade_window: default_trade_window(),
        }
    }
}

impl Default for QuotingConfig {
    fn default() -> Self {
        Self {
            gamma: default_gamma(),
            k: default_k(),
            alpha_weight: default_alpha_weight(),
            imbalance_weight: default_imbalance_weight(),
            flow_weight: default_flow_weight(),
            vol_window: default_vol_window(),
            order_qty: default_order_qty(),
            max_position: default_max_position(),
            requote_ticks: default_requote_ticks(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            assumed_queue_depth: 0.0,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from a TOML file, falling back to defaults when the file does
    /// not exist.
    pub fn load_or_default(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Reject parameter combinations the simulator cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.instrument.tick_size > 0.0) {
            return Err(invalid("instrument.tick_size", "must be positive"));
        }
        if !(self.instrument.lot_size > 0.0) {
            return Err(invalid("instrument.lot_size", "must be positive"));
        }
        if self.simulation.tick_interval_ns <= 0 {
            return Err(invalid("simulation.tick_interval_ns", "must be positive"));
        }
        if !(self.simulation.initial_capital > 0.0) {
            return Err(invalid("simulation.initial_capital", "must be positive"));
        }
        if self.simulation.fee_rate < 0.0 {
            return Err(invalid("simulation.fee_rate", "must not be negative"));
        }
        if self.latency.ack_ns < 0 || self.latency.obs_ns < 0 || self.latency.jitter_ns < 0 {
            return Err(invalid("latency", "delays must not be negative".to_string()));
        }
        if self.signal.depth_levels == 0 {
            return Err(invalid("signal.depth_levels", "must be at least 1"));
        }
        if self.signal.trade_window == 0 {
            return Err(invalid("signal.trade_window", "must be at least 1"));
        }
        if !(self.quoting.gamma > 0.0) {
            return Err(invalid("quoting.gamma", "must be positive"));
        }
        if !(self.quoting.k > 0.0) {
            return Err(invalid("quoting.k", "must be positive"));
        }
        if self.quoting.vol_window == 0 {
            return Err(invalid("quoting.vol_window", "must be at least 1"));
        }
        if !(self.quoting.order_qty >= self.instrument.lot_size) {
            return Err(invalid(
                "quoting.order_qty",
                format!("must be at least one lot ({})", self.instrument.lot_size),
            ));
        }
        if !(self.quoting.max_position > 0.0) {
            return Err(invalid("quoting.max_position", "must be positive"));
        }
        if self.quoting.requote_ticks < 1 {
            return Err(invalid("quoting.requote_ticks", "must be at least 1"));
        }
        if self.matching.assumed_queue_depth < 0.0 {
            return Err(invalid("matching.assumed_queue_depth", "must not be negative"));
        }
        Ok(())
    }
}
