use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::GameType;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub stream: StreamConfig,
    pub history: HistoryConfig,
    pub stats: StatsConfig,
}

/// Connection manager settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Backend origin; the game namespace is appended to it.
    pub base_url: String,
    pub connect_timeout_ms: u64,
    pub initial_reconnect_delay_ms: u64,
    pub max_reconnect_delay_ms: u64,
    pub max_reconnect_attempts: u32,
    /// How long a transient notice stays visible.
    pub notice_ttl_ms: u64,
    pub channel_buffer_size: usize,
    pub ping_interval_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3006".to_string(),
            connect_timeout_ms: 20_000,
            initial_reconnect_delay_ms: 1_000,
            max_reconnect_delay_ms: 5_000,
            max_reconnect_attempts: 5,
            notice_ttl_ms: 5_000,
            channel_buffer_size: 1_000,
            ping_interval_ms: 25_000,
        }
    }
}

impl StreamConfig {
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub const fn initial_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.initial_reconnect_delay_ms)
    }

    #[must_use]
    pub const fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms)
    }

    #[must_use]
    pub const fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }

    #[must_use]
    pub const fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }
}

/// Retained history window per game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub aviator: usize,
    pub spaceman: usize,
    pub roulette: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            aviator: 100,
            spaceman: 100,
            roulette: 40,
        }
    }
}

impl HistoryConfig {
    #[must_use]
    pub const fn capacity_for(&self, game: GameType) -> usize {
        match game {
            GameType::Aviator => self.aviator,
            GameType::Spaceman => self.spaceman,
            GameType::Roulette => self.roulette,
        }
    }
}

/// Lookback windows and thresholds for derived indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Multipliers strictly above this count as a win step in the trend series.
    pub trend_threshold: f64,
    pub trend_window: usize,
    pub ema_period: usize,
    pub bollinger_period: usize,
    pub bollinger_k: f64,
    pub support_resistance_lookback: usize,
    pub distribution_window: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            trend_threshold: 2.01,
            trend_window: 100,
            ema_period: 20,
            bollinger_period: 20,
            bollinger_k: 2.0,
            support_resistance_lookback: 40,
            distribution_window: 100,
        }
    }
}
